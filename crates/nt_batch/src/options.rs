use core::num::NonZero;

use serde::{Deserialize, Serialize};

// -----------------------------------------------------------------------------
// LoaderOptions

/// Configuration of a [`BatchLoader`](crate::BatchLoader).
///
/// - `caching`: a key that already loaded successfully resolves from the
///   loader's cache without reaching the source. Enabled by default.
/// - `max_batch_size`: upper bound of keys per source call; a larger
///   dispatch is split. Unbounded by default.
///
/// ```
/// use nt_batch::LoaderOptions;
///
/// let options = LoaderOptions::default().caching(false).max_batch_size(100);
/// assert!(!options.is_caching());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderOptions {
    caching: bool,
    max_batch_size: Option<NonZero<usize>>,
}

impl Default for LoaderOptions {
    #[inline]
    fn default() -> Self {
        Self {
            caching: true,
            max_batch_size: None,
        }
    }
}

impl LoaderOptions {
    #[inline]
    pub fn caching(mut self, caching: bool) -> Self {
        self.caching = caching;
        self
    }

    /// Sets the maximum batch size. `0` means unbounded.
    #[inline]
    pub fn max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = NonZero::new(max_batch_size);
        self
    }

    #[inline]
    pub fn is_caching(&self) -> bool {
        self.caching
    }

    #[inline]
    pub fn batch_size_limit(&self) -> Option<NonZero<usize>> {
        self.max_batch_size
    }
}
