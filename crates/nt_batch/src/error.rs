use alloc::string::ToString;
use alloc::sync::Arc;
use core::fmt::Display;

use thiserror::Error;

// -----------------------------------------------------------------------------
// Error

/// Failure of a batched load.
///
/// Errors are `Clone` because one failed source call fails every key of the
/// batch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BatchError {
    #[error("no batch source registered as `{0}`")]
    UnknownSource(Arc<str>),

    #[error("batch source `{0}` has different key or value types")]
    SourceMismatch(Arc<str>),

    #[error("batch source failed: {0}")]
    SourceFailed(Arc<str>),

    #[error("batch source returned {actual} values for {expected} keys")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("batch request was dropped before it completed")]
    Dropped,
}

impl BatchError {
    /// A [`BatchError::SourceFailed`] carrying `message`.
    #[inline]
    pub fn source_failed(message: impl Display) -> Self {
        Self::SourceFailed(Arc::from(message.to_string()))
    }
}
