use alloc::vec::Vec;
use core::hash::Hash;

use nt_task::BoxedFuture;

use crate::BatchError;

// -----------------------------------------------------------------------------
// BatchSource

/// The underlying "fetch N records" call behind a [`BatchLoader`].
///
/// `load` receives distinct keys and must resolve to one value per key, in
/// the same order. It may complete on any thread.
///
/// [`BatchLoader`]: crate::BatchLoader
pub trait BatchSource: Send + Sync + 'static {
    type Key: Clone + Eq + Hash + Send + Sync + 'static;
    type Value: Clone + Send + Sync + 'static;

    fn load(&self, keys: Vec<Self::Key>) -> BoxedFuture<'static, Result<Vec<Self::Value>, BatchError>>;
}
