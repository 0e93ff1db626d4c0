use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;
use std::sync::{PoisonError, RwLock};

use crate::hash::{HashMap, new_map};
use crate::{BatchError, BatchJob, BatchLoader, BatchSource, BatchStatistics, LoadFuture, LoaderOptions};

// -----------------------------------------------------------------------------
// ErasedLoader

/// The type-independent part of a [`BatchLoader`].
trait ErasedLoader: Send + Sync + 'static {
    fn dispatch(self: Arc<Self>) -> Vec<BatchJob>;

    fn discard(&self) -> usize;

    fn statistics(&self) -> BatchStatistics;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<S: BatchSource> ErasedLoader for BatchLoader<S> {
    #[inline]
    fn dispatch(self: Arc<Self>) -> Vec<BatchJob> {
        BatchLoader::dispatch(&self)
    }

    #[inline]
    fn discard(&self) -> usize {
        BatchLoader::discard(self)
    }

    #[inline]
    fn statistics(&self) -> BatchStatistics {
        BatchLoader::statistics(self)
    }

    #[inline]
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

// -----------------------------------------------------------------------------
// BatchRegistry

/// Named [`BatchLoader`]s of one execution.
///
/// Requests are registered by source name; [`dispatch_all`](Self::dispatch_all)
/// flushes every loader at once.
///
/// # Examples
///
/// ```
/// use futures_lite::future::block_on;
/// use nt_batch::{BatchError, BatchRegistry, BatchSource, LoaderOptions};
/// use nt_task::BoxedFuture;
///
/// struct Double;
///
/// impl BatchSource for Double {
///     type Key = u32;
///     type Value = u32;
///
///     fn load(&self, keys: Vec<u32>) -> BoxedFuture<'static, Result<Vec<u32>, BatchError>> {
///         Box::pin(async move { Ok(keys.into_iter().map(|key| key * 2).collect()) })
///     }
/// }
///
/// let registry = BatchRegistry::new();
/// registry.register("double", Double, LoaderOptions::default());
///
/// let four = registry.register_request::<Double>("double", 2);
/// let many = registry.register_request_many::<Double>("double", vec![1, 3]);
///
/// for job in registry.dispatch_all() {
///     block_on(job);
/// }
///
/// assert_eq!(block_on(four), Ok(4));
/// assert_eq!(block_on(many), Ok(vec![2, 6]));
/// assert_eq!(registry.statistics().batch_invoke_count, 1);
/// ```
pub struct BatchRegistry {
    loaders: RwLock<HashMap<Arc<str>, Arc<dyn ErasedLoader>>>,
}

impl BatchRegistry {
    pub fn new() -> Self {
        Self {
            loaders: RwLock::new(new_map()),
        }
    }

    /// Creates a loader for `source` under `name`, replacing any loader
    /// registered with the same name.
    pub fn register<S: BatchSource>(
        &self,
        name: impl Into<Arc<str>>,
        source: S,
        options: LoaderOptions,
    ) -> Arc<BatchLoader<S>> {
        let loader = Arc::new(BatchLoader::new(name, source, options));
        self.insert(loader.clone());
        loader
    }

    /// Registers an existing loader under its own name.
    pub fn insert<S: BatchSource>(&self, loader: Arc<BatchLoader<S>>) {
        let name = loader.name().clone();
        let replaced = self
            .loaders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), loader);

        if replaced.is_some() {
            log::warn!("batch source `{name}` was registered twice, the first loader is discarded");
        }
    }

    /// Returns the loader registered under `name`.
    ///
    /// # Errors
    ///
    /// - [`BatchError::UnknownSource`] if there is none.
    /// - [`BatchError::SourceMismatch`] if it loads another source type.
    pub fn loader<S: BatchSource>(&self, name: &str) -> Result<Arc<BatchLoader<S>>, BatchError> {
        let loader = self
            .loaders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| BatchError::UnknownSource(Arc::from(name)))?;

        loader
            .into_any()
            .downcast::<BatchLoader<S>>()
            .map_err(|_| BatchError::SourceMismatch(Arc::from(name)))
    }

    /// Names of the registered sources.
    pub fn names(&self) -> Vec<Arc<str>> {
        self.loaders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Registers a request for `key` with the source `name`.
    ///
    /// Lookup failures are reported through the returned future.
    pub fn register_request<S: BatchSource>(&self, name: &str, key: S::Key) -> LoadFuture<S::Value> {
        match self.loader::<S>(name) {
            Ok(loader) => loader.load(key),
            Err(err) => Box::pin(futures_lite::future::ready(Err(err))),
        }
    }

    /// Registers a request for each of `keys` with the source `name`.
    pub fn register_request_many<S: BatchSource>(
        &self,
        name: &str,
        keys: Vec<S::Key>,
    ) -> LoadFuture<Vec<S::Value>> {
        match self.loader::<S>(name) {
            Ok(loader) => loader.load_many(keys),
            Err(err) => Box::pin(futures_lite::future::ready(Err(err))),
        }
    }

    /// Dispatches every loader. See [`BatchLoader::dispatch`].
    pub fn dispatch_all(&self) -> Vec<BatchJob> {
        let loaders: Vec<_> = self
            .loaders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        loaders
            .into_iter()
            .flat_map(|loader| loader.dispatch())
            .collect()
    }

    /// Discards every loader's pending requests. See [`BatchLoader::discard`].
    pub fn discard_all(&self) -> usize {
        self.loaders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|loader| loader.discard())
            .sum()
    }

    /// Counters summed over every registered loader.
    pub fn statistics(&self) -> BatchStatistics {
        self.loaders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|loader| loader.statistics())
            .fold(BatchStatistics::default(), |total, stats| total + stats)
    }
}

impl Default for BatchRegistry {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BatchRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchRegistry")
            .field("sources", &self.names())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::string::String;

    use futures_lite::future::block_on;

    use super::BatchRegistry;
    use crate::loader::tests::Upper;
    use crate::{BatchError, LoaderOptions};

    #[test]
    fn unknown_and_mismatched_sources() {
        let registry = BatchRegistry::new();
        registry.register("upper", Upper::default(), LoaderOptions::default());

        let missing = registry.register_request::<Upper>("lower", String::from("a"));
        assert_eq!(block_on(missing), Err(BatchError::UnknownSource("lower".into())));

        struct Other;
        impl crate::BatchSource for Other {
            type Key = u8;
            type Value = u8;

            fn load(&self, keys: alloc::vec::Vec<u8>) -> nt_task::BoxedFuture<'static, Result<alloc::vec::Vec<u8>, BatchError>> {
                Box::pin(async move { Ok(keys) })
            }
        }

        assert!(matches!(
            registry.loader::<Other>("upper"),
            Err(BatchError::SourceMismatch(_))
        ));
    }

    #[test]
    fn dispatch_all_skips_idle_loaders() {
        let registry = BatchRegistry::new();
        registry.register("first", Upper::default(), LoaderOptions::default());
        registry.register("second", Upper::default(), LoaderOptions::default());

        assert!(registry.dispatch_all().is_empty());

        let load = registry.register_request::<Upper>("second", String::from("b"));
        let jobs = registry.dispatch_all();
        assert_eq!(jobs.len(), 1);
        for job in jobs {
            block_on(job);
        }

        assert_eq!(block_on(load).unwrap(), "B");
        let stats = registry.statistics();
        assert_eq!(stats.batch_invoke_count, 1);
        assert_eq!(stats.load_count, 1);
    }
}
