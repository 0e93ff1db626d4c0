use alloc::sync::Arc;
use alloc::vec::Vec;
use core::future::Future;
use core::ops::Deref;

use nt_batch::{BatchError, BatchLoader, BatchRegistry, BatchSource};
use nt_task::{ExecutorHandle, Marshalled};

use crate::ExecutionContext;

// -----------------------------------------------------------------------------
// Marshaller

/// A resolver environment paired with the executor of its execution.
///
/// The environment's accessors stay available through [`Deref`]. Every
/// future obtained through the marshaller completes on the owning thread of
/// the executor, so resolver continuations never run on the threads that
/// produced their values.
///
/// Loads are registered with the execution's [`BatchRegistry`] and reach
/// their source at the next tick boundary, together with every other load
/// of the same tick.
#[derive(Debug, Clone)]
pub struct Marshaller<Env> {
    env: Env,
    executor: ExecutorHandle,
    batches: Arc<BatchRegistry>,
}

impl<Env> Marshaller<Env> {
    #[inline]
    pub fn new(env: Env, executor: ExecutorHandle, batches: Arc<BatchRegistry>) -> Self {
        Self {
            env,
            executor,
            batches,
        }
    }

    /// Wraps `env` with the executor bound to `ctx`.
    ///
    /// Returns `None` if no executor is bound.
    pub fn from_context(env: Env, ctx: &ExecutionContext) -> Option<Self> {
        let executor = ctx.executor()?;
        Some(Self::new(env, executor, ctx.batches().clone()))
    }

    #[inline]
    pub fn env(&self) -> &Env {
        &self.env
    }

    #[inline]
    pub fn into_env(self) -> Env {
        self.env
    }

    /// Wraps another environment with the same executor and registry, for
    /// nested resolvers.
    pub fn with_env<T>(&self, env: T) -> Marshaller<T> {
        Marshaller::new(env, self.executor.clone(), self.batches.clone())
    }

    #[inline]
    pub fn executor(&self) -> &ExecutorHandle {
        &self.executor
    }

    #[inline]
    pub fn batches(&self) -> &Arc<BatchRegistry> {
        &self.batches
    }

    #[inline]
    pub fn is_owning_thread(&self) -> bool {
        self.executor.is_owning_thread()
    }

    /// Moves the completion of `future` onto the owning thread.
    ///
    /// See [`ExecutorHandle::marshal`].
    #[inline]
    pub fn switch_executor<F>(&self, future: F) -> Marshalled<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.executor.marshal(future)
    }

    /// Requests `key` from the source registered as `source`.
    ///
    /// An unknown source resolves to [`BatchError::UnknownSource`].
    pub fn load<S: BatchSource>(
        &self,
        source: &str,
        key: S::Key,
    ) -> Marshalled<Result<S::Value, BatchError>> {
        self.switch_executor(self.batches.register_request::<S>(source, key))
    }

    /// Requests every key of `keys` from the source registered as `source`.
    pub fn load_many<S: BatchSource>(
        &self,
        source: &str,
        keys: Vec<S::Key>,
    ) -> Marshalled<Result<Vec<S::Value>, BatchError>> {
        self.switch_executor(self.batches.register_request_many::<S>(source, keys))
    }

    /// Requests `key` from a loader held directly.
    ///
    /// The loader is only dispatched on tick boundaries if it is registered
    /// with this marshaller's registry.
    pub fn load_with<S: BatchSource>(
        &self,
        loader: &BatchLoader<S>,
        key: S::Key,
    ) -> Marshalled<Result<S::Value, BatchError>> {
        self.switch_executor(loader.load(key))
    }
}

impl<Env> Deref for Marshaller<Env> {
    type Target = Env;

    #[inline]
    fn deref(&self) -> &Env {
        &self.env
    }
}

// -----------------------------------------------------------------------------
// Tests
