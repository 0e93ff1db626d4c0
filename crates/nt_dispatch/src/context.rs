use alloc::sync::Arc;
use core::any::{Any, TypeId};
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

use foldhash::fast::FixedState;
use hashbrown::HashMap;
use nt_batch::BatchRegistry;
use nt_task::ExecutorHandle;
use thiserror::Error;

// -----------------------------------------------------------------------------
// ExecutionId

/// A process-unique identifier of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExecutionId(u64);

impl ExecutionId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "execution#{}", self.0)
    }
}

/// An executor is already bound to the execution context.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("{0} already has an executor bound")]
pub struct ContextAlreadyBound(pub ExecutionId);

// -----------------------------------------------------------------------------
// ExecutionContext

const EXTENSION_HASH_STATE: FixedState = FixedState::with_seed(0x95EE04C4F326B271);

type Extensions = HashMap<TypeId, Arc<dyn Any + Send + Sync>, FixedState>;

struct Inner {
    id: ExecutionId,
    batches: Arc<BatchRegistry>,
    executor: Mutex<Option<ExecutorHandle>>,
    extensions: RwLock<Extensions>,
}

/// The per-execution context, passed explicitly through the resolution call
/// tree.
///
/// Cloning is cheap and every clone refers to the same execution. The
/// context carries:
///
/// - the [`BatchRegistry`] shared by every resolver of the execution,
/// - the executor of the execution while it runs, see [`bind`](Self::bind),
/// - typed extensions, one value per type.
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<Inner>,
}

impl ExecutionContext {
    /// Creates a context with an empty batch registry.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(BatchRegistry::new()))
    }

    pub fn with_registry(batches: Arc<BatchRegistry>) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: ExecutionId::next(),
                batches,
                executor: Mutex::new(None),
                extensions: RwLock::new(HashMap::with_hasher(EXTENSION_HASH_STATE)),
            }),
        }
    }

    #[inline]
    pub fn id(&self) -> ExecutionId {
        self.inner.id
    }

    #[inline]
    pub fn batches(&self) -> &Arc<BatchRegistry> {
        &self.inner.batches
    }

    #[inline]
    fn executor_slot(&self) -> MutexGuard<'_, Option<ExecutorHandle>> {
        self.inner
            .executor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// The executor of the current execution, if one is bound.
    pub fn executor(&self) -> Option<ExecutorHandle> {
        self.executor_slot().clone()
    }

    /// Binds `handle` as the executor of this execution.
    ///
    /// # Errors
    ///
    /// [`ContextAlreadyBound`] if an executor is bound already; the bound
    /// executor is left in place.
    pub fn bind(&self, handle: ExecutorHandle) -> Result<(), ContextAlreadyBound> {
        let mut slot = self.executor_slot();
        if slot.is_some() {
            return Err(ContextAlreadyBound(self.id()));
        }

        log::trace!("{}: bound to {}", self.id(), handle.id());
        *slot = Some(handle);
        Ok(())
    }

    /// Removes the bound executor and returns it.
    pub fn unbind(&self) -> Option<ExecutorHandle> {
        self.executor_slot().take()
    }

    /// Stores `value` as the extension of type `T`, returning the previous one.
    pub fn insert<T: Any + Send + Sync>(&self, value: T) -> Option<Arc<T>> {
        self.inner
            .extensions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeId::of::<T>(), Arc::new(value))
            .and_then(|previous| previous.downcast::<T>().ok())
    }

    /// Returns the extension of type `T`.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.inner
            .extensions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
    }
}

impl Default for ExecutionContext {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("id", &self.inner.id)
            .field("executor", &self.executor())
            .field("batches", &self.inner.batches)
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Tests
