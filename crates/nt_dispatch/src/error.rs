use core::time::Duration;

use nt_task::{BoxError, ExecutorError};
use thiserror::Error;

use crate::ContextAlreadyBound;

// -----------------------------------------------------------------------------
// Error

/// Errors returned by [`EventLoopDispatcher::run`](crate::EventLoopDispatcher::run).
///
/// A failure of the computation itself is forwarded as [`Upstream`] with the
/// computation's own error, so it is never confused with [`Timeout`].
///
/// [`Upstream`]: Self::Upstream
/// [`Timeout`]: Self::Timeout
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DispatchError<E> {
    #[error(transparent)]
    ContextAlreadyBound(#[from] ContextAlreadyBound),

    #[error("the executor of this execution has already been run")]
    AlreadyRunning,

    #[error("execution timed out after {0:?}")]
    Timeout(Duration),

    #[error("tick hook failed: {0}")]
    HookFailure(#[source] BoxError),

    #[error("executor failed: {0}")]
    Executor(#[source] ExecutorError),

    #[error("execution failed: {0}")]
    Upstream(E),
}

impl<E> DispatchError<E> {
    /// Returns `true` for errors caused by misuse of the dispatcher API.
    #[inline]
    pub fn is_programming_error(&self) -> bool {
        match self {
            Self::ContextAlreadyBound(_) | Self::AlreadyRunning => true,
            Self::Executor(err) => err.is_programming_error(),
            _ => false,
        }
    }

    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Returns the computation's own error, if that is what failed.
    #[inline]
    pub fn into_upstream(self) -> Option<E> {
        match self {
            Self::Upstream(err) => Some(err),
            _ => None,
        }
    }
}

impl<E> From<ExecutorError> for DispatchError<E> {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::AlreadyRunning => Self::AlreadyRunning,
            ExecutorError::HookFailure(err) => Self::HookFailure(err),
            err => Self::Executor(err),
        }
    }
}
