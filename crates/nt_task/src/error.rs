use thiserror::Error;

use crate::{BoxError, RunStatus};

// -----------------------------------------------------------------------------
// Error

/// Errors raised by [`ThreadAffineExecutor`](crate::ThreadAffineExecutor).
///
/// `AlreadyRunning` and `Terminated` are programming errors and are reported
/// to the caller that made the invalid call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExecutorError {
    #[error("the executor has already been run")]
    AlreadyRunning,

    #[error("the executor has terminated with status {0}")]
    Terminated(RunStatus),

    #[error("tick hook failed: {0}")]
    HookFailure(#[source] BoxError),
}

impl ExecutorError {
    /// Returns `true` for errors caused by misuse of the executor API.
    #[inline]
    pub fn is_programming_error(&self) -> bool {
        matches!(self, Self::AlreadyRunning | Self::Terminated(_))
    }
}
