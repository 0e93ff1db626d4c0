use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

// -----------------------------------------------------------------------------
// RunStatus

/// The lifecycle status of a [`ThreadAffineExecutor`](crate::ThreadAffineExecutor).
///
/// Transitions are monotonic:
///
/// ```text
/// Created -> Running -> Completed | TimedOut | Failed
/// ```
///
/// Once a terminal status is reached no further task is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RunStatus {
    /// `run` has not been called yet; submitted tasks are buffered.
    Created = 0,
    /// The owning thread is inside the run loop.
    Running = 1,
    /// The driven computation finished.
    Completed = 2,
    /// The deadline passed before the computation finished.
    TimedOut = 3,
    /// The tick hook failed and aborted the run.
    Failed = 4,
}

impl RunStatus {
    /// Returns `true` for `Completed`, `TimedOut` and `Failed`.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::TimedOut | Self::Failed)
    }

    #[inline]
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Running,
            2 => Self::Completed,
            3 => Self::TimedOut,
            _ => Self::Failed,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::TimedOut => "timed out",
            Self::Failed => "failed",
        })
    }
}

// -----------------------------------------------------------------------------
// AtomicRunStatus

/// A [`RunStatus`] cell readable from any thread.
///
/// All accesses are `SeqCst` so producers observe termination promptly.
pub(crate) struct AtomicRunStatus(AtomicU8);

impl AtomicRunStatus {
    #[inline]
    pub(crate) const fn new() -> Self {
        Self(AtomicU8::new(RunStatus::Created as u8))
    }

    #[inline]
    pub(crate) fn load(&self) -> RunStatus {
        RunStatus::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Moves from `from` to `to`, or returns the status actually observed.
    #[inline]
    pub(crate) fn advance(&self, from: RunStatus, to: RunStatus) -> Result<(), RunStatus> {
        debug_assert!(from as u8 <= to as u8, "status transitions are monotonic");
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(RunStatus::from_u8)
    }
}

impl fmt::Debug for AtomicRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.load(), f)
    }
}

// -----------------------------------------------------------------------------
// Tests
