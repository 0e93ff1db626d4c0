use alloc::boxed::Box;
use core::fmt;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use async_task::Runnable;

// -----------------------------------------------------------------------------
// Task

/// A unit of work queued for execution on the owning thread.
///
/// A `Task` has no identity beyond its position in the [`TaskQueue`] and is
/// consumed exactly once by [`Task::run`].
///
/// [`TaskQueue`]: crate::TaskQueue
pub struct Task(Box<dyn FnOnce() + Send + 'static>);

impl Task {
    /// Wraps a closure.
    #[inline]
    pub fn new(f: impl FnOnce() + Send + 'static) -> Self {
        Self(Box::new(f))
    }

    /// A task that polls a spawned future once.
    #[inline]
    pub(crate) fn from_runnable(runnable: Runnable) -> Self {
        Self::new(move || {
            runnable.run();
        })
    }

    /// Executes the task on the current thread.
    #[inline]
    pub fn run(self) {
        (self.0)()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Spawned

/// Wraps [`async_task::Task`], a future spawned on an executor.
///
/// A [`Spawned`] can be awaited to retrieve the output of its future.
/// Every poll of the future happens on the executor's owning thread.
///
/// Dropping a [`Spawned`] cancels it, which means its future won't be
/// polled again.
///
/// - To drop the handle without canceling it, use [`Spawned::detach()`].
/// - To cancel gracefully and wait until it is fully destroyed,
///   use [`Spawned::cancel()`].
#[must_use = "Spawned futures are canceled when dropped, use `.detach()` to run them in the background."]
#[repr(transparent)]
pub struct Spawned<T>(pub(crate) async_task::Task<T>);

impl<T> Unpin for Spawned<T> {}

impl<T> Spawned<T> {
    /// Detaches the future to let it keep running in the background.
    #[inline(always)]
    pub fn detach(self) {
        self.0.detach();
    }

    /// Cancels the future and waits for it to stop running.
    ///
    /// Returns the output if it was completed just before it
    /// got canceled, or [`None`] if it didn't complete.
    #[inline(always)]
    pub async fn cancel(self) -> Option<T> {
        self.0.cancel().await
    }

    /// Returns `true` if the future has finished.
    ///
    /// Unlike poll, it doesn't resolve the final value.
    #[inline(always)]
    pub fn is_finished(&self) -> bool {
        self.0.is_finished()
    }
}

impl<T> Future for Spawned<T> {
    type Output = T;

    #[inline(always)]
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl<T> fmt::Debug for Spawned<T> {
    #[inline(always)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// -----------------------------------------------------------------------------
// Tests
