use alloc::boxed::Box;
use core::fmt;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll, Waker};

use crate::{ExecutorHandle, Spawned};

// -----------------------------------------------------------------------------
// Marshalled

/// A future whose completion is observed on an executor's owning thread.
///
/// Created by [`ExecutorHandle::marshal`]. Marshalling never changes the
/// output: a failing future yields the same failure.
///
/// # Panics
///
/// Awaiting a scheduled `Marshalled` after its executor terminated panics,
/// because the wrapped future was dropped without completing.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Marshalled<T>(Inner<T>);

enum Inner<T> {
    /// Already complete on the owning thread; no queue round trip.
    Ready(Option<T>),
    Scheduled(Spawned<T>),
}

impl<T> Unpin for Marshalled<T> {}

impl<T> Marshalled<T> {
    /// Returns `true` if the future was already complete when marshalled on
    /// the owning thread, so awaiting it resumes synchronously.
    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self.0, Inner::Ready(_))
    }
}

impl<T> Future for Marshalled<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        match &mut self.get_mut().0 {
            Inner::Ready(value) => Poll::Ready(
                value
                    .take()
                    .expect("`Marshalled` polled after completion"),
            ),
            Inner::Scheduled(spawned) => Pin::new(spawned).poll(cx),
        }
    }
}

impl<T> fmt::Debug for Marshalled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Marshalled")
            .field("ready", &self.is_ready())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// marshal

impl ExecutorHandle {
    /// Redirects the completion of `future` onto the owning thread.
    ///
    /// - On the owning thread, a future that is complete on its first poll is
    ///   returned as is, so the caller resumes without an extra tick.
    /// - Otherwise the future is spawned on the executor: whichever thread
    ///   completes it only enqueues a task, and the result is observed during
    ///   a later drain on the owning thread.
    pub fn marshal<F>(&self, future: F) -> Marshalled<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let mut future = Box::pin(future);

        if self.is_owning_thread() {
            let mut cx = Context::from_waker(Waker::noop());
            if let Poll::Ready(value) = future.as_mut().poll(&mut cx) {
                return Marshalled(Inner::Ready(Some(value)));
            }
        }

        Marshalled(Inner::Scheduled(self.spawn(future)))
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use alloc::vec::Vec;
    use core::time::Duration;
    use std::sync::Mutex;
    use std::thread;

    use crate::{RunOutcome, ThreadAffineExecutor};

    #[test]
    fn ready_future_on_owner_short_circuits() {
        let executor = ThreadAffineExecutor::builder().build();
        let handle = executor.handle();
        let log = Arc::new(Mutex::new(Vec::new()));

        let inner_log = log.clone();
        let outcome = executor
            .run(async move {
                let task_log = inner_log.clone();
                handle
                    .submit(move || task_log.lock().unwrap().push("task"))
                    .unwrap();

                let marshalled = handle.marshal(async { 5 });
                assert!(marshalled.is_ready());

                let value = marshalled.await;
                inner_log.lock().unwrap().push("continuation");
                value
            })
            .unwrap();

        assert_eq!(outcome, RunOutcome::Completed(5));
        assert_eq!(*log.lock().unwrap(), ["continuation", "task"]);
    }

    #[test]
    fn pending_future_is_scheduled() {
        let executor = ThreadAffineExecutor::builder()
            .timeout(Duration::from_secs(5))
            .build();
        let handle = executor.handle();

        let outcome = executor
            .run(async move {
                let (tx, rx) = async_channel::bounded::<u32>(1);
                let marshalled = handle.marshal(async move { rx.recv().await });
                assert!(!marshalled.is_ready());

                let sender = thread::spawn(move || tx.send_blocking(9).unwrap());
                let value = marshalled.await;
                sender.join().unwrap();
                value
            })
            .unwrap();

        assert_eq!(outcome, RunOutcome::Completed(Ok(9)));
    }

    #[test]
    fn marshal_from_producer_polls_on_owner() {
        let executor = ThreadAffineExecutor::builder()
            .timeout(Duration::from_secs(5))
            .build();
        let handle = executor.handle();

        let outcome = executor
            .run(async move {
                let owner = thread::current().id();
                let marshalled = thread::spawn(move || {
                    let marshalled = handle.marshal(async { thread::current().id() });
                    assert!(!marshalled.is_ready());
                    marshalled
                })
                .join()
                .unwrap();
                marshalled.await == owner
            })
            .unwrap();

        assert_eq!(outcome, RunOutcome::Completed(true));
    }

    #[test]
    fn failures_are_forwarded_unchanged() {
        let executor = ThreadAffineExecutor::builder().build();
        let handle = executor.handle();

        let outcome = executor
            .run(async move {
                let ready = handle.marshal(async { Err::<u8, &str>("boom") }).await;
                let scheduled = handle
                    .marshal(async {
                        futures_lite::future::yield_now().await;
                        Err::<u8, &str>("boom")
                    })
                    .await;
                (ready, scheduled)
            })
            .unwrap();

        assert_eq!(outcome, RunOutcome::Completed((Err("boom"), Err("boom"))));
    }
}
