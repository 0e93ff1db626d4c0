//! The thread-affine executor and its cross-thread handle.
//!
//! A [`ThreadAffineExecutor`] is created for one execution, driven once by
//! [`ThreadAffineExecutor::run`] on the thread that becomes its owner, and
//! then discarded. While it runs:
//!
//! - Every thread may [`submit`](ExecutorHandle::submit) tasks or
//!   [`spawn`](ExecutorHandle::spawn) futures through an [`ExecutorHandle`].
//! - Only the owning thread executes them, one at a time, in FIFO order.
//! - Work is processed in ticks. A tick drains the queue until it is empty,
//!   including tasks enqueued during the drain, then fires the tick hook,
//!   then blocks until more work or the deadline.
//!
//! No task ever runs concurrently with another task or with the hook, so by
//! the time the hook fires every continuation that was ready for this tick
//! has already registered its batch requests. Work submitted by the hook
//! itself runs in the next tick.

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::fmt;
use core::future::Future;
use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use core::time::Duration;
use std::sync::{Mutex, OnceLock, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Instant;

use async_task::Runnable;

use crate::queue::Wake;
use crate::status::AtomicRunStatus;
use crate::{BoxError, ExecutorError, RunStatus, Spawned, Task, TaskQueue};

// -----------------------------------------------------------------------------
// ExecutorId

/// A process-unique identifier of an executor, used in log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExecutorId(u64);

impl ExecutorId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ExecutorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "executor#{}", self.0)
    }
}

// -----------------------------------------------------------------------------
// Shared

/// Hook fired on the owning thread after every drained tick.
type TickHook = Box<dyn FnMut(&ExecutorHandle) -> Result<(), BoxError> + Send + 'static>;

struct Shared {
    id: ExecutorId,
    queue: TaskQueue,
    status: AtomicRunStatus,
    owner: OnceLock<ThreadId>,
    orphaned: AtomicUsize,
}

// -----------------------------------------------------------------------------
// ExecutorHandle

/// A cheap, clonable reference to a [`ThreadAffineExecutor`], usable from
/// any thread.
///
/// Producer threads use it to submit work; everything it submits executes on
/// the owning thread.
#[derive(Clone)]
pub struct ExecutorHandle {
    shared: Arc<Shared>,
}

impl ExecutorHandle {
    /// The executor's identifier.
    #[inline]
    pub fn id(&self) -> ExecutorId {
        self.shared.id
    }

    /// The current status. Lock-free, callable from any thread.
    #[inline]
    pub fn status(&self) -> RunStatus {
        self.shared.status.load()
    }

    /// Returns `true` iff called from the thread that invoked `run`.
    ///
    /// Always `false` before `run` has started.
    #[inline]
    pub fn is_owning_thread(&self) -> bool {
        self.shared
            .owner
            .get()
            .is_some_and(|owner| *owner == thread::current().id())
    }

    /// Returns `true` once the run stopped accepting tasks.
    ///
    /// This is already the case during the final hook pass after the
    /// computation completed: futures spawned from then on never run.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.shared.queue.is_closed()
    }

    /// Number of tasks that were submitted after termination and dropped.
    #[inline]
    pub fn orphaned(&self) -> usize {
        self.shared.orphaned.load(Ordering::SeqCst)
    }

    /// Queues `task` for execution on the owning thread.
    ///
    /// - Before `run` starts, the task is buffered and executed once it does.
    /// - After termination, the task is orphaned: it is dropped without ever
    ///   running. This is reported as [`ExecutorError::Terminated`] only to the
    ///   owning thread, which cannot expect its task to run any more; producer
    ///   threads get `Ok(())` and the orphan is counted in
    ///   [`orphaned`](Self::orphaned).
    pub fn submit(&self, task: impl FnOnce() + Send + 'static) -> Result<(), ExecutorError> {
        self.submit_task(Task::new(task))
    }

    pub(crate) fn submit_task(&self, task: Task) -> Result<(), ExecutorError> {
        let Err(task) = self.shared.queue.enqueue(task) else {
            return Ok(());
        };
        drop(task);

        let status = self.status();
        self.shared.orphaned.fetch_add(1, Ordering::SeqCst);
        log::debug!("{}: task submitted after the run ended ({status}) was orphaned", self.id());

        if self.is_owning_thread() {
            Err(ExecutorError::Terminated(status))
        } else {
            Ok(())
        }
    }

    /// Spawns `future` on the executor.
    ///
    /// The future may complete, and be woken, on any thread; it is only ever
    /// polled on the owning thread, one poll per task.
    ///
    /// # Panics
    ///
    /// Panics during polling are propagated to the returned [`Spawned`].
    pub fn spawn<F>(&self, future: F) -> Spawned<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let handle = self.clone();
        let schedule = move |runnable: Runnable| {
            // A runnable woken after termination is orphaned like any other task.
            let _ = handle.submit_task(Task::from_runnable(runnable));
        };

        let (runnable, task) = async_task::Builder::new()
            .propagate_panic(true)
            .spawn(|()| future, schedule);

        runnable.schedule();

        Spawned(task)
    }

    #[inline]
    fn queue(&self) -> &TaskQueue {
        &self.shared.queue
    }
}

impl fmt::Debug for ExecutorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorHandle")
            .field("id", &self.shared.id)
            .field("status", &self.shared.status)
            .field("tasks", &self.shared.queue.len())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// ExecutorBuilder

/// Builder for creating a [`ThreadAffineExecutor`].
///
/// - [`timeout`]: global deadline of the run, measured from the call to
///   `run`. Unbounded by default.
/// - [`tick_hook`]: callback fired on the owning thread after every drain.
///
/// [`timeout`]: Self::timeout
/// [`tick_hook`]: Self::tick_hook
#[derive(Default)]
#[must_use]
pub struct ExecutorBuilder {
    timeout: Option<Duration>,
    tick_hook: Option<TickHook>,
}

impl ExecutorBuilder {
    /// Creates a new [`ExecutorBuilder`].
    #[inline(always)]
    pub const fn new() -> Self {
        Self {
            timeout: None,
            tick_hook: None,
        }
    }

    /// Sets the run timeout. `None` means unbounded.
    #[inline]
    pub fn timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.timeout = timeout.into();
        self
    }

    /// Sets the tick boundary hook.
    ///
    /// The hook runs synchronously on the owning thread after each full
    /// drain and before the loop blocks again. Futures it spawns through the
    /// handle are polled in the next tick. An error aborts the run.
    ///
    /// Once the computation completes the hook fires one last time with the
    /// queue already [closed](ExecutorHandle::is_closed).
    #[inline]
    pub fn tick_hook(
        mut self,
        hook: impl FnMut(&ExecutorHandle) -> Result<(), BoxError> + Send + 'static,
    ) -> Self {
        self.tick_hook = Some(Box::new(hook));
        self
    }

    /// Creates the executor.
    pub fn build(self) -> ThreadAffineExecutor {
        ThreadAffineExecutor {
            handle: ExecutorHandle {
                shared: Arc::new(Shared {
                    id: ExecutorId::next(),
                    queue: TaskQueue::new(),
                    status: AtomicRunStatus::new(),
                    owner: OnceLock::new(),
                    orphaned: AtomicUsize::new(0),
                }),
            },
            timeout: self.timeout,
            tick_hook: Mutex::new(self.tick_hook),
        }
    }
}

// -----------------------------------------------------------------------------
// RunOutcome

/// How a run that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome<T> {
    /// The computation finished with this value.
    Completed(T),
    /// The deadline passed first; there is no value.
    TimedOut,
}

impl<T> RunOutcome<T> {
    /// Returns the value of a completed run.
    #[inline]
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::TimedOut => None,
        }
    }
}

// -----------------------------------------------------------------------------
// ThreadAffineExecutor

/// A blocking, tick-based run loop that executes every task on one thread.
///
/// See the [module documentation](self) for the execution model.
///
/// # Examples
///
/// ```
/// use nt_task::{RunOutcome, ThreadAffineExecutor};
///
/// let executor = ThreadAffineExecutor::builder().build();
/// let handle = executor.handle();
///
/// let outcome = executor.run(async move {
///     let owner = std::thread::current().id();
///     let polled_on = std::thread::spawn(move || {
///         // Spawned from another thread, polled on the owning thread.
///         handle.spawn(async { std::thread::current().id() })
///     })
///     .join()
///     .unwrap()
///     .await;
///     polled_on == owner
/// });
///
/// assert_eq!(outcome.unwrap(), RunOutcome::Completed(true));
/// ```
pub struct ThreadAffineExecutor {
    handle: ExecutorHandle,
    timeout: Option<Duration>,
    tick_hook: Mutex<Option<TickHook>>,
}

impl ThreadAffineExecutor {
    /// Creates a [`ExecutorBuilder`].
    #[inline]
    pub const fn builder() -> ExecutorBuilder {
        ExecutorBuilder::new()
    }

    /// Returns a handle usable from any thread.
    #[inline]
    pub fn handle(&self) -> ExecutorHandle {
        self.handle.clone()
    }

    #[inline]
    pub fn id(&self) -> ExecutorId {
        self.handle.id()
    }

    #[inline]
    pub fn status(&self) -> RunStatus {
        self.handle.status()
    }

    #[inline]
    pub fn is_owning_thread(&self) -> bool {
        self.handle.is_owning_thread()
    }

    /// The configured timeout, `None` if unbounded.
    #[inline]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Drives `computation` to completion on the calling thread.
    ///
    /// The calling thread becomes the owning thread. The loop drains the
    /// queue tick by tick, firing the tick hook after each drain, until:
    ///
    /// - the computation completes: the queue closes, one final
    ///   drain-and-hook pass flushes what was already queued, the status
    ///   becomes `Completed`, and the value is returned. Completion is
    ///   checked before the hook and the deadline, so the hook fires once
    ///   after completion and a computation that finished is never reported
    ///   as timed out.
    /// - the deadline passes: status `TimedOut`, queued tasks are abandoned,
    ///   and [`RunOutcome::TimedOut`] is returned.
    /// - the hook fails, including in the final pass: status `Failed`,
    ///   queued tasks are abandoned, and [`ExecutorError::HookFailure`] is
    ///   returned.
    ///
    /// # Errors
    ///
    /// [`ExecutorError::AlreadyRunning`] if `run` was called before on this
    /// executor, including re-entrant calls from one of its own tasks.
    ///
    /// # Panics
    ///
    /// A panic raised by a submitted task or by the computation unwinds out
    /// of `run`.
    pub fn run<F>(&self, computation: F) -> Result<RunOutcome<F::Output>, ExecutorError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let shared = &self.handle.shared;
        shared
            .status
            .advance(RunStatus::Created, RunStatus::Running)
            .map_err(|_| ExecutorError::AlreadyRunning)?;
        let _ = shared.owner.set(thread::current().id());

        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
        let mut hook = self
            .tick_hook
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        log::debug!(
            "{}: run started (timeout: {:?}, buffered tasks: {})",
            self.id(),
            self.timeout,
            self.handle.queue().len(),
        );

        let computation = self.handle.spawn(computation);
        let mut woken = None;
        let mut tick: u64 = 0;

        loop {
            tick += 1;
            let executed = self.handle.queue().drain_tick(woken.take());
            log::trace!("{}: tick {tick} executed {executed} tasks", self.id());

            if computation.is_finished() {
                return self.complete(computation, &mut hook).map(RunOutcome::Completed);
            }

            if let Err(err) = self.fire_hook(&mut hook) {
                return Err(self.fail(computation, err));
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Ok(self.time_out(computation));
            }

            match self.handle.queue().wait(deadline) {
                Wake::Task(task) => woken = Some(task),
                Wake::Deadline => return Ok(self.time_out(computation)),
                Wake::Closed => return Err(ExecutorError::Terminated(self.status())),
            }
        }
    }

    #[inline]
    fn fire_hook(&self, hook: &mut Option<TickHook>) -> Result<(), BoxError> {
        match hook {
            Some(hook) => hook(&self.handle),
            None => Ok(()),
        }
    }

    fn complete<T>(
        &self,
        computation: Spawned<T>,
        hook: &mut Option<TickHook>,
    ) -> Result<T, ExecutorError> {
        let shared = &self.handle.shared;
        shared.queue.close();

        let flushed = shared.queue.drain_tick(None);
        if let Err(err) = self.fire_hook(hook) {
            return Err(self.fail(computation, err));
        }

        let _ = shared.status.advance(RunStatus::Running, RunStatus::Completed);
        let abandoned = shared.queue.abandon();

        log::debug!(
            "{}: run completed (flushed {flushed} tasks, dropped {abandoned})",
            self.id()
        );

        Ok(futures_lite::future::block_on(computation))
    }

    fn time_out<T>(&self, computation: Spawned<T>) -> RunOutcome<T> {
        let shared = &self.handle.shared;
        let _ = shared.status.advance(RunStatus::Running, RunStatus::TimedOut);

        // Cancel first so the computation's last runnable is abandoned with the rest.
        drop(computation);
        let abandoned = shared.queue.abandon();

        log::warn!(
            "{}: run timed out after {:?}, abandoned {abandoned} queued tasks",
            self.id(),
            self.timeout.unwrap_or_default(),
        );

        RunOutcome::TimedOut
    }

    fn fail<T>(&self, computation: Spawned<T>, err: BoxError) -> ExecutorError {
        let shared = &self.handle.shared;
        let _ = shared.status.advance(RunStatus::Running, RunStatus::Failed);

        drop(computation);
        let abandoned = shared.queue.abandon();

        log::error!(
            "{}: tick hook failed, abandoned {abandoned} queued tasks: {err}",
            self.id()
        );

        ExecutorError::HookFailure(err)
    }
}

impl Drop for ThreadAffineExecutor {
    fn drop(&mut self) {
        // Queued runnables hold handles to the executor; drop them here.
        let abandoned = self.handle.queue().abandon();
        if abandoned > 0 {
            log::debug!("{}: dropped with {abandoned} queued tasks", self.id());
        }
    }
}

impl fmt::Debug for ThreadAffineExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadAffineExecutor")
            .field("handle", &self.handle)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use alloc::vec::Vec;
    use core::sync::atomic::{AtomicUsize, Ordering};
    use core::time::Duration;
    use std::sync::Mutex;
    use std::thread::{self, ThreadId};
    use std::time::Instant;

    use async_io::Timer;

    use super::{RunOutcome, ThreadAffineExecutor};
    use crate::{ExecutorError, RunStatus};

    #[test]
    fn is_sync_send() {
        fn is_sync<T: Sync>() {}
        is_sync::<ThreadAffineExecutor>();
        is_sync::<super::ExecutorHandle>();

        fn is_send<T: Send>() {}
        is_send::<ThreadAffineExecutor>();
        is_send::<super::ExecutorHandle>();
    }

    #[test]
    fn runs_single_computation() {
        let executor = ThreadAffineExecutor::builder().build();
        assert_eq!(executor.status(), RunStatus::Created);

        let outcome = executor.run(async { 42 }).unwrap();

        assert_eq!(outcome, RunOutcome::Completed(42));
        assert_eq!(executor.status(), RunStatus::Completed);
    }

    #[test]
    fn run_twice_fails() {
        let executor = ThreadAffineExecutor::builder().build();
        executor.run(async {}).unwrap();

        let second = executor.run(async {});
        assert!(matches!(second, Err(ExecutorError::AlreadyRunning)));
        assert_eq!(executor.status(), RunStatus::Completed);
    }

    #[test]
    fn owning_thread_is_captured_by_run() {
        let executor = ThreadAffineExecutor::builder().build();
        let handle = executor.handle();
        assert!(!handle.is_owning_thread());

        let inside = handle.clone();
        let outcome = executor.run(async move { inside.is_owning_thread() }).unwrap();

        assert_eq!(outcome, RunOutcome::Completed(true));
        assert!(handle.is_owning_thread());
        assert!(!thread::spawn(move || handle.is_owning_thread()).join().unwrap());
    }

    #[test]
    fn buffered_tasks_run_once_started() {
        let executor = ThreadAffineExecutor::builder().build();
        let handle = executor.handle();
        let log = Arc::new(Mutex::new(Vec::new()));

        for n in 0..3 {
            let log = log.clone();
            handle.submit(move || log.lock().unwrap().push(n)).unwrap();
        }

        let observed = log.clone();
        let outcome = executor
            .run(async move { observed.lock().unwrap().clone() })
            .unwrap();

        // Buffered tasks were queued before the computation's first poll.
        assert_eq!(outcome, RunOutcome::Completed(alloc::vec![0, 1, 2]));
    }

    #[test]
    fn tasks_from_many_threads_run_in_enqueue_order_on_owner() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 50;

        let executor = ThreadAffineExecutor::builder()
            .timeout(Duration::from_secs(10))
            .build();
        let handle = executor.handle();

        // Holding `sequence` while submitting makes enqueue order observable.
        let sequence = Arc::new(Mutex::new(0_usize));
        let records: Arc<Mutex<Vec<(usize, ThreadId)>>> = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = async_channel::unbounded::<()>();

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|_| {
                let handle = handle.clone();
                let sequence = sequence.clone();
                let records = records.clone();
                let done_tx = done_tx.clone();
                thread::spawn(move || {
                    for _ in 0..PER_PRODUCER {
                        let mut next = sequence.lock().unwrap();
                        let n = *next;
                        *next += 1;
                        let records = records.clone();
                        handle
                            .submit(move || {
                                records.lock().unwrap().push((n, thread::current().id()))
                            })
                            .unwrap();
                    }
                    done_tx.send_blocking(()).unwrap();
                })
            })
            .collect();

        let outcome = executor
            .run(async move {
                for _ in 0..PRODUCERS {
                    done_rx.recv().await.unwrap();
                }
            })
            .unwrap();
        assert_eq!(outcome, RunOutcome::Completed(()));

        for producer in producers {
            producer.join().unwrap();
        }

        let owner = thread::current().id();
        let records = records.lock().unwrap();
        assert_eq!(records.len(), PRODUCERS * PER_PRODUCER);
        for (expected, (n, thread)) in records.iter().enumerate() {
            assert_eq!(*n, expected);
            assert_eq!(*thread, owner);
        }
    }

    #[test]
    fn tasks_queued_before_boundary_run_before_hook() {
        let log = Arc::new(Mutex::new(Vec::new()));

        let hook_log = log.clone();
        let executor = ThreadAffineExecutor::builder()
            .tick_hook(move |_| {
                hook_log.lock().unwrap().push("hook");
                Ok(())
            })
            .build();
        let handle = executor.handle();

        let chain_log = log.clone();
        executor
            .run(async move {
                // B submits C while the tick is draining: both precede the hook.
                let b_log = chain_log.clone();
                let b_handle = handle.clone();
                handle
                    .submit(move || {
                        b_log.lock().unwrap().push("B");
                        let c_log = b_log.clone();
                        b_handle
                            .submit(move || c_log.lock().unwrap().push("C"))
                            .unwrap();
                    })
                    .unwrap();
                chain_log.lock().unwrap().push("A");
            })
            .unwrap();

        assert_eq!(*log.lock().unwrap(), ["A", "B", "C", "hook"]);
    }

    #[test]
    fn hook_work_runs_in_next_tick() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = async_channel::bounded::<()>(1);

        let hook_log = log.clone();
        let mut done_tx = Some(done_tx);
        let executor = ThreadAffineExecutor::builder()
            .tick_hook(move |handle| {
                hook_log.lock().unwrap().push("hook");
                if let Some(done_tx) = done_tx.take() {
                    let task_log = hook_log.clone();
                    handle.submit(move || {
                        task_log.lock().unwrap().push("X");
                        done_tx.try_send(()).unwrap();
                    })?;
                }
                Ok(())
            })
            .build();

        let start_log = log.clone();
        executor
            .run(async move {
                start_log.lock().unwrap().push("start");
                done_rx.recv().await.unwrap();
            })
            .unwrap();

        assert_eq!(*log.lock().unwrap(), ["start", "hook", "X", "hook"]);
    }

    #[test]
    fn hook_fires_once_after_completion() {
        let calls = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(Mutex::new(Vec::new()));

        let hook_calls = calls.clone();
        let hook_closed = closed.clone();
        let executor = ThreadAffineExecutor::builder()
            .tick_hook(move |handle| {
                hook_calls.fetch_add(1, Ordering::SeqCst);
                hook_closed.lock().unwrap().push(handle.is_closed());
                Ok(())
            })
            .build();

        let outcome = executor.run(async { 7 }).unwrap();

        assert_eq!(outcome, RunOutcome::Completed(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*closed.lock().unwrap(), [true]);
    }

    #[test]
    fn final_hook_failure_fails_run() {
        let executor = ThreadAffineExecutor::builder()
            .tick_hook(|handle| {
                if handle.is_closed() {
                    Err("final flush failed".into())
                } else {
                    Ok(())
                }
            })
            .build();

        let result = executor.run(async {
            Timer::after(Duration::from_millis(10)).await;
            7
        });

        match result {
            Err(ExecutorError::HookFailure(err)) => assert_eq!(err.to_string(), "final flush failed"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(executor.status(), RunStatus::Failed);
    }

    #[test]
    fn times_out_when_computation_is_slow() {
        let executor = ThreadAffineExecutor::builder()
            .timeout(Duration::from_millis(50))
            .build();

        let start = Instant::now();
        let outcome = executor
            .run(async {
                Timer::after(Duration::from_millis(500)).await;
                1
            })
            .unwrap();

        assert_eq!(outcome, RunOutcome::TimedOut);
        assert_eq!(executor.status(), RunStatus::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert!(start.elapsed() < Duration::from_millis(450));
    }

    #[test]
    fn completion_wins_over_elapsed_deadline() {
        let executor = ThreadAffineExecutor::builder()
            .timeout(Duration::ZERO)
            .build();

        let outcome = executor.run(async { "done" }).unwrap();

        assert_eq!(outcome, RunOutcome::Completed("done"));
        assert_eq!(executor.status(), RunStatus::Completed);
    }

    #[test]
    fn hook_failure_aborts_run() {
        let calls = Arc::new(AtomicUsize::new(0));
        let hook_calls = calls.clone();
        let executor = ThreadAffineExecutor::builder()
            .tick_hook(move |_| {
                hook_calls.fetch_add(1, Ordering::SeqCst);
                Err("flush failed".into())
            })
            .build();

        let result = executor.run(futures_lite::future::pending::<()>());

        match result {
            Err(ExecutorError::HookFailure(err)) => assert_eq!(err.to_string(), "flush failed"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(executor.status(), RunStatus::Failed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn tasks_after_termination_are_orphaned() {
        let executor = ThreadAffineExecutor::builder().build();
        let handle = executor.handle();
        executor.run(async {}).unwrap();

        let ran = Arc::new(AtomicUsize::new(0));

        let owner_ran = ran.clone();
        let owner = handle.submit(move || {
            owner_ran.fetch_add(1, Ordering::SeqCst);
        });
        assert!(matches!(owner, Err(ExecutorError::Terminated(RunStatus::Completed))));

        let producer = handle.clone();
        let producer_ran = ran.clone();
        let submitted = thread::spawn(move || {
            producer.submit(move || {
                producer_ran.fetch_add(1, Ordering::SeqCst);
            })
        })
        .join()
        .unwrap();
        assert!(submitted.is_ok());

        assert_eq!(handle.orphaned(), 2);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }
}
