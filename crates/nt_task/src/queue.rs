use core::fmt;
use std::time::Instant;

use async_channel::{Receiver, Sender};
use async_io::Timer;
use futures_lite::FutureExt;

use crate::Task;

// -----------------------------------------------------------------------------
// Wake

/// Why the owning thread left [`TaskQueue::wait`].
#[derive(Debug)]
pub(crate) enum Wake {
    /// A task arrived; it is the first task of the next tick.
    Task(Task),
    /// The deadline passed.
    Deadline,
    /// The queue was closed.
    Closed,
}

// -----------------------------------------------------------------------------
// TaskQueue

/// An unbounded multi-producer, single-consumer FIFO of [`Task`]s.
///
/// [`enqueue`](Self::enqueue) may be called from any thread and never blocks.
/// Everything else is reserved to the owning thread of the executor that
/// holds the queue.
///
/// Closing the queue is permanent: later tasks are handed back to the caller
/// and tasks still queued are only dropped, never executed.
pub struct TaskQueue {
    sender: Sender<Task>,
    receiver: Receiver<Task>,
}

impl TaskQueue {
    /// Creates an empty, open queue.
    pub fn new() -> Self {
        let (sender, receiver) = async_channel::unbounded();
        Self { sender, receiver }
    }

    /// Appends a task.
    ///
    /// Returns the task back if the queue has been closed.
    #[inline]
    pub fn enqueue(&self, task: Task) -> Result<(), Task> {
        self.sender.try_send(task).map_err(|err| err.into_inner())
    }

    /// Number of queued tasks.
    #[inline]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Pops the oldest task.
    #[inline]
    pub(crate) fn pop(&self) -> Option<Task> {
        self.receiver.try_recv().ok()
    }

    /// Runs one tick: `first` (if any), then every queued task in FIFO order
    /// until the queue is empty.
    ///
    /// Tasks enqueued while draining, by a running task or by another
    /// thread, run in the same tick.
    ///
    /// Returns the number of executed tasks.
    pub(crate) fn drain_tick(&self, first: Option<Task>) -> usize {
        let mut executed = 0;

        if let Some(task) = first {
            task.run();
            executed += 1;
        }

        while let Some(task) = self.pop() {
            task.run();
            executed += 1;
        }

        executed
    }

    /// Blocks until a task is queued, the queue closes, or `deadline` passes.
    ///
    /// A queued task always wins over an elapsed deadline.
    pub(crate) fn wait(&self, deadline: Option<Instant>) -> Wake {
        let next = async {
            match self.receiver.recv().await {
                Ok(task) => Wake::Task(task),
                Err(_) => Wake::Closed,
            }
        };

        let timer = match deadline {
            Some(deadline) => Timer::at(deadline),
            None => Timer::never(),
        };
        let timer = async {
            timer.await;
            Wake::Deadline
        };

        async_io::block_on(next.or(timer))
    }

    /// Stops accepting tasks. Queued tasks stay until drained or abandoned.
    #[inline]
    pub(crate) fn close(&self) {
        let _ = self.sender.close();
    }

    /// Closes the queue and drops every queued task without running it.
    ///
    /// Returns the number of abandoned tasks.
    pub(crate) fn abandon(&self) -> usize {
        self.close();

        let mut abandoned = 0;
        while let Some(task) = self.pop() {
            drop(task);
            abandoned += 1;
        }
        abandoned
    }
}

impl Default for TaskQueue {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("tasks", &self.len())
            .field("closed", &self.is_closed())
            .finish()
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
    use std::time::Instant;

    use super::{TaskQueue, Wake};
    use crate::Task;

    fn recorder(log: &Arc<Mutex<Vec<usize>>>, n: usize) -> Task {
        let log = log.clone();
        Task::new(move || log.lock().unwrap().push(n))
    }

    #[test]
    fn drains_in_fifo_order() {
        let queue = TaskQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for n in 0..5 {
            queue.enqueue(recorder(&log, n)).unwrap();
        }

        assert_eq!(queue.drain_tick(None), 5);
        assert_eq!(*log.lock().unwrap(), [0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn tasks_enqueued_while_draining_run_in_same_tick() {
        let queue = Arc::new(TaskQueue::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let inner = recorder(&log, 2);
        let outer = {
            let queue = queue.clone();
            let log = log.clone();
            Task::new(move || {
                log.lock().unwrap().push(0);
                queue.enqueue(inner).unwrap();
            })
        };
        queue.enqueue(outer).unwrap();
        queue.enqueue(recorder(&log, 1)).unwrap();

        assert_eq!(queue.drain_tick(None), 3);
        assert_eq!(*log.lock().unwrap(), [0, 1, 2]);
        assert!(queue.is_empty());
    }

    #[test]
    fn closed_queue_rejects_and_abandons() {
        let queue = TaskQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        queue.enqueue(recorder(&log, 0)).unwrap();
        queue.enqueue(recorder(&log, 1)).unwrap();

        assert_eq!(queue.abandon(), 2);
        assert!(queue.is_closed());
        assert!(queue.enqueue(recorder(&log, 2)).is_err());
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn wait_wakes_on_producer() {
        let queue = Arc::new(TaskQueue::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let producer = {
            let queue = queue.clone();
            let task = recorder(&log, 7);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                queue.enqueue(task).unwrap();
            })
        };

        let deadline = Instant::now() + Duration::from_secs(5);
        match queue.wait(Some(deadline)) {
            Wake::Task(task) => task.run(),
            other => panic!("unexpected wake: {other:?}"),
        }
        producer.join().unwrap();

        assert_eq!(*log.lock().unwrap(), [7]);
    }

    #[test]
    fn wait_respects_deadline() {
        let queue = TaskQueue::new();
        let start = Instant::now();

        let wake = queue.wait(Some(start + Duration::from_millis(30)));

        assert!(matches!(wake, Wake::Deadline));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
