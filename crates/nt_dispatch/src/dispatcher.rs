//! The blocking entry point of an execution.

use core::future::Future;

use nt_task::{BoxError, ExecutorHandle, RunOutcome, ThreadAffineExecutor};

use crate::{DispatchError, ExecutionContext, NextTick, RunOptions};

// -----------------------------------------------------------------------------
// UnbindOnDrop

/// Releases the context's executor however the run ends.
struct UnbindOnDrop<'a>(&'a ExecutionContext);

impl Drop for UnbindOnDrop<'_> {
    fn drop(&mut self) {
        self.0.unbind();
    }
}

// -----------------------------------------------------------------------------
// EventLoopDispatcher

/// Runs executions on the calling thread.
///
/// Each call to [`run`](Self::run) builds a fresh [`ThreadAffineExecutor`]
/// for one execution; executors are never reused.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventLoopDispatcher;

impl EventLoopDispatcher {
    /// The executor of the execution currently running with `ctx`.
    #[inline]
    pub fn executor(ctx: &ExecutionContext) -> Option<ExecutorHandle> {
        ctx.executor()
    }

    /// Drives one execution to its end and returns its result.
    ///
    /// 1. An executor is built from `options` and bound to `ctx`.
    /// 2. `start` receives the bound context and returns the computation.
    /// 3. The calling thread runs the executor until the computation
    ///    completes, the timeout elapses, or a tick callback fails. After
    ///    every tick the batch requests registered with `ctx` are dispatched
    ///    (unless disabled), then the custom callback fires. In the last pass
    ///    after completion, requests still pending are failed with
    ///    `BatchError::Dropped` instead of reaching their source.
    /// 4. The executor is unbound, whatever the outcome.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::ContextAlreadyBound`] if `ctx` already runs an
    ///   execution; `start` is not called.
    /// - [`DispatchError::Timeout`] if the deadline passed first.
    /// - [`DispatchError::HookFailure`] if the batch dispatch or the custom
    ///   callback failed.
    /// - [`DispatchError::Upstream`] with the computation's own error.
    pub fn run<T, E, F, S>(
        ctx: &ExecutionContext,
        options: &RunOptions,
        start: S,
    ) -> Result<T, DispatchError<E>>
    where
        S: FnOnce(&ExecutionContext) -> F,
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let executor = Self::build_executor(ctx, options);
        ctx.bind(executor.handle())?;
        let _unbind = UnbindOnDrop(ctx);

        log::debug!("{}: started on {}", ctx.id(), executor.id());

        let computation = start(ctx);
        let outcome = executor.run(computation)?;

        log::debug!(
            "{}: finished ({}, {:?})",
            ctx.id(),
            executor.status(),
            ctx.batches().statistics(),
        );

        match outcome {
            RunOutcome::Completed(Ok(value)) => Ok(value),
            RunOutcome::Completed(Err(err)) => Err(DispatchError::Upstream(err)),
            RunOutcome::TimedOut => Err(DispatchError::Timeout(options.timeout().unwrap_or_default())),
        }
    }

    fn build_executor(ctx: &ExecutionContext, options: &RunOptions) -> ThreadAffineExecutor {
        let batches = options
            .dispatch_batches_on_tick()
            .then(|| ctx.batches().clone());
        let next_tick = options.next_tick().cloned();

        ThreadAffineExecutor::builder()
            .timeout(options.timeout())
            .tick_hook(move |handle| {
                if let Some(batches) = &batches {
                    if handle.is_closed() {
                        // Final pass: nothing spawned now would run.
                        let discarded = batches.discard_all();
                        if discarded > 0 {
                            log::debug!("{}: discarded {discarded} unsent batch keys", handle.id());
                        }
                        return call_next_tick(&next_tick);
                    }

                    let jobs = batches.dispatch_all();
                    if !jobs.is_empty() {
                        log::trace!("{}: dispatching {} batches", handle.id(), jobs.len());
                    }
                    for job in jobs {
                        handle.spawn(job).detach();
                    }
                }

                call_next_tick(&next_tick)
            })
            .build()
    }
}

#[inline]
fn call_next_tick(next_tick: &Option<NextTick>) -> Result<(), BoxError> {
    match next_tick {
        Some(next_tick) => next_tick(),
        None => Ok(()),
    }
}

// -----------------------------------------------------------------------------
// Tests
