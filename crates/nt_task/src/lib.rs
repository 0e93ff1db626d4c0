#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod boxed;
mod error;
mod executor;
mod marshal;
mod queue;
mod status;
mod task;

// -----------------------------------------------------------------------------
// Exports

pub use boxed::{BoxError, BoxedFuture};
pub use error::ExecutorError;
pub use executor::{ExecutorBuilder, ExecutorHandle, ExecutorId, RunOutcome, ThreadAffineExecutor};
pub use marshal::Marshalled;
pub use queue::TaskQueue;
pub use status::RunStatus;
pub use task::{Spawned, Task};

// -----------------------------------------------------------------------------
// Re-Exports

pub use futures_lite;
