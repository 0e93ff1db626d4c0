#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod context;
mod dispatcher;
mod error;
mod marshaller;
mod options;

// -----------------------------------------------------------------------------
// Exports

pub use context::{ContextAlreadyBound, ExecutionContext, ExecutionId};
pub use dispatcher::EventLoopDispatcher;
pub use error::DispatchError;
pub use marshaller::Marshaller;
pub use options::{NextTick, RunOptions};
