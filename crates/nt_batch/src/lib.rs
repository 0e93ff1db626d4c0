#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod error;
mod hash;
mod loader;
mod options;
mod registry;
mod source;
mod stats;

// -----------------------------------------------------------------------------
// Exports

pub use error::BatchError;
pub use loader::{BatchJob, BatchLoader, LoadFuture};
pub use options::LoaderOptions;
pub use registry::BatchRegistry;
pub use source::BatchSource;
pub use stats::BatchStatistics;
