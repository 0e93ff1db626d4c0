#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use nt_batch as batch;
pub use nt_dispatch as dispatch;
pub use nt_task as task;
