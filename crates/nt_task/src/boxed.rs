//! Boxed trait objects shared by every crate of the workspace.

use alloc::boxed::Box;
use core::error::Error;
use core::pin::Pin;

/// An owned and dynamically typed `Send` future, used when the concrete
/// future type cannot be named (batch source results, dispatch jobs).
pub type BoxedFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A type-erased error raised by user callbacks such as tick hooks.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;
