use alloc::sync::Arc;
use core::fmt;
use core::time::Duration;

use nt_task::BoxError;
use serde::{Deserialize, Serialize};

/// A custom callback fired on the owning thread after every tick.
pub type NextTick = Arc<dyn Fn() -> Result<(), BoxError> + Send + Sync + 'static>;

// -----------------------------------------------------------------------------
// RunOptions

/// Configuration of one [`EventLoopDispatcher::run`](crate::EventLoopDispatcher::run).
///
/// - `timeout`: global deadline of the run. Unbounded by default.
/// - `dispatch_batches_on_tick`: dispatch every pending batch request after
///   each tick. Enabled by default.
/// - `next_tick`: custom callback fired after each tick, after the batch
///   dispatch. Not serialized.
///
/// Options can be read from configuration files, with the timeout in
/// milliseconds:
///
/// ```
/// use core::time::Duration;
/// use nt_dispatch::RunOptions;
///
/// let options: RunOptions = ron::from_str("(timeout_ms: Some(250))").unwrap();
///
/// assert_eq!(options.timeout(), Some(Duration::from_millis(250)));
/// assert!(options.dispatch_batches_on_tick());
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    #[serde(rename = "timeout_ms", with = "millis")]
    timeout: Option<Duration>,
    dispatch_batches_on_tick: bool,
    #[serde(skip)]
    next_tick: Option<NextTick>,
}

impl Default for RunOptions {
    #[inline]
    fn default() -> Self {
        Self {
            timeout: None,
            dispatch_batches_on_tick: true,
            next_tick: None,
        }
    }
}

impl RunOptions {
    /// Sets the run timeout. `None` means unbounded.
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.timeout = timeout.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_dispatch_batches_on_tick(mut self, enabled: bool) -> Self {
        self.dispatch_batches_on_tick = enabled;
        self
    }

    /// Sets the callback fired after every tick. An error aborts the run with
    /// [`DispatchError::HookFailure`](crate::DispatchError::HookFailure).
    #[inline]
    #[must_use]
    pub fn with_next_tick(
        mut self,
        next_tick: impl Fn() -> Result<(), BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.next_tick = Some(Arc::new(next_tick));
        self
    }

    #[inline]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    #[inline]
    pub fn dispatch_batches_on_tick(&self) -> bool {
        self.dispatch_batches_on_tick
    }

    #[inline]
    pub fn next_tick(&self) -> Option<&NextTick> {
        self.next_tick.as_ref()
    }
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("timeout", &self.timeout)
            .field("dispatch_batches_on_tick", &self.dispatch_batches_on_tick)
            .field("next_tick", &self.next_tick.is_some())
            .finish()
    }
}

mod millis {
    use core::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub(super) fn serialize<S: Serializer>(
        timeout: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        timeout
            .map(|timeout| u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX))
            .serialize(serializer)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

// -----------------------------------------------------------------------------
// Tests
