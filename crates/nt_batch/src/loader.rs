use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::mem;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_channel::Sender;
use nt_task::BoxedFuture;

use crate::hash::{HashMap, new_map};
use crate::stats::StatisticsCounters;
use crate::{BatchError, BatchSource, BatchStatistics, LoaderOptions};

/// The eventual value of one `load`.
pub type LoadFuture<T> = BoxedFuture<'static, Result<T, BatchError>>;

/// One source call produced by a dispatch. Resolving it completes every
/// request of that call.
pub type BatchJob = BoxedFuture<'static, ()>;

type Reply<V> = Sender<Result<V, BatchError>>;

// -----------------------------------------------------------------------------
// Pending

/// Requests registered since the last dispatch, one entry per distinct key
/// in registration order.
struct Pending<K, V> {
    keys: Vec<(K, Vec<Reply<V>>)>,
    index: HashMap<K, usize>,
}

impl<K: Clone + Eq + core::hash::Hash, V> Pending<K, V> {
    fn new() -> Self {
        Self {
            keys: Vec::new(),
            index: new_map(),
        }
    }

    fn push(&mut self, key: K, reply: Reply<V>) {
        match self.index.get(&key) {
            Some(&slot) => self.keys[slot].1.push(reply),
            None => {
                self.index.insert(key.clone(), self.keys.len());
                self.keys.push((key, alloc::vec![reply]));
            }
        }
    }

    fn take(&mut self) -> Vec<(K, Vec<Reply<V>>)> {
        self.index.clear();
        mem::take(&mut self.keys)
    }
}

struct LoaderState<S: BatchSource> {
    pending: Pending<S::Key, S::Value>,
    cache: HashMap<S::Key, S::Value>,
}

// -----------------------------------------------------------------------------
// BatchLoader

/// Collects keyed requests for one [`BatchSource`] and sends them as batches.
///
/// Requests never reach the source on their own: they wait for the next
/// [`dispatch`](Self::dispatch). Keys requested several times before a
/// dispatch are sent once and every requester receives the value.
pub struct BatchLoader<S: BatchSource> {
    name: Arc<str>,
    source: S,
    options: LoaderOptions,
    state: Mutex<LoaderState<S>>,
    stats: StatisticsCounters,
}

impl<S: BatchSource> BatchLoader<S> {
    pub fn new(name: impl Into<Arc<str>>, source: S, options: LoaderOptions) -> Self {
        Self {
            name: name.into(),
            source,
            options,
            state: Mutex::new(LoaderState {
                pending: Pending::new(),
                cache: new_map(),
            }),
            stats: StatisticsCounters::default(),
        }
    }

    #[inline]
    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    #[inline]
    pub fn options(&self) -> LoaderOptions {
        self.options
    }

    #[inline]
    pub fn statistics(&self) -> BatchStatistics {
        self.stats.snapshot()
    }

    /// Number of distinct keys waiting for the next dispatch.
    pub fn pending(&self) -> usize {
        self.state().pending.keys.len()
    }

    #[inline]
    fn state(&self) -> MutexGuard<'_, LoaderState<S>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a request for `key`.
    ///
    /// The returned future resolves after a dispatch has sent the key and
    /// its source call has completed, or immediately on a cache hit.
    pub fn load(&self, key: S::Key) -> LoadFuture<S::Value> {
        self.stats.record_load();
        let mut state = self.state();

        if self.options.is_caching()
            && let Some(value) = state.cache.get(&key)
        {
            self.stats.record_cache_hit();
            let value = value.clone();
            return Box::pin(futures_lite::future::ready(Ok(value)));
        }

        let (reply, receiver) = async_channel::bounded(1);
        state.pending.push(key, reply);

        Box::pin(async move {
            receiver
                .recv()
                .await
                .unwrap_or(Err(BatchError::Dropped))
        })
    }

    /// Registers a request for each key; resolves to the values in key order
    /// or to the first failure.
    pub fn load_many(&self, keys: Vec<S::Key>) -> LoadFuture<Vec<S::Value>> {
        let loads: Vec<_> = keys.into_iter().map(|key| self.load(key)).collect();

        Box::pin(async move {
            let mut values = Vec::with_capacity(loads.len());
            for load in loads {
                values.push(load.await?);
            }
            Ok(values)
        })
    }

    /// Drops every cached value.
    pub fn clear_cache(&self) {
        self.state().cache.clear();
    }

    /// Takes everything registered since the last dispatch and turns it into
    /// source calls, at most `max_batch_size` keys each.
    ///
    /// The source is called right away; the returned jobs, one per call,
    /// drive its futures and deliver the values when polled. Returns no job
    /// when nothing is pending.
    pub fn dispatch(self: &Arc<Self>) -> Vec<BatchJob> {
        let mut batch = self.state().pending.take();
        if batch.is_empty() {
            return Vec::new();
        }

        let limit = self
            .options
            .batch_size_limit()
            .map_or(batch.len(), |limit| limit.get());

        let mut jobs = Vec::with_capacity(batch.len().div_ceil(limit));
        while !batch.is_empty() {
            let rest = batch.split_off(limit.min(batch.len()));
            let chunk = mem::replace(&mut batch, rest);
            jobs.push(self.call_source(chunk));
        }
        jobs
    }

    /// Fails every request registered since the last dispatch with
    /// [`BatchError::Dropped`], without calling the source.
    ///
    /// Returns the number of discarded keys.
    pub fn discard(&self) -> usize {
        let batch = self.state().pending.take();
        let discarded = batch.len();
        if discarded > 0 {
            log::debug!("batch source `{}`: discarding {discarded} pending keys", self.name);
            fail_all(batch, BatchError::Dropped);
        }
        discarded
    }

    fn call_source(self: &Arc<Self>, chunk: Vec<(S::Key, Vec<Reply<S::Value>>)>) -> BatchJob {
        let keys: Vec<S::Key> = chunk.iter().map(|(key, _)| key.clone()).collect();
        self.stats.record_batch(keys.len());
        log::trace!("batch source `{}`: sending {} keys", self.name, keys.len());

        let loader = Arc::clone(self);
        let call = self.source.load(keys);

        Box::pin(async move {
            let result = call.await;
            loader.complete(chunk, result);
        })
    }

    fn complete(
        &self,
        chunk: Vec<(S::Key, Vec<Reply<S::Value>>)>,
        result: Result<Vec<S::Value>, BatchError>,
    ) {
        let values = match result {
            Ok(values) if values.len() == chunk.len() => values,
            Ok(values) => {
                let err = BatchError::LengthMismatch {
                    expected: chunk.len(),
                    actual: values.len(),
                };
                return fail_all(chunk, err);
            }
            Err(err) => {
                log::debug!("batch source `{}` failed: {err}", self.name);
                return fail_all(chunk, err);
            }
        };

        if self.options.is_caching() {
            let mut state = self.state();
            for ((key, _), value) in chunk.iter().zip(&values) {
                state.cache.insert(key.clone(), value.clone());
            }
        }

        for ((_, replies), value) in chunk.into_iter().zip(values) {
            for reply in replies {
                // A requester that stopped waiting is not an error.
                let _ = reply.try_send(Ok(value.clone()));
            }
        }
    }
}

fn fail_all<K, V>(chunk: Vec<(K, Vec<Reply<V>>)>, err: BatchError) {
    for (_, replies) in chunk {
        for reply in replies {
            let _ = reply.try_send(Err(err.clone()));
        }
    }
}

impl<S: BatchSource> fmt::Debug for BatchLoader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchLoader")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Tests
