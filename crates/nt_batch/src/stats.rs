use core::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// -----------------------------------------------------------------------------
// BatchStatistics

/// A snapshot of batch loading counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStatistics {
    /// Calls made to batch sources.
    pub batch_invoke_count: u64,
    /// Keys sent to batch sources, summed over all calls.
    pub batch_load_count: u64,
    /// Individual `load` requests.
    pub load_count: u64,
    /// Requests answered from a loader cache.
    pub cache_hit_count: u64,
}

impl core::ops::Add for BatchStatistics {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            batch_invoke_count: self.batch_invoke_count + rhs.batch_invoke_count,
            batch_load_count: self.batch_load_count + rhs.batch_load_count,
            load_count: self.load_count + rhs.load_count,
            cache_hit_count: self.cache_hit_count + rhs.cache_hit_count,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatisticsCounters {
    batch_invoke: AtomicU64,
    batch_load: AtomicU64,
    load: AtomicU64,
    cache_hit: AtomicU64,
}

impl StatisticsCounters {
    #[inline]
    pub(crate) fn record_batch(&self, keys: usize) {
        self.batch_invoke.fetch_add(1, Ordering::Relaxed);
        self.batch_load.fetch_add(keys as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_load(&self) {
        self.load.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_cache_hit(&self) {
        self.cache_hit.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> BatchStatistics {
        BatchStatistics {
            batch_invoke_count: self.batch_invoke.load(Ordering::Relaxed),
            batch_load_count: self.batch_load.load(Ordering::Relaxed),
            load_count: self.load.load(Ordering::Relaxed),
            cache_hit_count: self.cache_hit.load(Ordering::Relaxed),
        }
    }
}
