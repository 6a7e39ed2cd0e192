//! Block pool statistics

use core::cell::Cell;

/// Point-in-time statistics for a block pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Successful acquires
    pub acquired: u64,
    /// Acquires served from the cache
    pub hits: u64,
    /// Acquires that needed a fresh allocation
    pub misses: u64,
    /// Blocks released back into the cache
    pub released: u64,
    /// Blocks handed to the allocator because the cache was full or shrunk
    pub evicted: u64,
    /// Idle blocks currently cached
    pub cached: usize,
    /// Blocks currently lent to callers
    pub outstanding: usize,
}

impl PoolStats {
    /// Calculate hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Running counters owned by the pool
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    hits: Cell<u64>,
    misses: Cell<u64>,
    released: Cell<u64>,
    evicted: Cell<u64>,
}

impl StatsCounters {
    #[inline]
    pub(crate) fn record_hit(&self) {
        self.hits.set(self.hits.get() + 1);
    }

    #[inline]
    pub(crate) fn record_miss(&self) {
        self.misses.set(self.misses.get() + 1);
    }

    #[inline]
    pub(crate) fn record_release(&self) {
        self.released.set(self.released.get() + 1);
    }

    #[inline]
    pub(crate) fn record_eviction(&self) {
        self.evicted.set(self.evicted.get() + 1);
    }

    pub(crate) fn snapshot(&self, cached: usize, outstanding: usize) -> PoolStats {
        let hits = self.hits.get();
        let misses = self.misses.get();
        PoolStats {
            acquired: hits + misses,
            hits,
            misses,
            released: self.released.get(),
            evicted: self.evicted.get(),
            cached,
            outstanding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let stats = PoolStats {
            acquired: 100,
            hits: 75,
            misses: 25,
            released: 70,
            evicted: 5,
            cached: 0,
            outstanding: 25,
        };
        assert!((stats.hit_rate() - 0.75).abs() < 0.001);
        assert!(PoolStats::default().hit_rate().abs() < f64::EPSILON);
    }

    #[test]
    fn test_snapshot_sums_acquires() {
        let counters = StatsCounters::default();
        counters.record_miss();
        counters.record_hit();
        counters.record_hit();
        counters.record_release();
        counters.record_eviction();

        let stats = counters.snapshot(1, 2);
        assert_eq!(stats.acquired, 3);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.released, 1);
        assert_eq!(stats.evicted, 1);
        assert_eq!((stats.cached, stats.outstanding), (1, 2));
    }
}
