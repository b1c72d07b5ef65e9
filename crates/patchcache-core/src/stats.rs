//! Hit/miss counters for a window scan.

use serde::{Deserialize, Serialize};

/// Counters from one scan over every output coordinate.
///
/// Reporting only: nothing in the cache reads these back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Windows answered from the cache.
    pub hits: u64,
    /// Windows scanned.
    pub total: u64,
}

impl ScanStats {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a window answered from the cache.
    pub fn record_hit(&mut self) {
        self.hits += 1;
        self.total += 1;
    }

    /// Count a window that needed the fallback reduction.
    pub fn record_miss(&mut self) {
        self.total += 1;
    }

    /// Windows that needed the fallback reduction.
    pub fn misses(&self) -> u64 {
        self.total.saturating_sub(self.hits)
    }

    /// Fraction of windows answered from the cache, 0 for an empty scan.
    pub fn hit_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.hits.min(self.total) as f64 / self.total as f64
        }
    }

    /// Add counters from another scan (e.g. a per-batch shard).
    pub fn merge(&mut self, other: &ScanStats) {
        self.hits += other.hits;
        self.total += other.total;
    }

    /// Human-readable hit-rate line.
    pub fn report(&self) -> String {
        format!(
            "Cache hit rate: {:.2}% ({}/{})",
            self.hit_rate() * 100.0,
            self.hits,
            self.total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_scan() {
        let stats = ScanStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
        assert_eq!(stats.report(), "Cache hit rate: 0.00% (0/0)");
    }

    #[test]
    fn test_counts() {
        let mut stats = ScanStats::new();
        stats.record_miss();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.misses(), 1);
        assert_eq!(stats.hit_rate(), 0.75);
        assert_eq!(stats.report(), "Cache hit rate: 75.00% (3/4)");
    }

    #[test]
    fn test_merge() {
        let mut a = ScanStats { hits: 1, total: 2 };
        a.merge(&ScanStats { hits: 3, total: 5 });
        assert_eq!(a, ScanStats { hits: 4, total: 7 });
    }

    #[test]
    fn test_inconsistent_counters_do_not_underflow() {
        let stats = ScanStats { hits: 2, total: 1 };
        assert_eq!(stats.misses(), 0);
        assert_eq!(stats.hit_rate(), 1.0);
    }
}
