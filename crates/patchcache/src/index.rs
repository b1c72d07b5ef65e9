//! Bounded, insertion-ordered similarity index over windows
//!
//! Lookup is a deliberate linear scan: entries are visited oldest to newest
//! and the first one whose L2 distance to the query is strictly below the
//! threshold wins, even if a later entry is closer. Capacity is enforced by
//! dropping the oldest entry before an append would overflow.

use crate::{ConvError, Result};
use patchcache_core::tensor::squared_distance;
use patchcache_core::{CoreError, Window};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::trace;

/// Relative slack on the digest bound, covering rounding in the distance
/// and in the subtraction of digests.
const DIGEST_SLACK: f64 = 1e-6;

/// Configuration for a similarity index
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Maximum number of entries (0 disables caching)
    pub capacity: usize,
    /// L2 distance below which a cached window matches
    pub threshold: f32,
    /// Skip entries whose content digest rules out a match
    pub digest_prefilter: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            capacity: crate::DEFAULT_CACHE_SIZE,
            threshold: crate::DEFAULT_SIMILARITY_THRESHOLD,
            digest_prefilter: true,
        }
    }
}

impl IndexConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(ConvError::config(format!(
                "similarity_threshold must be a finite non-negative number, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Lifetime counters for an index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Lookups performed
    pub lookups: u64,
    /// Lookups that returned a cached result
    pub hits: u64,
    /// Entries appended
    pub inserts: u64,
    /// Entries dropped to respect capacity
    pub evictions: u64,
    /// Full distance computations
    pub distance_evals: u64,
    /// Entries skipped by the digest bound
    pub prefilter_skips: u64,
}

impl IndexStats {
    /// Hit rate over all lookups
    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.hits as f64 / self.lookups as f64
        }
    }
}

/// A cached window together with the result computed for it
#[derive(Debug, Clone)]
pub struct CacheEntry {
    window: Window,
    result: Vec<f32>,
}

impl CacheEntry {
    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn result(&self) -> &[f32] {
        &self.result
    }
}

/// Approximate-match window cache with oldest-first eviction
#[derive(Debug)]
pub struct SimilarityIndex {
    config: IndexConfig,
    entries: VecDeque<CacheEntry>,
    stats: IndexStats,
}

impl SimilarityIndex {
    /// Create an empty index
    pub fn new(config: IndexConfig) -> Self {
        Self {
            config,
            entries: VecDeque::with_capacity(config.capacity.min(4096)),
            stats: IndexStats::default(),
        }
    }

    /// Return the result of the oldest entry within `threshold` of `window`
    ///
    /// Fails only if `window` has a different shape than a visited entry.
    pub fn lookup(&mut self, window: &Window) -> Result<Option<&[f32]>> {
        self.stats.lookups += 1;

        let threshold = f64::from(self.config.threshold);
        let n = window.len() as f64;
        // |sum(a) - sum(b)| <= sqrt(n) * ||a - b||
        let distance_bound = threshold * n.sqrt();

        let mut found = None;
        for (pos, entry) in self.entries.iter().enumerate() {
            if entry.window.shape() != window.shape() {
                return Err(ConvError::Internal(CoreError::IncompatibleWindows {
                    left: entry.window.shape(),
                    right: window.shape(),
                }));
            }

            if self.config.digest_prefilter {
                // each computed digest is off by at most n * eps * sum(|v|)
                let magnitude = entry.window.abs_sum() + window.abs_sum();
                let rounding = n * f64::EPSILON * magnitude;
                let bound =
                    (distance_bound + rounding) * (1.0 + DIGEST_SLACK) + f64::MIN_POSITIVE;
                if (entry.window.digest() - window.digest()).abs() > bound {
                    self.stats.prefilter_skips += 1;
                    continue;
                }
            }

            self.stats.distance_evals += 1;
            let distance = squared_distance(entry.window.as_slice(), window.as_slice()).sqrt();
            if distance < threshold {
                found = Some(pos);
                break;
            }
        }

        match found {
            Some(pos) => {
                self.stats.hits += 1;
                Ok(self.entries.get(pos).map(|e| e.result.as_slice()))
            }
            None => Ok(None),
        }
    }

    /// Append an entry, evicting the oldest one first if the index is full
    pub fn insert(&mut self, window: Window, result: Vec<f32>) {
        if self.config.capacity == 0 {
            self.stats.evictions += 1;
            return;
        }

        while self.entries.len() >= self.config.capacity {
            if self.entries.pop_front().is_some() {
                self.stats.evictions += 1;
                trace!(len = self.entries.len(), "evicted oldest cache entry");
            }
        }

        self.entries.push_back(CacheEntry { window, result });
        self.stats.inserts += 1;
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn threshold(&self) -> f32 {
        self.config.threshold
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn stats(&self) -> IndexStats {
        self.stats
    }

    /// Entries from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.iter()
    }

    /// Drop all entries and reset counters
    pub fn clear(&mut self) {
        self.entries.clear();
        self.stats = IndexStats::default();
    }
}
