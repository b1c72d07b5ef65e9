//! Operator configuration

use crate::index::IndexConfig;
use crate::{ConvError, Result};
use patchcache_core::Pair;
use serde::{Deserialize, Serialize};

/// How long the similarity index lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePersistence {
    /// A fresh index for every `forward` call
    #[default]
    PerInvocation,
    /// One index shared by all `forward` calls on the operator
    AcrossInvocations,
}

/// How output coordinates are scanned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStrategy {
    /// One index, batch-row-column order
    #[default]
    Sequential,
    /// One private index per batch item, items scanned in parallel.
    /// Windows from different items never match each other.
    ShardedPerBatch,
}

/// Configuration for [`CachedConv2d`](crate::CachedConv2d)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvConfig {
    /// Input channels
    pub in_channels: usize,
    /// Output channels
    pub out_channels: usize,
    /// Kernel height and width
    pub kernel_size: Pair,
    /// Step between windows
    #[serde(default = "default_stride")]
    pub stride: Pair,
    /// Zero padding on each spatial side
    #[serde(default)]
    pub padding: Pair,
    /// Similarity index capacity
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
    /// L2 distance cutoff for reuse
    #[serde(default = "default_threshold")]
    pub similarity_threshold: f32,
    /// Skip distance computations the content digest rules out
    #[serde(default = "default_prefilter")]
    pub digest_prefilter: bool,
    #[serde(default)]
    pub persistence: CachePersistence,
    #[serde(default)]
    pub strategy: ScanStrategy,
}

fn default_stride() -> Pair {
    Pair::square(1)
}

fn default_cache_size() -> usize {
    crate::DEFAULT_CACHE_SIZE
}

fn default_threshold() -> f32 {
    crate::DEFAULT_SIMILARITY_THRESHOLD
}

fn default_prefilter() -> bool {
    true
}

impl Default for ConvConfig {
    fn default() -> Self {
        Self::new(1, 1, 3)
    }
}

impl ConvConfig {
    /// Create a config with default stride, padding and cache settings
    pub fn new(in_channels: usize, out_channels: usize, kernel_size: impl Into<Pair>) -> Self {
        Self {
            in_channels,
            out_channels,
            kernel_size: kernel_size.into(),
            stride: default_stride(),
            padding: Pair::default(),
            cache_size: default_cache_size(),
            similarity_threshold: default_threshold(),
            digest_prefilter: default_prefilter(),
            persistence: CachePersistence::default(),
            strategy: ScanStrategy::default(),
        }
    }

    pub fn with_stride(mut self, stride: impl Into<Pair>) -> Self {
        self.stride = stride.into();
        self
    }

    pub fn with_padding(mut self, padding: impl Into<Pair>) -> Self {
        self.padding = padding.into();
        self
    }

    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_digest_prefilter(mut self, enabled: bool) -> Self {
        self.digest_prefilter = enabled;
        self
    }

    pub fn with_persistence(mut self, persistence: CachePersistence) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn with_strategy(mut self, strategy: ScanStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.in_channels == 0 {
            return Err(ConvError::config("in_channels must be positive"));
        }
        if self.out_channels == 0 {
            return Err(ConvError::config("out_channels must be positive"));
        }
        if self.kernel_size.has_zero() {
            return Err(ConvError::config(format!(
                "kernel_size must be positive, got {:?}",
                self.kernel_size
            )));
        }
        if self.stride.has_zero() {
            return Err(ConvError::config(format!(
                "stride must be positive, got {:?}",
                self.stride
            )));
        }
        if self.strategy == ScanStrategy::ShardedPerBatch
            && self.persistence == CachePersistence::AcrossInvocations
        {
            return Err(ConvError::config(
                "sharded scans cannot share a persistent index",
            ));
        }

        self.index_config().validate()
    }

    /// Settings for the similarity index
    pub fn index_config(&self) -> IndexConfig {
        IndexConfig {
            capacity: self.cache_size,
            threshold: self.similarity_threshold,
            digest_prefilter: self.digest_prefilter,
        }
    }

    /// Taps per output filter (`in_channels * KH * KW`)
    pub fn window_volume(&self) -> usize {
        self.in_channels * self.kernel_size.area()
    }

    /// Output `(height, width)` for an unpadded input of `(height, width)`
    ///
    /// Zero when the padded input is smaller than the kernel.
    pub fn output_extent(&self, height: usize, width: usize) -> (usize, usize) {
        let extent = |len: usize, pad: usize, k: usize, s: usize| {
            let padded = len + 2 * pad;
            if padded < k {
                0
            } else {
                (padded - k) / s + 1
            }
        };

        (
            extent(height, self.padding.h, self.kernel_size.h, self.stride.h),
            extent(width, self.padding.w, self.kernel_size.w, self.stride.w),
        )
    }
}
