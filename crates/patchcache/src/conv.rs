//! Cached 2-D convolution: the window-scan orchestrator

use crate::config::{CachePersistence, ConvConfig, ScanStrategy};
use crate::fallback::FallbackComputer;
use crate::index::{IndexStats, SimilarityIndex};
use crate::{ConvError, Result};
use patchcache_core::{DenseTensor, ScanStats};
use rayon::prelude::*;
use tracing::{debug, info};

/// Convolution layer that reuses outputs for near-duplicate windows
///
/// Every output coordinate's receptive field is looked up in a
/// [`SimilarityIndex`]. A hit copies the cached per-channel result verbatim;
/// a miss runs the exact reduction and caches it. Reuse is lossy by design:
/// a hit ignores how the new window differs from the cached one.
///
/// # Example
///
/// ```
/// use patchcache::{CachedConv2d, ConvConfig, DenseTensor};
///
/// let config = ConvConfig::new(1, 1, 3).with_threshold(10.0);
/// let mut conv = CachedConv2d::with_zero_bias(config, vec![1.0; 9]).unwrap();
///
/// let output = conv.forward(&DenseTensor::filled([1, 1, 4, 4], 1.0)).unwrap();
/// assert_eq!(output.shape(), [1, 1, 2, 2]);
/// assert_eq!(conv.last_stats().unwrap().hits, 3);
/// ```
#[derive(Debug)]
pub struct CachedConv2d {
    config: ConvConfig,
    fallback: FallbackComputer,
    persistent: Option<SimilarityIndex>,
    last_stats: Option<ScanStats>,
}

impl CachedConv2d {
    /// Create a layer from explicit parameters
    ///
    /// `weight` is flat `out_channels x in_channels x KH x KW`; `bias` has one
    /// value per output channel.
    pub fn new(config: ConvConfig, weight: Vec<f32>, bias: Vec<f32>) -> Result<Self> {
        config.validate()?;
        let fallback =
            FallbackComputer::new(config.out_channels, config.window_volume(), weight, bias)?;

        debug!(
            "Created CachedConv2d: {} -> {} channels, kernel {}x{}, stride {}x{}, padding {}x{}, cache_size {}, threshold {}",
            config.in_channels,
            config.out_channels,
            config.kernel_size.h,
            config.kernel_size.w,
            config.stride.h,
            config.stride.w,
            config.padding.h,
            config.padding.w,
            config.cache_size,
            config.similarity_threshold,
        );

        Ok(Self {
            config,
            fallback,
            persistent: None,
            last_stats: None,
        })
    }

    /// Create a layer with every bias set to zero
    pub fn with_zero_bias(config: ConvConfig, weight: Vec<f32>) -> Result<Self> {
        let bias = vec![0.0; config.out_channels];
        Self::new(config, weight, bias)
    }

    pub fn config(&self) -> &ConvConfig {
        &self.config
    }

    pub fn weight(&self) -> &[f32] {
        self.fallback.weight()
    }

    pub fn bias(&self) -> &[f32] {
        self.fallback.bias()
    }

    /// Counters from the most recent `forward` call
    pub fn last_stats(&self) -> Option<ScanStats> {
        self.last_stats
    }

    /// Entries currently held by a persistent index (0 when not persisting)
    pub fn cached_entries(&self) -> usize {
        self.persistent.as_ref().map_or(0, SimilarityIndex::len)
    }

    /// Lifetime counters of the persistent index
    pub fn index_stats(&self) -> Option<IndexStats> {
        self.persistent.as_ref().map(SimilarityIndex::stats)
    }

    /// Drop the persistent index, if any
    pub fn reset_cache(&mut self) {
        self.persistent = None;
    }

    /// Run the layer and return the output
    ///
    /// Input is `(batch, in_channels, height, width)`; output is
    /// `(batch, out_channels, out_height, out_width)`.
    pub fn forward(&mut self, input: &DenseTensor) -> Result<DenseTensor> {
        self.forward_with_stats(input).map(|(output, _)| output)
    }

    /// Run the layer and return the output along with the scan counters
    pub fn forward_with_stats(&mut self, input: &DenseTensor) -> Result<(DenseTensor, ScanStats)> {
        if input.channels() != self.config.in_channels {
            return Err(ConvError::ShapeMismatch {
                context: "input channels",
                expected: self.config.in_channels,
                actual: input.channels(),
            });
        }

        let (out_h, out_w) = self.config.output_extent(input.height(), input.width());
        let padded = input.pad(self.config.padding);

        let (output, stats) = match self.config.strategy {
            ScanStrategy::Sequential => self.scan_sequential(&padded, out_h, out_w)?,
            ScanStrategy::ShardedPerBatch => self.scan_sharded(&padded, out_h, out_w)?,
        };

        info!("{}", stats.report());
        self.last_stats = Some(stats);
        Ok((output, stats))
    }

    fn scan_sequential(
        &mut self,
        padded: &DenseTensor,
        out_h: usize,
        out_w: usize,
    ) -> Result<(DenseTensor, ScanStats)> {
        let mut index = match self.config.persistence {
            CachePersistence::AcrossInvocations => self
                .persistent
                .take()
                .unwrap_or_else(|| SimilarityIndex::new(self.config.index_config())),
            CachePersistence::PerInvocation => SimilarityIndex::new(self.config.index_config()),
        };

        let out_channels = self.config.out_channels;
        let mut output = DenseTensor::zeros([padded.batch(), out_channels, out_h, out_w]);
        let mut stats = ScanStats::new();

        let scanned = (0..padded.batch()).try_for_each(|b| {
            scan_item(
                &self.config,
                &self.fallback,
                padded,
                b,
                b,
                &mut index,
                &mut output,
                &mut stats,
            )
        });

        if self.config.persistence == CachePersistence::AcrossInvocations {
            self.persistent = Some(index);
        }
        scanned?;

        Ok((output, stats))
    }

    fn scan_sharded(
        &self,
        padded: &DenseTensor,
        out_h: usize,
        out_w: usize,
    ) -> Result<(DenseTensor, ScanStats)> {
        let out_c = self.config.out_channels;
        debug!("Scanning {} batch items with private indexes", padded.batch());

        let shards = (0..padded.batch())
            .into_par_iter()
            .map(|b| -> Result<(DenseTensor, ScanStats)> {
                let mut index = SimilarityIndex::new(self.config.index_config());
                let mut output = DenseTensor::zeros([1, out_c, out_h, out_w]);
                let mut stats = ScanStats::new();
                scan_item(
                    &self.config,
                    &self.fallback,
                    padded,
                    b,
                    0,
                    &mut index,
                    &mut output,
                    &mut stats,
                )?;
                Ok((output, stats))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut stats = ScanStats::new();
        let mut items = Vec::with_capacity(shards.len());
        for (output, shard_stats) in shards {
            stats.merge(&shard_stats);
            items.push(output);
        }

        let output = DenseTensor::stack(&items, [out_c, out_h, out_w])?;
        Ok((output, stats))
    }
}

/// Scan every output coordinate of batch item `batch`, writing into batch
/// slot `out_batch` of `output`.
#[allow(clippy::too_many_arguments)]
fn scan_item(
    config: &ConvConfig,
    fallback: &FallbackComputer,
    padded: &DenseTensor,
    batch: usize,
    out_batch: usize,
    index: &mut SimilarityIndex,
    output: &mut DenseTensor,
    stats: &mut ScanStats,
) -> Result<()> {
    let (out_h, out_w) = (output.height(), output.width());

    for oh in 0..out_h {
        for ow in 0..out_w {
            let h_start = oh * config.stride.h;
            let w_start = ow * config.stride.w;
            let window = padded.window(batch, h_start, w_start, config.kernel_size)?;

            let hit = match index.lookup(&window)? {
                Some(cached) => {
                    output.write_channels(out_batch, oh, ow, cached)?;
                    true
                }
                None => false,
            };

            if hit {
                stats.record_hit();
            } else {
                stats.record_miss();
                let result = fallback.compute(&window)?;
                output.write_channels(out_batch, oh, ow, &result)?;
                index.insert(window, result);
            }
        }
    }

    Ok(())
}
