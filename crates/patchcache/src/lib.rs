//! Approximate-Match Patch Caching
//!
//! This crate implements a convolution layer that skips work for input
//! windows it has effectively seen before:
//! - Every receptive field is compared against a bounded list of cached
//!   windows by L2 distance
//! - The first cached window closer than the threshold donates its output
//! - Otherwise the exact multiply-accumulate runs and its result is cached
//!
//! # Key Insight
//!
//! Natural inputs repeat themselves. Flat regions, borders and textures
//! produce many windows that differ by less than the noise floor, and each
//! of them would otherwise pay a full `out_channels x C x KH x KW` reduction.
//! Reuse is lossy: a hit returns the cached output as-is.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     CachedConv2d::forward                     │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                               │
//! │  for b, oh, ow:                                               │
//! │    padded ──> window(b, oh*sh, ow*sw) ──> SimilarityIndex     │
//! │                                              │                │
//! │                         hit ┌────────────────┴───┐ miss       │
//! │                             ↓                    ↓            │
//! │                     copy cached result   FallbackComputer     │
//! │                             │                    │            │
//! │                             │             insert (evict oldest)│
//! │                             ↓                    ↓            │
//! │                      output[b, :, oh, ow] <──────┘            │
//! │                                                               │
//! │  SimilarityIndex: VecDeque<(window, result)>, oldest first    │
//! │    lookup: first entry with ||q - w||₂ < threshold            │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod conv;
mod error;
mod fallback;
mod index;

pub use config::{CachePersistence, ConvConfig, ScanStrategy};
pub use conv::CachedConv2d;
pub use error::{ConvError, Result};
pub use fallback::FallbackComputer;
pub use index::{CacheEntry, IndexConfig, IndexStats, SimilarityIndex};
pub use patchcache_core::{DenseTensor, Pair, ScanStats, Window};

/// Default similarity index capacity
pub const DEFAULT_CACHE_SIZE: usize = 1000;

/// Default L2 distance below which a cached window is reused
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.1;

/// Prelude for common imports
pub mod prelude {
    pub use super::{
        CachedConv2d, ConvConfig, DenseTensor, Pair, Result, ScanStats, SimilarityIndex,
    };
}
