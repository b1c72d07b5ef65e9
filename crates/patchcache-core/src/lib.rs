//! # Patchcache Core
//!
//! Core types shared by the patchcache operator crates.
//!
//! The patch cache reuses previously computed convolution outputs for input
//! windows that are numerically close to a window seen earlier in the scan.
//! This crate holds the pieces that carry no caching policy of their own:
//!
//! - [`DenseTensor`] - a flat NCHW `f32` buffer that can pad itself and slice
//!   receptive-field windows
//! - [`Window`] - an owned `C x KH x KW` slice with its content digest
//! - [`Pair`] - a `(height, width)` pair for kernel, stride and padding
//! - [`ScanStats`] - hit/total counters for one window scan
//!
//! ## Layout
//!
//! ```text
//! DenseTensor (N, C, H, W), row-major, W fastest
//!
//!   batch b ─┬─ channel 0 ─ [h0: w0 w1 w2 ...][h1: ...] ...
//!            ├─ channel 1 ─ ...
//!            └─ channel C-1
//!
//! Window at (b, h_start, w_start) with kernel (KH, KW):
//!   [c0: KH x KW][c1: KH x KW] ... [c(C-1): KH x KW]
//! ```

pub mod error;
pub mod stats;
pub mod tensor;
pub mod types;

pub use error::{CoreError, Result};
pub use stats::ScanStats;
pub use tensor::{DenseTensor, Window};
pub use types::Pair;
