//! Error types for tensor and window operations.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by the dense buffer and window types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Flat data length does not match the declared shape.
    #[error("shape mismatch: {context} expects {expected} elements, got {actual}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Requested window extends past the buffer extent.
    #[error(
        "window {kernel_h}x{kernel_w} at batch {batch}, ({h_start}, {w_start}) exceeds buffer extent {height}x{width}"
    )]
    WindowOutOfBounds {
        batch: usize,
        h_start: usize,
        w_start: usize,
        kernel_h: usize,
        kernel_w: usize,
        height: usize,
        width: usize,
    },

    /// Element coordinate outside the buffer.
    #[error("index {index:?} out of range for shape {shape:?}")]
    IndexOutOfRange { index: [usize; 4], shape: [usize; 4] },

    /// Windows of different shapes cannot be compared.
    #[error("incompatible windows: {left:?} vs {right:?}")]
    IncompatibleWindows {
        left: [usize; 3],
        right: [usize; 3],
    },
}

impl CoreError {
    /// Create a shape mismatch error.
    pub fn shape_mismatch(context: &'static str, expected: usize, actual: usize) -> Self {
        CoreError::ShapeMismatch {
            context,
            expected,
            actual,
        }
    }

    /// Get error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            CoreError::ShapeMismatch { .. } => "shape_mismatch",
            CoreError::WindowOutOfBounds { .. } => "window_out_of_bounds",
            CoreError::IndexOutOfRange { .. } => "index_out_of_range",
            CoreError::IncompatibleWindows { .. } => "incompatible_windows",
        }
    }
}
