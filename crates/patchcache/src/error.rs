//! Error types for the cached convolution operator

use patchcache_core::CoreError;
use thiserror::Error;

/// Errors that can occur while building or running the operator
#[derive(Debug, Error)]
pub enum ConvError {
    /// Configuration rejected at construction
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Parameter or input shape disagrees with the configuration
    #[error("Shape mismatch for {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Extent computation produced an unreachable window or coordinate
    #[error("Internal invariant violated: {0}")]
    Internal(#[from] CoreError),
}

impl ConvError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        ConvError::InvalidConfig(message.into())
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            ConvError::InvalidConfig(_) => "invalid_config",
            ConvError::ShapeMismatch { .. } => "shape_mismatch",
            ConvError::Internal(_) => "internal",
        }
    }
}

/// Result type for operator operations
pub type Result<T> = std::result::Result<T, ConvError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConvError::ShapeMismatch {
            context: "input channels",
            expected: 3,
            actual: 1,
        };
        assert!(err.to_string().contains("input channels"));
        assert_eq!(err.category(), "shape_mismatch");

        let err = ConvError::config("kernel_size must be positive");
        assert!(err.to_string().contains("kernel_size"));
    }

    #[test]
    fn test_core_error_is_internal() {
        let err: ConvError = CoreError::shape_mismatch("window", 9, 4).into();
        assert_eq!(err.category(), "internal");
    }
}
