//! Exact window reduction used on cache misses

use crate::{ConvError, Result};
use patchcache_core::Window;

/// Multiply-accumulate of a window against every output filter, plus bias
///
/// Weights are stored flat as `out_channels x in_channels x KH x KW`, so
/// filter `c` is the contiguous slice `[c * volume, (c + 1) * volume)` and
/// lines up element-for-element with a window's `C x KH x KW` layout.
#[derive(Debug, Clone)]
pub struct FallbackComputer {
    weight: Vec<f32>,
    bias: Vec<f32>,
    volume: usize,
}

impl FallbackComputer {
    /// Create a reducer for `out_channels` filters of `volume` taps each
    pub fn new(
        out_channels: usize,
        volume: usize,
        weight: Vec<f32>,
        bias: Vec<f32>,
    ) -> Result<Self> {
        if out_channels == 0 {
            return Err(ConvError::config("out_channels must be at least 1"));
        }
        if volume == 0 {
            return Err(ConvError::config("window volume must be at least 1"));
        }
        if weight.len() != out_channels * volume {
            return Err(ConvError::ShapeMismatch {
                context: "weight",
                expected: out_channels * volume,
                actual: weight.len(),
            });
        }
        if bias.len() != out_channels {
            return Err(ConvError::ShapeMismatch {
                context: "bias",
                expected: out_channels,
                actual: bias.len(),
            });
        }

        Ok(Self {
            weight,
            bias,
            volume,
        })
    }

    pub fn out_channels(&self) -> usize {
        self.bias.len()
    }

    /// Taps per filter (`in_channels * KH * KW`)
    pub fn volume(&self) -> usize {
        self.volume
    }

    pub fn weight(&self) -> &[f32] {
        &self.weight
    }

    pub fn bias(&self) -> &[f32] {
        &self.bias
    }

    /// Compute `result[c] = sum(window * weight[c]) + bias[c]`
    pub fn compute(&self, window: &Window) -> Result<Vec<f32>> {
        if window.len() != self.volume {
            return Err(ConvError::ShapeMismatch {
                context: "window",
                expected: self.volume,
                actual: window.len(),
            });
        }

        let taps = window.as_slice();
        let result = self
            .weight
            .chunks_exact(self.volume)
            .zip(self.bias.iter())
            .map(|(filter, &b)| {
                let acc: f32 = filter.iter().zip(taps).map(|(&w, &x)| w * x).sum();
                acc + b
            })
            .collect();

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchcache_core::Pair;

    #[test]
    fn test_ones_kernel_sums_window() {
        let fc = FallbackComputer::new(1, 9, vec![1.0; 9], vec![0.0]).unwrap();
        let window = Window::new(1, Pair::square(3), vec![1.0; 9]).unwrap();
        assert_eq!(fc.compute(&window).unwrap(), vec![9.0]);
    }

    #[test]
    fn test_per_channel_filters_and_bias() {
        // two filters over a 2-channel 1x2 window
        let weight = vec![
            1.0, 0.0, 0.0, 1.0, // filter 0: picks x[0] + x[3]
            0.5, 0.5, 0.5, 0.5, // filter 1: mean * 2
        ];
        let fc = FallbackComputer::new(2, 4, weight, vec![10.0, -1.0]).unwrap();
        let window = Window::new(2, Pair::new(1, 2), vec![1.0, 2.0, 3.0, 4.0]).unwrap();

        assert_eq!(fc.compute(&window).unwrap(), vec![15.0, 4.0]);
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(FallbackComputer::new(2, 4, vec![0.0; 7], vec![0.0; 2]).is_err());
        assert!(FallbackComputer::new(2, 4, vec![0.0; 8], vec![0.0; 3]).is_err());

        let fc = FallbackComputer::new(1, 4, vec![0.0; 4], vec![0.0]).unwrap();
        let window = Window::new(1, Pair::square(3), vec![0.0; 9]).unwrap();
        assert!(fc.compute(&window).is_err());
    }

    #[test]
    fn test_rejects_empty_filters() {
        let err = FallbackComputer::new(1, 0, vec![], vec![0.0]).unwrap_err();
        assert!(matches!(err, ConvError::InvalidConfig(_)));

        let err = FallbackComputer::new(0, 4, vec![], vec![]).unwrap_err();
        assert!(matches!(err, ConvError::InvalidConfig(_)));
    }
}
