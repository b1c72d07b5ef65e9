//! Dense NCHW buffers and receptive-field windows.

use crate::{CoreError, Pair, Result};

/// A dense 4-D `f32` buffer in NCHW layout.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseTensor {
    shape: [usize; 4],
    data: Vec<f32>,
}

impl DenseTensor {
    /// Allocate a zero-filled buffer.
    pub fn zeros(shape: [usize; 4]) -> Self {
        let len = shape.iter().product();
        Self {
            shape,
            data: vec![0.0; len],
        }
    }

    /// Allocate a buffer filled with one value.
    pub fn filled(shape: [usize; 4], value: f32) -> Self {
        let len = shape.iter().product();
        Self {
            shape,
            data: vec![value; len],
        }
    }

    /// Wrap flat row-major data.
    pub fn from_vec(shape: [usize; 4], data: Vec<f32>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(CoreError::shape_mismatch("tensor", expected, data.len()));
        }
        Ok(Self { shape, data })
    }

    /// Shape as `[batch, channels, height, width]`.
    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub fn batch(&self) -> usize {
        self.shape[0]
    }

    pub fn channels(&self) -> usize {
        self.shape[1]
    }

    pub fn height(&self) -> usize {
        self.shape[2]
    }

    pub fn width(&self) -> usize {
        self.shape[3]
    }

    /// Total element count.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    #[inline]
    fn offset(&self, n: usize, c: usize, h: usize, w: usize) -> usize {
        let [_, cs, hs, ws] = self.shape;
        ((n * cs + c) * hs + h) * ws + w
    }

    fn check_index(&self, index: [usize; 4]) -> Result<()> {
        if index.iter().zip(self.shape.iter()).any(|(&i, &s)| i >= s) {
            return Err(CoreError::IndexOutOfRange {
                index,
                shape: self.shape,
            });
        }
        Ok(())
    }

    /// Read one element.
    pub fn get(&self, n: usize, c: usize, h: usize, w: usize) -> Result<f32> {
        self.check_index([n, c, h, w])?;
        Ok(self.data[self.offset(n, c, h, w)])
    }

    /// Write one element.
    pub fn set(&mut self, n: usize, c: usize, h: usize, w: usize, value: f32) -> Result<()> {
        self.check_index([n, c, h, w])?;
        let idx = self.offset(n, c, h, w);
        self.data[idx] = value;
        Ok(())
    }

    /// Zero-pad both spatial dimensions symmetrically.
    pub fn pad(&self, padding: Pair) -> Self {
        if padding.h == 0 && padding.w == 0 {
            return self.clone();
        }

        let [n, c, h, w] = self.shape;
        let ph = h + 2 * padding.h;
        let pw = w + 2 * padding.w;
        let mut out = DenseTensor::zeros([n, c, ph, pw]);

        for plane in 0..n * c {
            let src = &self.data[plane * h * w..(plane + 1) * h * w];
            let dst = &mut out.data[plane * ph * pw..(plane + 1) * ph * pw];
            for row in 0..h {
                let d = (row + padding.h) * pw + padding.w;
                dst[d..d + w].copy_from_slice(&src[row * w..(row + 1) * w]);
            }
        }

        out
    }

    /// Copy the `C x KH x KW` region whose top-left corner is
    /// `(h_start, w_start)` in batch item `batch`.
    pub fn window(
        &self,
        batch: usize,
        h_start: usize,
        w_start: usize,
        kernel: Pair,
    ) -> Result<Window> {
        let [n, c, h, w] = self.shape;
        if batch >= n || h_start + kernel.h > h || w_start + kernel.w > w {
            return Err(CoreError::WindowOutOfBounds {
                batch,
                h_start,
                w_start,
                kernel_h: kernel.h,
                kernel_w: kernel.w,
                height: h,
                width: w,
            });
        }

        let mut data = Vec::with_capacity(c * kernel.area());
        for ch in 0..c {
            for row in h_start..h_start + kernel.h {
                let start = self.offset(batch, ch, row, w_start);
                data.extend_from_slice(&self.data[start..start + kernel.w]);
            }
        }

        Window::new(c, kernel, data)
    }

    /// Write one value per channel at spatial position `(h, w)` of batch item
    /// `batch`, i.e. `self[batch, :, h, w] = values`.
    pub fn write_channels(
        &mut self,
        batch: usize,
        h: usize,
        w: usize,
        values: &[f32],
    ) -> Result<()> {
        if values.len() != self.channels() {
            return Err(CoreError::shape_mismatch(
                "channel vector",
                self.channels(),
                values.len(),
            ));
        }
        self.check_index([batch, 0, h, w])?;

        let plane = self.height() * self.width();
        let base = self.offset(batch, 0, h, w);
        for (c, &v) in values.iter().enumerate() {
            self.data[base + c * plane] = v;
        }
        Ok(())
    }

    /// Copy batch item `batch` out as a standalone `(1, C, H, W)` buffer.
    pub fn batch_item(&self, batch: usize) -> Result<Self> {
        if batch >= self.batch() {
            return Err(CoreError::IndexOutOfRange {
                index: [batch, 0, 0, 0],
                shape: self.shape,
            });
        }
        let item = self.channels() * self.height() * self.width();
        let data = self.data[batch * item..(batch + 1) * item].to_vec();
        Ok(Self {
            shape: [1, self.shape[1], self.shape[2], self.shape[3]],
            data,
        })
    }

    /// Stack single-item buffers of identical `(C, H, W)` along the batch axis.
    pub fn stack(items: &[DenseTensor], chw: [usize; 3]) -> Result<Self> {
        let [c, h, w] = chw;
        let item = c * h * w;
        let mut data = Vec::with_capacity(items.len() * item);
        let mut batch = 0;
        for t in items {
            if t.shape[1..] != chw {
                return Err(CoreError::shape_mismatch(
                    "stacked item",
                    item,
                    t.shape[1] * t.shape[2] * t.shape[3],
                ));
            }
            batch += t.batch();
            data.extend_from_slice(&t.data);
        }
        Ok(Self {
            shape: [batch, c, h, w],
            data,
        })
    }
}

/// An owned `C x KH x KW` receptive field.
///
/// Windows are values: they never alias the buffer they were cut from, so a
/// cached window stays valid after the source buffer changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    channels: usize,
    kernel: Pair,
    data: Vec<f32>,
    digest: f64,
    abs_sum: f64,
}

impl Window {
    /// Wrap flat `C x KH x KW` data.
    pub fn new(channels: usize, kernel: Pair, data: Vec<f32>) -> Result<Self> {
        let expected = channels * kernel.area();
        if data.len() != expected {
            return Err(CoreError::shape_mismatch("window", expected, data.len()));
        }
        let digest = data.iter().map(|&v| f64::from(v)).sum();
        let abs_sum = data.iter().map(|&v| f64::from(v).abs()).sum();
        Ok(Self {
            channels,
            kernel,
            data,
            digest,
            abs_sum,
        })
    }

    /// Shape as `[channels, kernel_h, kernel_w]`.
    pub fn shape(&self) -> [usize; 3] {
        [self.channels, self.kernel.h, self.kernel.w]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Sum of all elements, accumulated in `f64`.
    pub fn digest(&self) -> f64 {
        self.digest
    }

    /// Sum of absolute values, accumulated in `f64`.
    ///
    /// Scales the rounding error of [`digest`](Self::digest): the computed
    /// digest is within `len() * f64::EPSILON * abs_sum()` of the exact sum.
    pub fn abs_sum(&self) -> f64 {
        self.abs_sum
    }

    /// Euclidean norm of `self - other`.
    pub fn l2_distance(&self, other: &Window) -> Result<f64> {
        if self.shape() != other.shape() {
            return Err(CoreError::IncompatibleWindows {
                left: self.shape(),
                right: other.shape(),
            });
        }
        Ok(squared_distance(&self.data, &other.data).sqrt())
    }
}

/// Sum of squared differences, accumulated in `f64`.
#[inline]
pub fn squared_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum()
}
