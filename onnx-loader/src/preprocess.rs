//! Image → tensor conversion for image classifiers.
//!
//! Decodes PNG/JPEG bytes, resizes to the model's spatial input size and
//! scales pixels to `[0, 1]`. The channel layout follows the model's
//! declared input shape: `[N, 3, H, W]` is channels-first (PyTorch
//! exports), anything else is treated as channels-last (Keras exports).

use crate::error::{OnnxError, Result};
use image::imageops::FilterType;
use ndarray::Array4;

/// Spatial size used when the model declares dynamic dimensions.
pub const DEFAULT_IMAGE_SIZE: u32 = 224;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `[N, C, H, W]`
    Nchw,
    /// `[N, H, W, C]`
    Nhwc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSpec {
    pub width: u32,
    pub height: u32,
    pub layout: Layout,
}

impl Default for ImageSpec {
    fn default() -> Self {
        Self {
            width: DEFAULT_IMAGE_SIZE,
            height: DEFAULT_IMAGE_SIZE,
            layout: Layout::Nhwc,
        }
    }
}

impl ImageSpec {
    /// Derive the expected image size and layout from an input shape.
    ///
    /// Dynamic (`<= 0`) dimensions fall back to [`DEFAULT_IMAGE_SIZE`].
    pub fn from_input_shape(shape: &[i64]) -> Self {
        if shape.len() != 4 {
            return Self::default();
        }
        let dim = |d: i64| {
            if d > 0 {
                d as u32
            } else {
                DEFAULT_IMAGE_SIZE
            }
        };
        if shape[1] == 3 {
            Self {
                width: dim(shape[3]),
                height: dim(shape[2]),
                layout: Layout::Nchw,
            }
        } else {
            Self {
                width: dim(shape[2]),
                height: dim(shape[1]),
                layout: Layout::Nhwc,
            }
        }
    }

    /// Tensor shape for a single image.
    pub fn tensor_shape(&self) -> Vec<i64> {
        let (h, w) = (self.height as i64, self.width as i64);
        match self.layout {
            Layout::Nchw => vec![1, 3, h, w],
            Layout::Nhwc => vec![1, h, w, 3],
        }
    }
}

/// Decode and lay out an image as a flat `f32` buffer matching
/// [`ImageSpec::tensor_shape`].
pub fn image_to_tensor(bytes: &[u8], spec: &ImageSpec) -> Result<Vec<f32>> {
    if bytes.is_empty() {
        return Err(OnnxError::InvalidInput("empty image".to_string()));
    }
    let rgb = image::load_from_memory(bytes)?
        .resize_exact(spec.width, spec.height, FilterType::Triangle)
        .to_rgb8();

    let (h, w) = (spec.height as usize, spec.width as usize);
    let pixel = |y: usize, x: usize, c: usize| rgb.get_pixel(x as u32, y as u32)[c] as f32 / 255.0;

    let array = match spec.layout {
        Layout::Nchw => Array4::from_shape_fn((1, 3, h, w), |(_, c, y, x)| pixel(y, x, c)),
        Layout::Nhwc => Array4::from_shape_fn((1, h, w, 3), |(_, y, x, c)| pixel(y, x, c)),
    };
    Ok(array.iter().copied().collect())
}

/// Index of the largest value, `None` for an empty or all-NaN slice.
pub fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(idx, _)| idx)
}
