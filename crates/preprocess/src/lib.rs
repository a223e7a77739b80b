//! Frame to input-tensor conversion.
//!
//! The codec owns the single input tensor for the lifetime of the process and
//! rewrites it in place for every frame; callers only ever see a view of it.

pub mod codec;
pub mod config;

pub use codec::TensorCodec;
pub use config::{DEFAULT_INPUT_SIZE, NormalizationRecipe};

/// Mapping from model-input coordinates back to frame pixels, produced by
/// [`TensorCodec::encode`] for the frame it just encoded.
///
/// `frame = (model - offset) * factor`, independently per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x_factor: f32,
    pub y_factor: f32,
    /// Horizontal padding in model pixels (letterbox only)
    pub offset_x: f32,
    /// Vertical padding in model pixels (letterbox only)
    pub offset_y: f32,
}

impl Placement {
    /// Plain stretch: frame dimension / model input dimension per axis.
    pub fn stretch(frame_size: (u32, u32), input_size: (u32, u32)) -> Self {
        Self {
            x_factor: frame_size.0 as f32 / input_size.0 as f32,
            y_factor: frame_size.1 as f32 / input_size.1 as f32,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    #[inline]
    pub fn map_x(&self, x: f32) -> f32 {
        (x - self.offset_x) * self.x_factor
    }

    #[inline]
    pub fn map_y(&self, y: f32) -> f32 {
        (y - self.offset_y) * self.y_factor
    }
}
