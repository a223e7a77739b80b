pub const DEFAULT_INPUT_SIZE: (u32, u32) = (640, 640);

/// How raw 8-bit pixels become tensor values.
///
/// Each value is `(pixel / scale - mean[c]) / std[c]`, with `c` the output
/// channel after the optional swap.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationRecipe {
    pub scale: f32,
    /// Reverse channel order (BGR frames into an RGB model)
    pub swap_channels: bool,
    /// Letterbox into the input size instead of stretching
    pub keep_aspect: bool,
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for NormalizationRecipe {
    fn default() -> Self {
        Self {
            scale: 255.0,
            swap_channels: true,
            keep_aspect: false,
            mean: [0.0; 3],
            std: [1.0; 3],
        }
    }
}
