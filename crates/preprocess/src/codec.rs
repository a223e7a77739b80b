use crate::Placement;
use crate::config::{DEFAULT_INPUT_SIZE, NormalizationRecipe};
use common::{span, span_debug};
use fast_image_resize::{
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
    images::{Image, ImageRef},
};
use ndarray::{Array4, ArrayView4};

const LETTERBOX_COLOR: u8 = 114;
const CHANNELS: usize = 3;

pub struct TensorCodec {
    input_size: (u32, u32),
    recipe: NormalizationRecipe,
    resizer: Resizer,
    /// Stretch target, exactly `input_size`
    resized: Image<'static>,
    letterboxed_buffer: Vec<u8>,
    /// NCHW, batch of one
    tensor: Array4<f32>,
}

impl TensorCodec {
    pub fn new(input_size: (u32, u32), recipe: NormalizationRecipe) -> Self {
        let (w, h) = (input_size.0 as usize, input_size.1 as usize);
        Self {
            input_size,
            recipe,
            resizer: Resizer::new(),
            resized: Image::new(input_size.0, input_size.1, PixelType::U8x3),
            letterboxed_buffer: vec![LETTERBOX_COLOR; w * h * CHANNELS],
            tensor: Array4::zeros((1, CHANNELS, h, w)),
        }
    }

    /// The tensor written by the last [`encode`](Self::encode) call.
    pub fn tensor(&self) -> ArrayView4<'_, f32> {
        self.tensor.view()
    }

    /// Encode an interleaved 3-channel frame into the input tensor.
    ///
    /// A zero-sized frame or a pixel buffer that does not hold exactly
    /// `width * height * 3` bytes is rejected.
    pub fn encode(&mut self, pixels: &[u8], width: u32, height: u32) -> anyhow::Result<Placement> {
        let _s = span!("preprocess_frame");

        tracing::trace!(
            width,
            height,
            pixel_bytes = pixels.len(),
            "Preprocessing frame dimensions"
        );

        if width == 0 || height == 0 {
            anyhow::bail!("Zero-sized frame: {}x{}", width, height);
        }

        let expected_size = width as usize * height as usize * CHANNELS;
        if pixels.len() != expected_size {
            anyhow::bail!(
                "Buffer size mismatch: expected {}, got {} bytes",
                expected_size,
                pixels.len()
            );
        }

        let src = ImageRef::new(width, height, pixels, PixelType::U8x3)?;
        let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));

        let spatial = self.input_size.0 as usize * self.input_size.1 as usize;
        let out = self
            .tensor
            .as_slice_mut()
            .ok_or_else(|| anyhow::anyhow!("Input tensor is not contiguous"))?;

        if self.recipe.keep_aspect {
            let placement = Self::letterbox(
                &mut self.resizer,
                &src,
                (width, height),
                &options,
                self.input_size,
                &mut self.letterboxed_buffer,
            )?;
            Self::normalize(&self.letterboxed_buffer, &self.recipe, out, spatial);
            Ok(placement)
        } else {
            let _r = span_debug!("resize");
            self.resizer.resize(&src, &mut self.resized, &options)?;
            Self::normalize(self.resized.buffer(), &self.recipe, out, spatial);
            Ok(Placement::stretch((width, height), self.input_size))
        }
    }

    fn letterbox(
        resizer: &mut Resizer,
        src: &ImageRef<'_>,
        (width, height): (u32, u32),
        options: &ResizeOptions,
        input_size: (u32, u32),
        letterboxed_buffer: &mut [u8],
    ) -> anyhow::Result<Placement> {
        let _s = span_debug!("resize_and_letterbox");

        let scale = (input_size.0 as f32 / width as f32).min(input_size.1 as f32 / height as f32);
        let new_width = ((width as f32 * scale) as u32).clamp(1, input_size.0);
        let new_height = ((height as f32 * scale) as u32).clamp(1, input_size.1);

        let offset_x = (input_size.0 - new_width) / 2;
        let offset_y = (input_size.1 - new_height) / 2;

        let mut resized = Image::new(new_width, new_height, PixelType::U8x3);
        resizer.resize(src, &mut resized, options)?;

        letterboxed_buffer.fill(LETTERBOX_COLOR);

        let resized_data = resized.buffer();
        let stride = input_size.0 as usize * CHANNELS;
        let row_len = new_width as usize * CHANNELS;

        for y in 0..new_height as usize {
            let src_row = y * row_len;
            let dst_row = (y + offset_y as usize) * stride + offset_x as usize * CHANNELS;

            letterboxed_buffer[dst_row..dst_row + row_len]
                .copy_from_slice(&resized_data[src_row..src_row + row_len]);
        }

        Ok(Placement {
            x_factor: width as f32 / new_width as f32,
            y_factor: height as f32 / new_height as f32,
            offset_x: offset_x as f32,
            offset_y: offset_y as f32,
        })
    }

    /// HWC u8 -> CHW f32
    fn normalize(buf: &[u8], recipe: &NormalizationRecipe, output: &mut [f32], spatial: usize) {
        let _s = span_debug!("normalize");

        for (i, px) in buf.chunks_exact(CHANNELS).enumerate() {
            let ordered = if recipe.swap_channels {
                [px[2], px[1], px[0]]
            } else {
                [px[0], px[1], px[2]]
            };

            for (c, value) in ordered.into_iter().enumerate() {
                output[i + c * spatial] =
                    (value as f32 / recipe.scale - recipe.mean[c]) / recipe.std[c];
            }
        }
    }
}

impl Default for TensorCodec {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_SIZE, NormalizationRecipe::default())
    }
}
