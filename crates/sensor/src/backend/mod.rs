use ndarray::{Array2, ArrayView2, ArrayView4};

#[cfg(feature = "ort-backend")]
pub mod ort;

/// Leading box-parameter rows: centerX, centerY, width, height
pub const BOX_ATTRIBUTES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionProvider {
    Cpu,
    Cuda,
}

impl std::str::FromStr for ExecutionProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda),
            other => anyhow::bail!("Unknown execution provider '{}'", other),
        }
    }
}

/// Opaque inference engine bound to one model with fixed input and output
/// shapes.
pub trait InferenceBackend {
    /// Build an engine from the serialized model bytes.
    fn load(artifact: &[u8], provider: ExecutionProvider) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Run one forward pass, writing the result into `output`.
    ///
    /// The engine must produce exactly `output.shape()`; a batch dimension of
    /// one may be present on its side and is dropped.
    fn infer(&mut self, input: ArrayView4<f32>, output: &mut OutputTensor) -> anyhow::Result<()>;
}

/// Engine output that does not match the configured `OutputTensor` shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Output shape mismatch: expected {expected:?}, got {actual:?}")]
pub struct OutputShapeError {
    pub expected: [usize; 2],
    pub actual: Vec<usize>,
}

/// Raw model output, `(4 + classes) x candidates`, row-major by attribute.
///
/// Allocated once at startup and overwritten by every inference.
#[derive(Debug, Clone)]
pub struct OutputTensor {
    data: Array2<f32>,
}

impl OutputTensor {
    pub fn zeros(num_classes: usize, num_candidates: usize) -> Self {
        Self {
            data: Array2::zeros((BOX_ATTRIBUTES + num_classes, num_candidates)),
        }
    }

    pub fn from_array(data: Array2<f32>) -> anyhow::Result<Self> {
        if data.nrows() <= BOX_ATTRIBUTES {
            anyhow::bail!(
                "Output tensor needs more than {} attribute rows, got {}",
                BOX_ATTRIBUTES,
                data.nrows()
            );
        }
        Ok(Self { data })
    }

    /// `[attributes, candidates]`
    pub fn shape(&self) -> [usize; 2] {
        [self.data.nrows(), self.data.ncols()]
    }

    pub fn num_classes(&self) -> usize {
        self.data.nrows() - BOX_ATTRIBUTES
    }

    pub fn num_candidates(&self) -> usize {
        self.data.ncols()
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }

    /// Overwrite from an engine-side view, accepting an optional leading
    /// batch dimension of one.
    pub fn assign_from(&mut self, raw: ndarray::ArrayViewD<'_, f32>) -> anyhow::Result<()> {
        let expected = self.shape();
        let mismatch = |actual: &[usize]| OutputShapeError {
            expected,
            actual: actual.to_vec(),
        };

        let raw = match raw.ndim() {
            3 if raw.shape()[0] == 1 => raw.index_axis_move(ndarray::Axis(0), 0),
            _ => raw,
        };
        let actual = raw.shape().to_vec();
        let raw = raw
            .into_dimensionality::<ndarray::Ix2>()
            .map_err(|_| mismatch(&actual))?;

        if raw.shape() != self.data.shape() {
            return Err(mismatch(&actual).into());
        }

        self.data.assign(&raw);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn};

    #[test]
    fn test_output_tensor_layout() {
        let out = OutputTensor::zeros(80, 8400);
        assert_eq!(out.shape(), [84, 8400]);
        assert_eq!(out.num_classes(), 80);
        assert_eq!(out.num_candidates(), 8400);
    }

    #[test]
    fn test_assign_strips_batch_dimension() {
        let mut out = OutputTensor::zeros(2, 3);
        let raw = Array::from_shape_fn(IxDyn(&[1, 6, 3]), |idx| (idx[1] * 3 + idx[2]) as f32);

        out.assign_from(raw.view()).unwrap();

        assert_eq!(out.view()[[5, 2]], 17.0);
    }

    #[test]
    fn test_assign_rejects_wrong_shape() {
        let mut out = OutputTensor::zeros(80, 8400);
        let raw = Array::<f32, _>::zeros(IxDyn(&[1, 84, 100]));

        let err = out.assign_from(raw.view()).unwrap_err();
        let shape_err = err.downcast_ref::<OutputShapeError>().unwrap();

        assert_eq!(shape_err.expected, [84, 8400]);
        assert_eq!(shape_err.actual, vec![84, 100]);
    }

    #[test]
    fn test_assign_rejects_batched_output() {
        let mut out = OutputTensor::zeros(2, 3);
        let raw = Array::<f32, _>::zeros(IxDyn(&[2, 6, 3]));

        assert!(out.assign_from(raw.view()).is_err());
    }

    #[test]
    fn test_execution_provider_parse() {
        assert_eq!(
            "CUDA".parse::<ExecutionProvider>().unwrap(),
            ExecutionProvider::Cuda
        );
        assert_eq!(
            "cpu".parse::<ExecutionProvider>().unwrap(),
            ExecutionProvider::Cpu
        );
        assert!("tpu".parse::<ExecutionProvider>().is_err());
    }
}
