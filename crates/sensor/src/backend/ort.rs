use super::{ExecutionProvider, InferenceBackend, OutputTensor};
use ndarray::ArrayView4;
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::TensorRef,
};

pub struct OrtBackend {
    session: Session,
}

impl InferenceBackend for OrtBackend {
    fn load(artifact: &[u8], provider: ExecutionProvider) -> anyhow::Result<Self> {
        // Initialize ORT environment (idempotent)
        let _ = ort::init().commit();

        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?;

        match provider {
            ExecutionProvider::Cuda => {
                tracing::info!("Initializing ONNX Runtime with CUDA execution provider");
                builder = builder.with_execution_providers([
                    ort::execution_providers::CUDAExecutionProvider::default()
                        .with_device_id(0)
                        .build()
                        .error_on_failure(),
                ])?;
            }
            ExecutionProvider::Cpu => {
                tracing::info!("Initializing ONNX Runtime with CPU execution provider");
            }
        }

        let session = builder.commit_from_memory(artifact)?;

        tracing::info!(artifact_bytes = artifact.len(), "Model session created");
        Ok(Self { session })
    }

    fn infer(&mut self, input: ArrayView4<f32>, output: &mut OutputTensor) -> anyhow::Result<()> {
        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input)?])?;

        let raw = outputs[0].try_extract_array::<f32>()?;
        output.assign_from(raw)
    }
}
