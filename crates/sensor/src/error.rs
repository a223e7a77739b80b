use thiserror::Error;

/// Conditions that end the pipeline in FAILED.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Broker unavailable at {endpoint}: {reason}")]
    BrokerUnavailable { endpoint: String, reason: String },

    #[error("Cannot read engine artifact {path}: {reason}")]
    ArtifactUnreadable { path: String, reason: String },

    #[error("Failed to load engine from {path}: {reason}")]
    EngineLoad { path: String, reason: String },

    #[error("Engine output shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: [usize; 2],
        actual: Vec<usize>,
    },

    #[error("No video source could be opened (tried: {})", .tried.join(", "))]
    NoSource { tried: Vec<String> },

    #[error("Malformed frame {frame}: {reason}")]
    Frame { frame: u64, reason: String },

    #[error("Inference failed on frame {frame}: {reason}")]
    Inference { frame: u64, reason: String },
}
