pub mod backend;
pub mod bus;
pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod processing;
pub mod service;
pub mod source;
pub mod state_machine;
pub mod throughput;

// Re-export commonly used types for convenience
pub use backend::{ExecutionProvider, InferenceBackend, OutputTensor};
pub use bus::{BusError, BusOptions, MessageBus};
pub use config::SensorConfig;
pub use error::PipelineError;
pub use event::{Detection, DetectionEvent};
pub use service::{DetectionService, RunSummary};
pub use source::{Frame, SourceError, VideoSource};
pub use state_machine::PipelineState;
