use crate::{
    backend::{InferenceBackend, OutputShapeError, OutputTensor},
    bus::MessageBus,
    config::SensorConfig,
    error::PipelineError,
    event::{Detection, DetectionEvent},
    processing::PostProcessor,
    source::{Frame, VideoSource},
    state_machine::{PipelineEvent, PipelineState, StateContext},
    throughput::Throughput,
};
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use preprocess::TensorCodec;
use std::fs;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// What a completed run did; returned when the pipeline reaches STOPPED.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub states: Vec<PipelineState>,
    pub source_uri: String,
    pub frames_processed: u64,
    pub detections: u64,
    pub events_published: u64,
}

impl RunSummary {
    pub fn final_state(&self) -> PipelineState {
        self.states.last().copied().unwrap_or(PipelineState::Init)
    }
}

/// Engine plus the buffers it reads and writes, allocated once at load
/// time and reused for every frame.
struct Pipeline<B> {
    backend: B,
    codec: TensorCodec,
    output: OutputTensor,
    postprocessor: PostProcessor,
}

impl<B: InferenceBackend> Pipeline<B> {
    fn process(&mut self, frame: &Frame, frame_number: u64) -> Result<Vec<Detection>, PipelineError> {
        if frame.channels != 3 {
            return Err(PipelineError::Frame {
                frame: frame_number,
                reason: format!("expected 3 channels, got {}", frame.channels),
            });
        }

        let placement = self
            .codec
            .encode(&frame.data, frame.width, frame.height)
            .map_err(|e| PipelineError::Frame {
                frame: frame_number,
                reason: format!("{e:#}"),
            })?;

        {
            let _span = tracing::info_span!("model_inference", frame_number).entered();
            self.backend
                .infer(self.codec.tensor(), &mut self.output)
                .map_err(|e| PipelineError::Inference {
                    frame: frame_number,
                    reason: format!("{e:#}"),
                })?;
        }

        Ok(self
            .postprocessor
            .process(&self.output, &placement, frame.size()))
    }
}

fn init_metrics(
    meter_name: &'static str,
) -> (Histogram<f64>, Counter<u64>, Counter<u64>, Counter<u64>) {
    let meter = global::meter(meter_name);
    let latency_buckets = [
        0.001, 0.002, 0.005, 0.007, 0.01, 0.015, 0.02, 0.025, 0.03, 0.04, 0.05, 0.075, 0.1, 0.15,
        0.2, 0.5,
    ];
    let duration_histogram: Histogram<f64> = meter
        .f64_histogram("sensor_frame_duration_seconds")
        .with_description("Time to process a single frame (encode + infer + decode + publish)")
        .with_unit("s")
        .with_boundaries(latency_buckets.to_vec())
        .build();
    let frames_counter: Counter<u64> = meter
        .u64_counter("sensor_frames_total")
        .with_description("Total frames processed")
        .build();
    let detections_counter: Counter<u64> = meter
        .u64_counter("sensor_detections_total")
        .with_description("Total detections surviving suppression")
        .build();
    let events_counter: Counter<u64> = meter
        .u64_counter("sensor_events_published_total")
        .with_description("Total detection events handed to the message bus")
        .build();

    (
        duration_histogram,
        frames_counter,
        detections_counter,
        events_counter,
    )
}

/// Drives one video source through the model and publishes what it finds.
pub struct DetectionService<B, S, M> {
    config: SensorConfig,
    source: S,
    bus: M,
    state: StateContext,
    _backend: PhantomData<B>,
}

impl<B, S, M> DetectionService<B, S, M>
where
    B: InferenceBackend,
    S: VideoSource,
    M: MessageBus,
{
    pub fn new(config: SensorConfig, source: S, bus: M) -> Self {
        let state = StateContext::new(config.fallback_source().is_some());
        Self {
            config,
            source,
            bus,
            state,
            _backend: PhantomData,
        }
    }

    /// Runs until the source ends or `shutdown` is raised.
    ///
    /// Startup failures and runtime engine failures end in FAILED and are
    /// returned as errors.
    pub fn run(mut self, shutdown: &AtomicBool) -> Result<RunSummary, PipelineError> {
        self.transition(PipelineEvent::Start);

        let options = self.config.bus_options();
        if let Err(e) = self.bus.connect(&options) {
            return Err(self.fail(PipelineError::BrokerUnavailable {
                endpoint: options.endpoint(),
                reason: e.to_string(),
            }));
        }
        self.transition(PipelineEvent::BrokerConnected);

        let mut pipeline = match self.load_pipeline() {
            Ok(pipeline) => pipeline,
            Err(e) => return Err(self.fail(e)),
        };
        self.transition(PipelineEvent::EngineLoaded);

        let source_uri = match self.open_source() {
            Ok(uri) => uri,
            Err(e) => return Err(self.fail(e)),
        };
        self.transition(PipelineEvent::SourceOpened);

        let (duration_histogram, frames_counter, detections_counter, events_counter) =
            init_metrics("sensor");
        let source_attr = [KeyValue::new("source", source_uri.clone())];

        let mut throughput = Throughput::new();
        let mut total_detections = 0u64;
        let mut events_published = 0u64;

        tracing::info!(source = %source_uri, topic = %self.config.topic, "Starting detection loop");

        loop {
            if shutdown.load(Ordering::Relaxed) {
                tracing::info!("Shutdown requested");
                self.transition(PipelineEvent::ShutdownRequested);
                break;
            }

            let frame = match self.source.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    tracing::info!(frames = throughput.frames(), "End of stream");
                    self.transition(PipelineEvent::StreamEnded);
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Frame read failed, treating as end of stream");
                    self.transition(PipelineEvent::StreamEnded);
                    break;
                }
            };

            let start = Instant::now();
            let frame_number = throughput.frames();

            let detections = match pipeline.process(&frame, frame_number) {
                Ok(detections) => detections,
                Err(e) => return Err(self.fail(e)),
            };
            let objects = detections.len();

            let timestamp_ms = chrono::Utc::now().timestamp_millis();
            if let Some(event) = DetectionEvent::build(detections, timestamp_ms) {
                match event.to_payload() {
                    Ok(payload) => {
                        self.bus.publish(&self.config.topic, payload);
                        events_published += 1;
                        events_counter.add(1, &source_attr);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, frame_number, "Failed to serialize event");
                    }
                }
            }

            let elapsed = start.elapsed();
            throughput.record(elapsed);
            total_detections += objects as u64;

            duration_histogram.record(elapsed.as_secs_f64(), &source_attr);
            frames_counter.add(1, &source_attr);
            detections_counter.add(objects as u64, &source_attr);

            self.transition(PipelineEvent::FrameProcessed);

            let frames = throughput.frames();
            if self.config.log_every_frames > 0 && frames.is_multiple_of(self.config.log_every_frames)
            {
                tracing::info!(
                    frames,
                    fps = %format!("{:.1}", throughput.fps()),
                    objects,
                    events_published,
                    "Throughput"
                );
            } else {
                tracing::trace!(frame_number, objects, "Frame processed");
            }
        }

        Ok(RunSummary {
            states: self.state.history().to_vec(),
            source_uri,
            frames_processed: throughput.frames(),
            detections: total_detections,
            events_published,
        })
    }

    fn load_pipeline(&self) -> Result<Pipeline<B>, PipelineError> {
        let path = &self.config.model_path;

        let artifact = fs::read(path).map_err(|e| PipelineError::ArtifactUnreadable {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        tracing::info!(
            path = %path,
            bytes = artifact.len(),
            provider = ?self.config.execution_provider,
            "Loading inference engine"
        );

        let mut backend = B::load(&artifact, self.config.execution_provider).map_err(|e| {
            PipelineError::EngineLoad {
                path: path.clone(),
                reason: format!("{e:#}"),
            }
        })?;

        let codec = TensorCodec::new(self.config.input_size, self.config.recipe());
        let mut output = OutputTensor::zeros(self.config.num_classes, self.config.num_candidates);

        // Warm-up on the zeroed input pins the output shape at load time
        backend
            .infer(codec.tensor(), &mut output)
            .map_err(|e| match e.downcast_ref::<OutputShapeError>() {
                Some(shape) => PipelineError::ShapeMismatch {
                    expected: shape.expected,
                    actual: shape.actual.clone(),
                },
                None => PipelineError::EngineLoad {
                    path: path.clone(),
                    reason: format!("warm-up inference failed: {e:#}"),
                },
            })?;

        tracing::info!(
            input = ?self.config.input_size,
            output = ?output.shape(),
            "Inference engine ready"
        );

        Ok(Pipeline {
            backend,
            codec,
            output,
            postprocessor: PostProcessor::new(
                self.config.confidence_threshold,
                self.config.iou_threshold,
            ),
        })
    }

    /// Primary source first, then the fallback once.
    fn open_source(&mut self) -> Result<String, PipelineError> {
        let mut fallback = self.config.fallback_source().map(str::to_string);
        let mut uri = self.config.source_uri.clone();
        let mut tried = Vec::new();

        loop {
            match self.source.open(&uri) {
                Ok(()) => {
                    tracing::info!(uri = %uri, fallback = self.state.on_fallback(), "Video source opened");
                    return Ok(uri);
                }
                Err(e) => {
                    tracing::warn!(uri = %uri, error = %e, "Failed to open video source");
                    tried.push(uri);

                    let next = match self.transition(PipelineEvent::SourceOpenFailed) {
                        Some(PipelineState::SourceOpening) => fallback.take(),
                        _ => None,
                    };
                    match next {
                        Some(next) => uri = next,
                        None => return Err(PipelineError::NoSource { tried }),
                    }
                }
            }
        }
    }

    fn transition(&mut self, event: PipelineEvent) -> Option<PipelineState> {
        let from = self.state.current_state();
        let entered = self.state.update(event);
        if let Some(to) = entered {
            tracing::info!(from = %from, to = %to, event = ?event, "Pipeline state changed");
        }
        entered
    }

    fn fail(&mut self, error: PipelineError) -> PipelineError {
        self.transition(PipelineEvent::Fault);
        tracing::error!(error = %error, "Pipeline failed");
        error
    }
}
