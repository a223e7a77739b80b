use crate::backend::ExecutionProvider;
use crate::bus::BusOptions;
use common::{env_flag, env_parse};
use preprocess::NormalizationRecipe;
use std::env;
use std::time::Duration;

pub use common::Environment;

#[derive(Debug, Clone)]
pub struct SensorConfig {
    pub environment: Environment,
    pub otel_endpoint: Option<String>,

    pub broker_host: String,
    pub broker_port: u16,
    pub client_id: String,
    pub topic: String,
    pub keep_alive_secs: u64,
    pub clean_session: bool,
    pub connect_timeout_ms: u64,

    pub model_path: String,
    pub execution_provider: ExecutionProvider,
    pub input_size: (u32, u32),
    pub num_classes: usize,
    pub num_candidates: usize,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,

    pub pixel_scale: f32,
    pub swap_channels: bool,
    pub keep_aspect: bool,
    pub channel_mean: [f32; 3],
    pub channel_std: [f32; 3],

    pub source_uri: String,
    pub fallback_source_uri: String,
    pub source_open_timeout_secs: u64,
    pub log_every_frames: u64,
}

impl SensorConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self {
            environment: Environment::from_env(),
            otel_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .ok()
                .filter(|s| !s.trim().is_empty()),

            broker_host: env_parse("MQTT_BROKER_HOST", "127.0.0.1".to_string()),
            broker_port: env_parse("MQTT_BROKER_PORT", 1883),
            client_id: env_parse("MQTT_CLIENT_ID", "traffic_ai_node".to_string()),
            topic: env_parse("MQTT_TOPIC", "traffic/sensor1".to_string()),
            keep_alive_secs: env_parse("MQTT_KEEP_ALIVE_SECS", 20),
            clean_session: env_flag("MQTT_CLEAN_SESSION", true),
            connect_timeout_ms: env_parse("MQTT_CONNECT_TIMEOUT_MS", 5000),

            model_path: env_parse("MODEL_PATH", "/app/data/yolov8n.onnx".to_string()),
            execution_provider: env_parse("EXECUTION_PROVIDER", ExecutionProvider::Cuda),
            input_size: (env_parse("INPUT_WIDTH", 640), env_parse("INPUT_HEIGHT", 640)),
            num_classes: env_parse("NUM_CLASSES", 80),
            num_candidates: env_parse("NUM_CANDIDATES", 8400),
            confidence_threshold: env_parse("CONFIDENCE_THRESHOLD", 0.5),
            iou_threshold: env_parse("IOU_THRESHOLD", 0.45),

            pixel_scale: env_parse("PIXEL_SCALE", 255.0),
            swap_channels: env_flag("SWAP_CHANNELS", true),
            keep_aspect: env_flag("KEEP_ASPECT", false),
            channel_mean: env_triplet("CHANNEL_MEAN", [0.0; 3]),
            channel_std: env_triplet("CHANNEL_STD", [1.0; 3]),

            source_uri: env_parse("SOURCE_URI", "rtsp://127.0.0.1:8554/live".to_string()),
            fallback_source_uri: env::var("FALLBACK_SOURCE_URI")
                .unwrap_or_else(|_| "../data/test_video.mp4".to_string()),
            source_open_timeout_secs: env_parse("SOURCE_OPEN_TIMEOUT_SECS", 5),
            log_every_frames: env_parse("LOG_EVERY_FRAMES", 30),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.input_size.0 > 0 && self.input_size.1 > 0,
            "Input size must be non-zero, got {}x{}",
            self.input_size.0,
            self.input_size.1
        );
        anyhow::ensure!(
            self.num_classes > 0 && self.num_candidates > 0,
            "Output shape must be non-zero, got {} classes x {} candidates",
            self.num_classes,
            self.num_candidates
        );
        anyhow::ensure!(
            self.pixel_scale > 0.0 && self.channel_std.iter().all(|s| *s != 0.0),
            "Pixel scale and channel std must be non-zero"
        );
        anyhow::ensure!(!self.client_id.is_empty(), "MQTT_CLIENT_ID must not be empty");
        Ok(())
    }

    pub fn bus_options(&self) -> BusOptions {
        BusOptions {
            host: self.broker_host.clone(),
            port: self.broker_port,
            client_id: self.client_id.clone(),
            keep_alive: Duration::from_secs(self.keep_alive_secs),
            clean_session: self.clean_session,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
        }
    }

    pub fn recipe(&self) -> NormalizationRecipe {
        NormalizationRecipe {
            scale: self.pixel_scale,
            swap_channels: self.swap_channels,
            keep_aspect: self.keep_aspect,
            mean: self.channel_mean,
            std: self.channel_std,
        }
    }

    pub fn fallback_source(&self) -> Option<&str> {
        let uri = self.fallback_source_uri.trim();
        (!uri.is_empty()).then_some(uri)
    }

    pub fn source_open_timeout(&self) -> Duration {
        Duration::from_secs(self.source_open_timeout_secs)
    }

    /// Create default configuration for testing
    #[cfg(test)]
    pub fn test_default() -> Self {
        Self {
            environment: Environment::Development,
            otel_endpoint: None,
            broker_host: "127.0.0.1".to_string(),
            broker_port: 1883,
            client_id: "traffic_ai_node".to_string(),
            topic: "traffic/sensor1".to_string(),
            keep_alive_secs: 20,
            clean_session: true,
            connect_timeout_ms: 5000,
            model_path: "/models/model.onnx".to_string(),
            execution_provider: ExecutionProvider::Cpu,
            input_size: (640, 640),
            num_classes: 80,
            num_candidates: 8400,
            confidence_threshold: 0.5,
            iou_threshold: 0.45,
            pixel_scale: 255.0,
            swap_channels: true,
            keep_aspect: false,
            channel_mean: [0.0; 3],
            channel_std: [1.0; 3],
            source_uri: "rtsp://127.0.0.1:8554/live".to_string(),
            fallback_source_uri: "../data/test_video.mp4".to_string(),
            source_open_timeout_secs: 5,
            log_every_frames: 30,
        }
    }
}

/// Three comma-separated floats, e.g. `0.485,0.456,0.406`.
fn env_triplet(key: &str, default: [f32; 3]) -> [f32; 3] {
    env::var(key)
        .ok()
        .and_then(|s| parse_triplet(&s))
        .unwrap_or(default)
}

fn parse_triplet(s: &str) -> Option<[f32; 3]> {
    let values: Vec<f32> = s
        .split(',')
        .map(|part| part.trim().parse().ok())
        .collect::<Option<_>>()?;
    values.try_into().ok()
}
