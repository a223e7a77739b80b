use sensor::{
    DetectionService, SensorConfig, bus::MqttBus, logging::init_observability,
    source::FfmpegSource,
};
use signal_hook::consts::{SIGINT, SIGTERM};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

#[cfg(feature = "ort-backend")]
use sensor::backend::ort::OrtBackend as Backend;

#[cfg(not(feature = "ort-backend"))]
compile_error!("At least one backend feature must be enabled: 'ort-backend'");

fn main() -> anyhow::Result<()> {
    let config = SensorConfig::from_env()?;

    let _observability = init_observability(&config)?;

    tracing::info!(config = ?config, "Loaded configuration");

    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGTERM, Arc::clone(&shutdown))?;
    signal_hook::flag::register(SIGINT, Arc::clone(&shutdown))?;

    let source = FfmpegSource::new(config.source_open_timeout());
    let service = DetectionService::<Backend, _, _>::new(config, source, MqttBus::new());

    let summary = service.run(&shutdown)?;

    tracing::info!(
        source = %summary.source_uri,
        frames = summary.frames_processed,
        detections = summary.detections,
        events = summary.events_published,
        "Sensor stopped"
    );
    Ok(())
}
