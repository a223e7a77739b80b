use crate::config::SensorConfig;
use common::TelemetryGuard;

pub const SERVICE_NAME: &str = "sensor";

/// Keeps the OTLP exporters alive; drop it last in `main`.
///
/// The guard is declared before the runtime so it flushes while the runtime
/// still exists.
pub struct Observability {
    _telemetry: Option<TelemetryGuard>,
    _runtime: Option<tokio::runtime::Runtime>,
}

/// Install the tracing subscriber, with OTLP export when an endpoint is
/// configured.
///
/// The runtime is only entered to build the exporters; the pipeline itself
/// runs on the calling thread outside of it.
pub fn init_observability(config: &SensorConfig) -> anyhow::Result<Observability> {
    match config.otel_endpoint.as_ref() {
        Some(endpoint) => {
            let runtime = tokio::runtime::Runtime::new()?;
            let guard = runtime.block_on(async {
                TelemetryGuard::init(SERVICE_NAME, endpoint, config.environment.clone())
            })?;
            Ok(Observability {
                _telemetry: Some(guard),
                _runtime: Some(runtime),
            })
        }
        None => {
            common::setup_logging(config.environment.clone());
            Ok(Observability {
                _telemetry: None,
                _runtime: None,
            })
        }
    }
}
