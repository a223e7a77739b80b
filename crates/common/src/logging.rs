use crate::config::Environment;
use opentelemetry::global::BoxedTracer;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{Registry, layer::SubscriberExt, util::SubscriberInitExt};

pub(crate) type OtelLayer = OpenTelemetryLayer<Registry, BoxedTracer>;

/// Initialize the tracing subscriber: pretty output in development, JSON in
/// production.
///
/// Uses RUST_LOG for filtering (defaults to "info" if not set).
pub fn setup_logging(environment: Environment) {
    install(environment, None);
}

/// Shared by [`setup_logging`] and [`crate::TelemetryGuard::init`], which
/// passes the layer bridging spans to the OTLP tracer.
pub(crate) fn install(environment: Environment, otel_layer: Option<OtelLayer>) {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let registry = tracing_subscriber::registry()
        .with(otel_layer)
        .with(env_filter);

    match environment {
        Environment::Production => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_level(true))
                .init();
        }
        Environment::Development => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_ansi(true))
                .init();
        }
    }
}
