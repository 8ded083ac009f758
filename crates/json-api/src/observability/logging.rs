//! Logging subscriber initialisation.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider};
use tracing_subscriber::{
    EnvFilter, Registry,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{
    ServerConfig,
    observability::{LogFormat, LoggingConfig},
};

use super::ObservabilityError;

/// Dependencies that are chatty at `info` and below.
const QUIET_TARGETS: &str = "h2=warn,hyper=warn,tonic=warn,opentelemetry=warn,sqlx=warn,reqwest=warn";

pub(super) fn init_subscriber(
    config: &ServerConfig,
    tracer_provider: Option<&SdkTracerProvider>,
) -> Result<(), ObservabilityError> {
    let service_name = config.observability.otel_service_name.clone();

    match config.logging.log_format {
        LogFormat::Compact => install(
            &config.logging,
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
            tracer_provider.map(|provider| provider.tracer(service_name)),
        ),
        LogFormat::Json => install(
            &config.logging,
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_target(true),
            tracer_provider.map(|provider| provider.tracer(service_name)),
        ),
    }
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},{QUIET_TARGETS}", config.log_level)))
}

fn install<L>(
    config: &LoggingConfig,
    fmt_layer: L,
    tracer: Option<SdkTracer>,
) -> Result<(), ObservabilityError>
where
    L: Layer<Registry> + Send + Sync + 'static,
{
    let subscriber = tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter(config));

    match tracer {
        Some(tracer) => subscriber
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .try_init()?,
        None => subscriber.try_init()?,
    }

    Ok(())
}
