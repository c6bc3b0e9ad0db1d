//! Process-wide tracing setup for the operator binary.
//!
//! - `RUST_LOG` filters events (default `info`).
//! - `CHIA_OPERATOR_LOG_FORMAT=json` switches console output to JSON lines.
//! - `CHIA_OPERATOR_LOG_DIR` adds a rolling file copy of every event;
//!   `CHIA_OPERATOR_LOG_ROTATION` picks `hourly`, `minutely` or `daily`.
//! - With the `otlp` feature and `CHIA_OPERATOR_OTEL=1`, spans are exported
//!   to `CHIA_OPERATOR_OTEL_ENDPOINT` (default `http://127.0.0.1:4317`).

use once_cell::sync::OnceCell;
use tracing::Subscriber;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

#[cfg(feature = "otlp")]
static TRACER_PROVIDER: OnceCell<opentelemetry_sdk::trace::SdkTracerProvider> = OnceCell::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "json" => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }

    fn from_env() -> Self {
        Self::parse(std::env::var("CHIA_OPERATOR_LOG_FORMAT").ok().as_deref())
    }
}

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer(LogFormat::from_env()))
        .with(file_layer());

    #[cfg(feature = "otlp")]
    let registry = registry.with(otlp_layer());

    let _ = registry.try_init();

    #[cfg(feature = "otlp")]
    {
        if let Some(endpoint) = otlp_endpoint().filter(|_| TRACER_PROVIDER.get().is_some()) {
            tracing::info!(endpoint, "OTLP tracing exporter initialised");
        }
    }
}

fn console_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    match format {
        LogFormat::Json => fmt::layer().json().with_current_span(true).boxed(),
        LogFormat::Text => fmt::layer().boxed(),
    }
}

fn file_layer<S>() -> Option<Box<dyn Layer<S> + Send + Sync>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let dir = std::env::var("CHIA_OPERATOR_LOG_DIR").ok()?;
    let prefix =
        std::env::var("CHIA_OPERATOR_LOG_PREFIX").unwrap_or_else(|_| "chia-operator".into());
    let rotation = std::env::var("CHIA_OPERATOR_LOG_ROTATION").unwrap_or_else(|_| "daily".into());
    if let Err(err) = std::fs::create_dir_all(&dir) {
        eprintln!("failed to create log directory {dir}: {err}");
        return None;
    }
    let writer = match rotation.to_lowercase().as_str() {
        "hourly" => tracing_appender::rolling::hourly(&dir, &prefix),
        "minutely" => tracing_appender::rolling::minutely(&dir, &prefix),
        _ => tracing_appender::rolling::daily(&dir, &prefix),
    };
    let (nb, guard) = tracing_appender::non_blocking(writer);
    let _ = FILE_GUARD.set(guard);
    Some(fmt::layer().with_ansi(false).with_writer(nb).boxed())
}

#[cfg(feature = "otlp")]
fn otlp_endpoint() -> Option<String> {
    if std::env::var("CHIA_OPERATOR_OTEL").as_deref() != Ok("1") {
        return None;
    }
    Some(
        std::env::var("CHIA_OPERATOR_OTEL_ENDPOINT")
            .unwrap_or_else(|_| "http://127.0.0.1:4317".to_string()),
    )
}

/// Span export layer; `None` when disabled or the exporter cannot be built.
#[cfg(feature = "otlp")]
fn otlp_layer<S>() -> Option<Box<dyn Layer<S> + Send + Sync>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    use opentelemetry::trace::TracerProvider as _;

    let endpoint = otlp_endpoint()?;
    match build_provider(endpoint) {
        Ok(provider) => {
            let tracer = provider.tracer("chia-operator");
            opentelemetry::global::set_tracer_provider(provider.clone());
            let _ = TRACER_PROVIDER.set(provider);
            Some(tracing_opentelemetry::layer().with_tracer(tracer).boxed())
        }
        Err(err) => {
            eprintln!("failed to initialise OTLP exporter ({err}); falling back to console tracing");
            None
        }
    }
}

#[cfg(feature = "otlp")]
fn build_provider(
    endpoint: String,
) -> Result<opentelemetry_sdk::trace::SdkTracerProvider, Box<dyn std::error::Error + Send + Sync>> {
    use opentelemetry_otlp::{WithExportConfig, WithTonicConfig as _};
    use opentelemetry_sdk::trace::SdkTracerProvider;
    use opentelemetry_sdk::Resource;
    use std::time::Duration;

    let mut builder = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint);
    if let Some(timeout_ms) = std::env::var("CHIA_OPERATOR_OTEL_TIMEOUT_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
    {
        builder = builder.with_timeout(Duration::from_millis(timeout_ms));
    }
    let exporter = builder.build()?;

    let service_name =
        std::env::var("CHIA_OPERATOR_OTEL_SERVICE_NAME").unwrap_or_else(|_| "chia-operator".into());
    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(Resource::builder().with_service_name(service_name).build())
        .build())
}

/// Flush exporters before the process exits.
pub fn shutdown() {
    #[cfg(feature = "otlp")]
    {
        if let Some(provider) = TRACER_PROVIDER.get() {
            if let Err(err) = provider.shutdown() {
                eprintln!("failed to flush OTLP spans: {err}");
            }
        }
    }
}
