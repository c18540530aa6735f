//! Process-wide tracing/OpenTelemetry bootstrap.
//!
//! Every request suspends on Redis, the origin, and the client socket —
//! distributed tracing is how a slow request gets diagnosed without
//! reproducing it locally. `OTEL_EXPORTER_OTLP_ENDPOINT` gates whether spans
//! actually leave the process; unset, this is plain structured JSON logging.

use anyhow::{Context, Result};
use opentelemetry::global;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{Config, Sampler};
use opentelemetry_sdk::{runtime, Resource};
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use std::time::Duration;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Dropping this un-installs the global tracer provider and flushes any
/// pending spans. Hold it for the lifetime of `main`.
pub struct TracingGuard;

impl Drop for TracingGuard {
    fn drop(&mut self) {
        global::shutdown_tracer_provider();
    }
}

/// Installs a JSON `tracing_subscriber` as the global default, with an
/// OpenTelemetry OTLP layer when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
pub fn init_tracing(service_name: &str) -> Result<TracingGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .json();

    let subscriber = Registry::default().with(env_filter).with(fmt_layer);

    if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        global::set_text_map_propagator(TraceContextPropagator::new());
        let tracer = init_otlp_tracer(service_name)?;
        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
        tracing::subscriber::set_global_default(subscriber.with(otel_layer))
            .context("failed to install tracing subscriber")?;
    } else {
        tracing::subscriber::set_global_default(subscriber)
            .context("failed to install tracing subscriber")?;
    }

    Ok(TracingGuard)
}

fn init_otlp_tracer(service_name: &str) -> Result<opentelemetry_sdk::trace::Tracer> {
    use opentelemetry::trace::TracerProvider;

    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4317".to_string());

    let resource = Resource::new(vec![
        KeyValue::new(SERVICE_NAME, service_name.to_string()),
        KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
    ]);

    let sample_rate: f64 = std::env::var("OTEL_TRACE_SAMPLE_RATE")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0.1);

    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint)
        .with_timeout(Duration::from_secs(3));

    let provider = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(
            Config::default()
                .with_resource(resource)
                .with_sampler(Sampler::TraceIdRatioBased(sample_rate)),
        )
        .install_batch(runtime::Tokio)
        .context("failed to install OTLP tracer pipeline")?;

    Ok(provider.tracer(service_name.to_string()))
}
