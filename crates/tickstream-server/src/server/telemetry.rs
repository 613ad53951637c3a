//! # Telemetry
//!
//! Structured logging is always on: every event goes through
//! `tracing_subscriber::fmt` and is filtered by `RUST_LOG` (default `info`).
//! On top of that, OpenTelemetry export can be switched on per feature.
//!
//! ## Feature matrix
//!
//! - `otel`: exports spans through `tracing-opentelemetry`.
//! - `metrics`: exports counters and histograms (requests, open streams,
//!   refused streams, closed streams by reason, emitted items, stream
//!   duration).
//! - `stdout`: prints both to stdout via `opentelemetry-stdout`.
//!
//! ## Feature constraints
//!
//! - `stdout` requires at least one of `otel` or `metrics`.
//!
//! ## Example usage
//!
//! ```bash
//! cargo run -p tickstream-server --features otel,metrics,stdout
//! ```

// Disallow using `stdout` without `otel` or `metrics`
#[cfg(all(feature = "stdout", not(any(feature = "otel", feature = "metrics"))))]
compile_error!("The 'stdout' feature requires at least one of 'otel' or 'metrics' to be enabled.");

use tracing_subscriber::{
    EnvFilter, Layer, fmt::MakeWriter, layer::SubscriberExt, registry::LookupSpan,
    util::SubscriberInitExt,
};

#[cfg(feature = "metrics")]
use opentelemetry::metrics::{Counter, Histogram, Meter, UpDownCounter};
#[cfg(feature = "metrics")]
use opentelemetry_sdk::metrics as sdkmetrics;
#[cfg(feature = "metrics")]
use std::sync::OnceLock;

#[cfg(any(feature = "metrics", feature = "otel"))]
use opentelemetry::{InstrumentationScope, KeyValue};
#[cfg(any(feature = "metrics", feature = "otel"))]
use opentelemetry_sdk::Resource;
#[cfg(any(feature = "metrics", feature = "otel"))]
use opentelemetry_semantic_conventions as semvcns;

#[cfg(feature = "otel")]
use opentelemetry::trace::TracerProvider;
#[cfg(feature = "otel")]
use opentelemetry_sdk::propagation::TraceContextPropagator;
#[cfg(feature = "otel")]
use opentelemetry_sdk::trace as sdktrace;

const SERVICE_NAME: &str = "tickstream";

#[cfg(feature = "stdout")]
const EXPORT_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5);

/// Exporter handles that must be flushed before the process exits.
pub struct TelemetryProviders {
    #[cfg(feature = "otel")]
    tracer_provider: sdktrace::SdkTracerProvider,
    #[cfg(feature = "metrics")]
    meter_provider: sdkmetrics::SdkMeterProvider,
}

impl TelemetryProviders {
    /// Flushes and shuts down every enabled exporter.
    ///
    /// The subscriber may already be torn down here, so failures go to stderr.
    pub fn shutdown(self) {
        #[cfg(feature = "otel")]
        {
            report("flush traces", self.tracer_provider.force_flush());
            report("shut down tracer", self.tracer_provider.shutdown());
        }

        #[cfg(feature = "metrics")]
        {
            report("flush metrics", self.meter_provider.force_flush());
            report("shut down meter", self.meter_provider.shutdown());
        }
    }
}

#[cfg(any(feature = "metrics", feature = "otel"))]
fn report<E: core::fmt::Debug>(action: &str, result: Result<(), E>) {
    if let Err(err) = result {
        eprintln!("Failed to {action}: {err:#?}");
    }
}

/// Installs the global subscriber and any enabled exporters.
///
/// # Errors
///
/// Fails if a global subscriber is already set.
pub fn init_telemetry() -> anyhow::Result<TelemetryProviders> {
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(console_layer(std::io::stderr));

    #[cfg(any(feature = "metrics", feature = "otel"))]
    let scope = InstrumentationScope::builder(SERVICE_NAME)
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_schema_url(semvcns::SCHEMA_URL)
        .build();

    #[cfg(feature = "otel")]
    let tracer_provider = tracer_provider();
    #[cfg(feature = "otel")]
    let registry = {
        opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());
        opentelemetry::global::set_tracer_provider(tracer_provider.clone());
        registry.with(
            tracing_opentelemetry::layer()
                .with_tracer(tracer_provider.tracer_with_scope(scope.clone()))
                .with_error_records_to_exceptions(true),
        )
    };

    #[cfg(feature = "metrics")]
    let meter_provider = meter_provider();
    #[cfg(feature = "metrics")]
    let registry = {
        opentelemetry::global::set_meter_provider(meter_provider.clone());
        let _ = METRICS.set(Metrics::new(&opentelemetry::global::meter_with_scope(scope)));
        registry.with(tracing_opentelemetry::MetricsLayer::new(meter_provider.clone()))
    };

    registry.try_init()?;

    Ok(TelemetryProviders {
        #[cfg(feature = "otel")]
        tracer_provider,
        #[cfg(feature = "metrics")]
        meter_provider,
    })
}

/// Human-readable console output, independent of the OpenTelemetry stdout
/// exporter. The server passes stderr so stdout stays free for the exporter.
fn console_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_thread_ids(true)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(writer)
        .pretty()
}

#[cfg(any(feature = "metrics", feature = "otel"))]
fn resource() -> Resource {
    let version = KeyValue::new(semvcns::resource::SERVICE_VERSION, env!("CARGO_PKG_VERSION"));
    Resource::builder()
        .with_service_name(SERVICE_NAME)
        .with_schema_url([version], semvcns::SCHEMA_URL)
        .build()
}

#[cfg(feature = "metrics")]
fn meter_provider() -> sdkmetrics::SdkMeterProvider {
    let builder = sdkmetrics::SdkMeterProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = builder.with_reader(
        sdkmetrics::PeriodicReader::builder(opentelemetry_stdout::MetricExporter::default())
            .with_interval(EXPORT_INTERVAL)
            .build(),
    );

    builder.build()
}

#[cfg(feature = "otel")]
fn tracer_provider() -> sdktrace::SdkTracerProvider {
    let builder = sdktrace::SdkTracerProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = {
        let config = sdktrace::BatchConfigBuilder::default()
            .with_scheduled_delay(EXPORT_INTERVAL)
            .with_max_queue_size(2048)
            .build();
        builder.with_span_processor(
            sdktrace::BatchSpanProcessor::builder(opentelemetry_stdout::SpanExporter::default())
                .with_batch_config(config)
                .build(),
        )
    };

    builder.build()
}

/// Instruments registered once the meter provider is up.
#[cfg(feature = "metrics")]
struct Metrics {
    requests: Counter<u64>,
    streams_inflight: UpDownCounter<i64>,
    streams_refused: Counter<u64>,
    streams_closed: Counter<u64>,
    stream_duration_ms: Histogram<f64>,
    items_emitted: Counter<u64>,
}

#[cfg(feature = "metrics")]
static METRICS: OnceLock<Metrics> = OnceLock::new();

#[cfg(feature = "metrics")]
impl Metrics {
    fn new(meter: &Meter) -> Self {
        Self {
            requests: meter
                .u64_counter("requests")
                .with_description("Requests per route")
                .build(),
            streams_inflight: meter
                .i64_up_down_counter("streams_inflight")
                .with_description("Open sequence streams")
                .build(),
            streams_refused: meter
                .u64_counter("streams_refused")
                .with_description("Streams refused while full or shutting down")
                .build(),
            streams_closed: meter
                .u64_counter("streams_closed")
                .with_description("Released streams, by reason")
                .build(),
            stream_duration_ms: meter
                .f64_histogram("stream_duration")
                .with_unit("ms")
                .with_description("Time from opening a stream to releasing it")
                .build(),
            items_emitted: meter
                .u64_counter("items_emitted")
                .with_description("Sequence items written to streams")
                .build(),
        }
    }
}

#[cfg(feature = "metrics")]
fn with_metrics(record: impl FnOnce(&Metrics)) {
    if let Some(metrics) = METRICS.get() {
        record(metrics);
    }
}

// The recorders below compile to empty functions without `metrics`.

pub fn increment_requests(_route: &'static str) {
    #[cfg(feature = "metrics")]
    with_metrics(|m| m.requests.add(1, &[KeyValue::new("route", _route)]));
}

pub fn increment_streams_inflight() {
    #[cfg(feature = "metrics")]
    with_metrics(|m| m.streams_inflight.add(1, &[]));
}

pub fn decrement_streams_inflight() {
    #[cfg(feature = "metrics")]
    with_metrics(|m| m.streams_inflight.add(-1, &[]));
}

pub fn increment_streams_refused() {
    #[cfg(feature = "metrics")]
    with_metrics(|m| m.streams_refused.add(1, &[]));
}

pub fn record_stream_closed(_reason: &'static str) {
    #[cfg(feature = "metrics")]
    with_metrics(|m| m.streams_closed.add(1, &[KeyValue::new("reason", _reason)]));
}

pub fn record_stream_duration(_duration_ms: f64) {
    #[cfg(feature = "metrics")]
    with_metrics(|m| m.stream_duration_ms.record(_duration_ms, &[]));
}

pub fn increment_items_emitted() {
    #[cfg(feature = "metrics")]
    with_metrics(|m| m.items_emitted.add(1, &[]));
}
