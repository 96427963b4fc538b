//! Logging and Tracing
//! 
//! Console logging through `tracing-subscriber`, optionally bridged to an OTLP
//! collector via OpenTelemetry.

use anyhow::Result;
use opentelemetry::trace::TracerProvider; // Import trait for .tracer()
use opentelemetry::{global, KeyValue};
use opentelemetry_sdk::{propagation::TraceContextPropagator, runtime, trace as sdktrace, Resource};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Flushes exported spans when dropped.
pub struct TelemetryGuard {
    otlp: bool,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if self.otlp {
            global::shutdown_tracer_provider();
        }
    }
}

fn filter(service_name: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("{}=info", service_name)))
}

pub fn init_telemetry(service_name: &str, otlp: bool) -> Result<TelemetryGuard> {
    if !otlp {
        Registry::default()
            .with(filter(service_name))
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()?;
        return Ok(TelemetryGuard { otlp });
    }

    global::set_text_map_propagator(TraceContextPropagator::new());

    let exporter = opentelemetry_otlp::new_exporter().tonic().build_span_exporter()?;

    let trace_config = sdktrace::Config::default().with_resource(Resource::new(vec![
        KeyValue::new("service.name", service_name.to_string()),
    ]));

    let provider = sdktrace::TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_config(trace_config)
        .build();

    global::set_tracer_provider(provider.clone());
    let tracer = provider.tracer(service_name.to_string());

    Registry::default()
        .with(filter(service_name))
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()?;

    Ok(TelemetryGuard { otlp })
}
