use opentelemetry::trace::TracerProvider as _;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn,reqwest=warn";

/// Installs the global subscriber.
///
/// `RUST_LOG` overrides the default filter. With `OTEL_STDOUT=true` the
/// spans are additionally exported through opentelemetry's stdout exporter.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let otel_layer = if otel_stdout() {
        let provider = opentelemetry_sdk::trace::TracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer(env!("CARGO_PKG_NAME"));
        opentelemetry::global::set_tracer_provider(provider);
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(cfg!(debug_assertions)))
        .with(otel_layer)
        .init();
}

/// Flushes pending spans
pub fn shutdown() {
    opentelemetry::global::shutdown_tracer_provider();
}

fn otel_stdout() -> bool {
    std::env::var("OTEL_STDOUT")
        .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
        .unwrap_or(false)
}
