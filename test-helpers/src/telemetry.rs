use tracing::Subscriber;
use tracing::subscriber::set_global_default;
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

/// Log an error with its whole chain.
pub fn log_error(e: impl Into<anyhow::Error>) {
    let e: anyhow::Error = e.into();
    tracing::error!("{e:#}");
}

/// Pretty stderr logging. `RUST_LOG` takes precedence over
/// `default_filter`, so `RUST_LOG=payloads=debug cargo test` shows every
/// request the client sends.
pub fn get_subscriber(default_filter: &str) -> impl Subscriber + Sync + Send {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    let stderr = fmt::Layer::new()
        .with_writer(std::io::stderr)
        .with_target(true)
        .pretty();
    Registry::default().with(env_filter).with(stderr)
}

/// Install the subscriber and bridge `log` records into it.
///
/// Every test spawns its own backend, so only the first call wins; the
/// return value says whether this call installed the subscriber.
pub fn init_subscriber(subscriber: impl Subscriber + Sync + Send) -> bool {
    let _ = LogTracer::init();
    set_global_default(subscriber).is_ok()
}
