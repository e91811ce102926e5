use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

/// Swaps the active filter once the configured level is known
pub type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// `RUST_LOG` when set, otherwise `info` until config is loaded
pub fn startup_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn subscriber<W>(writer: W, filter: EnvFilter) -> (impl Subscriber + Send + Sync + 'static, FilterHandle)
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let (filter, handle) = reload::Layer::new(filter);
    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_target(false)
            .with_ansi(false)
            .with_writer(writer),
    );
    (subscriber, handle)
}

/// Install the global subscriber writing to stderr. Call before loading config.
pub fn init() -> FilterHandle {
    let (subscriber, handle) = subscriber(std::io::stderr, startup_filter());
    subscriber.init();
    handle
}

/// Switch to `level`; an unparsable level keeps the current filter
pub fn apply_level(handle: &FilterHandle, level: &str) {
    match EnvFilter::try_new(level) {
        Ok(filter) => {
            if let Err(e) = handle.reload(filter) {
                tracing::warn!("Could not apply log level {}: {}", level, e);
            }
        }
        Err(e) => tracing::warn!("Invalid log level {:?}: {} - keeping current", level, e),
    }
}
