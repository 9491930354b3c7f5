use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

pub const LOG_ENV: &str = "USP_CONSOLE_LOG";
const DEFAULT_FILTER: &str = "warn";

/// Pick the log filter: an explicit level first, then `RUST_LOG`, then `warn`.
///
/// Unparseable values fall through to the next source.
#[must_use]
pub fn resolve_filter(level: Option<&str>) -> EnvFilter {
    if let Some(filter) = level.and_then(|level| EnvFilter::try_new(level).ok()) {
        return filter;
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the stderr subscriber. Stdout is reserved for the event report.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init(level: Option<&str>) {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    let _ = tracing_subscriber::registry()
        .with(resolve_filter(level))
        .with(layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_level_wins() {
        assert_eq!(resolve_filter(Some("debug")).to_string(), "debug");
    }
}
