use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber with human-readable output.
///
/// `RUST_LOG` wins when set. Otherwise `default_level` applies to every
/// hawker crate while the HTTP client stack is capped at `warn`, so
/// dropping a capability crate to `debug` does not drown the cycle log
/// in connection chatter.
///
/// Safe to call repeatedly; only the first call installs a subscriber.
pub fn init_logging(service_name: &str, default_level: &str) {
    fmt()
        .with_env_filter(build_filter(default_level))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .try_init()
        .ok();

    tracing::info!(service = service_name, format = "text", "logging initialised");
}

/// JSON variant for log shippers (Vector, Loki, ELK). Same filter rules
/// as [`init_logging`].
pub fn init_logging_json(service_name: &str, default_level: &str) {
    fmt()
        .json()
        .with_env_filter(build_filter(default_level))
        .with_target(true)
        .with_current_span(false)
        .try_init()
        .ok();

    tracing::info!(service = service_name, format = "json", "logging initialised");
}

/// `RUST_LOG` when present, otherwise the caller's default with hyper
/// and reqwest quieted.
fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_level},hyper=warn,reqwest=warn")))
}
