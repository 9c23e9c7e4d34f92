use tracing::Subscriber;
use tracing_subscriber::EnvFilter;

/// Builds the applet's log subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `level` is used as the filter directive.
///
/// ### Arguments
/// - `level` - fallback filter directive, e.g. `info` or `protontray=debug`
pub fn log_subscriber(level: &str) -> impl Subscriber + Send + Sync {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .finish()
}
