use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter for the API server when RUST_LOG is unset.
pub const DEFAULT_LOG_SETTINGS: &str = "api_lens=debug,core_lens=debug,tower_http=debug";

/// Installs the global tracing subscriber. The filter comes from RUST_LOG, falling back to `default_log_settings`.
pub fn setup_logging(default_log_settings: &str) {
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_log_settings.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init()
}
