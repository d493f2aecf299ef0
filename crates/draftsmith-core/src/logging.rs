//! Tracing subscriber setup.

use crate::settings::LoggingSettings;

/// Install a global fmt subscriber. `RUST_LOG` overrides the configured level.
/// Calling it twice is harmless; the first subscriber stays.
pub fn init_logging(settings: &LoggingSettings) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

/// Initialize logging with default settings (tests and quick scripts).
pub fn init_default_logging() {
    init_logging(&LoggingSettings::default());
}
