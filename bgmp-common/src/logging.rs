//! Tracing subscriber setup shared by both binaries

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Build the filter: `RUST_LOG` wins, otherwise the configured level
/// applied to the BGMP crates only.
pub fn env_filter(logging: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = logging.level.trim();
        if level.contains('=') {
            EnvFilter::new(level)
        } else {
            EnvFilter::new(format!(
                "bgmp_common={level},bgmp_ap={level},bgmp_ui={level}"
            ))
        }
    })
}

/// Install the global subscriber, writing to stderr
///
/// Returns false if a subscriber was already installed.
pub fn init(logging: &LoggingConfig) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(logging))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .is_ok()
}
