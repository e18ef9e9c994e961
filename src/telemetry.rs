//! Tracing subscriber setup for binaries and integration harnesses.

use crate::error::{BoardError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FORMAT_VAR: &str = "PULSEBOARD_LOG_FORMAT";

/// Installs the global subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over `default_filter`. Set
/// `PULSEBOARD_LOG_FORMAT=json` for one JSON object per event.
pub fn init_tracing(default_filter: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let json = std::env::var(LOG_FORMAT_VAR)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    installed.map_err(|e| BoardError::Config(format!("failed to install tracing subscriber: {e}")))
}
