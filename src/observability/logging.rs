//! # Logging
//!
//! Tracing subscriber setup driven by [`ReconcilerConfig`](crate::config::ReconcilerConfig).

use crate::config::ReconcilerConfig;
use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Build the env filter: `RUST_LOG` wins, then the configured level for this crate
pub fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "code_repository_reconciler={level},codereposctl={level},warn",
            level = log_level.to_lowercase()
        ))
    })
}

/// Install the global tracing subscriber
///
/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init_logging(config: &ReconcilerConfig) -> Result<()> {
    let filter = build_filter(&config.log_level);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = if config.log_format.eq_ignore_ascii_case("json") {
        builder.json().try_init()
    } else {
        builder.with_target(false).try_init()
    };

    result.map_err(|e| anyhow!("Failed to initialize logging: {e}"))
}
