//! Global tracing subscriber

use anyhow::{Context, Result};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Parse a `RUST_LOG`-style directive list
pub fn env_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::builder()
        .parse(directives)
        .with_context(|| format!("invalid log filter: {}", directives))
}

/// Install the process-wide subscriber: filter + fmt layer on stderr, plus the
/// `log` bridge for dependencies that still use the `log` crate
pub fn init(directives: &str) -> Result<()> {
    let subscriber = tracing_subscriber::registry().with(env_filter(directives)?).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true),
    );

    tracing::subscriber::set_global_default(subscriber).context("failed to set tracing subscriber")?;

    // Must come after the subscriber is installed
    tracing_log::LogTracer::init().context("failed to initialize log-to-tracing bridge")?;

    Ok(())
}
