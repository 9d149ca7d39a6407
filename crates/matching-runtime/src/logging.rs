//! Subscriber setup.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_LOG_LEVEL: &str = "info";

/// Filter directive: `EN_LOG_LEVEL`, else `RUST_LOG`, else `info`.
pub fn filter_directive(lookup: impl Fn(&str) -> Option<String>) -> String {
    lookup("EN_LOG_LEVEL")
        .or_else(|| lookup("RUST_LOG"))
        .filter(|directive| !directive.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

/// Install the global fmt subscriber. Logs go to stderr so stdout carries
/// only the report.
pub fn init_logging() -> anyhow::Result<()> {
    let directive = filter_directive(|name| std::env::var(name).ok());
    let filter = EnvFilter::try_new(&directive).or_else(|_| EnvFilter::try_new(DEFAULT_LOG_LEVEL))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_writer(std::io::stderr),
        )
        .try_init()?;
    Ok(())
}
