//! # Matching Runtime
//!
//! Runs one exposure matching pass over a JSON input file.
//!
//! ```text
//! matching-runtime <input.json>
//! ```
//!
//! Configuration comes from `EN_*` environment variables (see
//! `MatchingConfig::from_env`). Logs go to stderr; the `TraceReport` is
//! printed to stdout as JSON. Ctrl-C stops the run after the current key.

use std::path::PathBuf;

use anyhow::{Context, Result};
use en_03_exposure_matching::{CancellationToken, MatchingConfig};
use matching_runtime::{init_logging, MatchingRuntime, RunInput};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let input_path: PathBuf = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .context("Usage: matching-runtime <input.json>")?;

    let config = MatchingConfig::from_env();
    config.validate().context("Invalid EN_* configuration")?;
    info!(path = ?config.matching_path, aggregate = config.aggregate_sightings, "Configuration loaded");

    let runtime = MatchingRuntime::new(config)?;
    let input = RunInput::from_path(&input_path)?;
    info!(
        keys = input.diagnosis_keys.len(),
        contact_records = input.contact_records.len(),
        "Input loaded"
    );
    let request = input.into_request(runtime.stores());

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupt received, stopping after the current key");
                on_interrupt.cancel();
            }
            Err(e) => warn!(error = %e, "Cannot listen for Ctrl-C"),
        }
    });

    let report = runtime.run(request, cancel).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialize report")?
    );
    Ok(())
}
