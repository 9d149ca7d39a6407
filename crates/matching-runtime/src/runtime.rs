//! Runs one trace on a blocking worker.

use anyhow::Context;
use en_03_exposure_matching::{
    CancellationToken, ExposureMatchingTracer, InMemoryStores, MatchingConfig, MatchingRequest,
    TraceReport,
};
use std::sync::Arc;
use tracing::info;

pub struct MatchingRuntime {
    stores: InMemoryStores,
    tracer: Arc<ExposureMatchingTracer<InMemoryStores>>,
}

impl MatchingRuntime {
    pub fn new(config: MatchingConfig) -> anyhow::Result<Self> {
        let stores = InMemoryStores::new();
        let tracer = ExposureMatchingTracer::new(stores.clone(), config)
            .context("Failed to create matching tracer")?;
        Ok(Self {
            stores,
            tracer: Arc::new(tracer),
        })
    }

    pub fn stores(&self) -> &InMemoryStores {
        &self.stores
    }

    /// Trace `request`. The matching loop is CPU-bound and synchronous, so it
    /// runs on the blocking pool; `cancel` stops it between keys.
    pub async fn run(
        &self,
        request: MatchingRequest,
        cancel: CancellationToken,
    ) -> anyhow::Result<TraceReport> {
        let tracer = Arc::clone(&self.tracer);
        info!(keys = request.diagnosis_keys.len(), "Starting matching run");
        let report = tokio::task::spawn_blocking(move || tracer.trace_with_token(&request, cancel))
            .await
            .context("Matching worker panicked")?
            .context("Matching run failed")?;
        Ok(report)
    }
}
