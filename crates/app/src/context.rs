//! Application context - dependency injection container

use std::future::Future;
use std::sync::Arc;

use kiddo_core::{
    HeuristicAnalyzer, Orchestrator, OrchestratorConfig, PipelineMetricsSnapshot, ProcessingEngine,
};
use kiddo_domain::{Config, Result};
use kiddo_infra::build_components;
use tracing::{info, warn};

/// Application context - holds the configured pipeline
pub struct AppContext {
    pub config: Config,
    pub orchestrator: Orchestrator,
}

impl AppContext {
    /// Build every component named in `config`
    ///
    /// # Errors
    /// Returns an error if the configuration names an invalid queue or two
    /// connectors share a `source_id`.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let components = build_components(&config)?;

        let engine = ProcessingEngine::new(Arc::new(HeuristicAnalyzer::new()));
        let orchestrator = Orchestrator::new(
            components.connectors,
            components.queue,
            Arc::new(engine),
            components.fanout,
            OrchestratorConfig::from(&config.pipeline),
        )?
        .with_dead_letter_sink(components.dead_letters);

        Ok(Self { config, orchestrator })
    }

    /// Run the pipeline until `shutdown` resolves, then stop it.
    ///
    /// Returns the final pipeline metrics.
    ///
    /// # Errors
    /// Returns an error if the orchestrator is already running.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<PipelineMetricsSnapshot>
    where
        F: Future<Output = ()>,
    {
        self.orchestrator.start().await?;
        info!(
            sources = ?self.orchestrator.registry().source_ids(),
            "Kiddo pipeline running"
        );

        shutdown.await;
        info!("Shutdown requested");

        if let Err(e) = self.orchestrator.stop().await {
            warn!(error = %e, "Pipeline did not stop cleanly");
        }

        let metrics = self.orchestrator.metrics();
        info!("{}", metrics.summary());
        info!("{}", self.orchestrator.queue_metrics().summary());
        Ok(metrics)
    }
}
