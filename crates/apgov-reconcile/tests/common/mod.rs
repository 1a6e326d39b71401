//! Shared helpers for reconciliation integration tests.

#![allow(dead_code)]

pub mod fixtures;

use std::sync::Arc;
use std::sync::Once;

use apgov_connector::{ClientSettings, InMemoryGovernanceService};
use apgov_core::DataSourceId;
use apgov_reconcile::{AccessProviderOrchestrator, HasAccessProviderFields, ReconcileConfig};

static INIT: Once = Once::new();

/// Initialize logging for tests (once). Set `RUST_LOG` to see output.
pub fn init_test_logging() {
    INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

/// An in-memory remote wired to the engine.
pub struct TestContext {
    pub service: Arc<InMemoryGovernanceService>,
    pub config: ReconcileConfig,
    pub data_source: DataSourceId,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(ReconcileConfig::default())
    }

    /// Small pages, so listings span several fetches.
    pub fn with_config(config: ReconcileConfig) -> Self {
        init_test_logging();
        let settings = ClientSettings::new().with_page_size(2);
        Self {
            service: Arc::new(InMemoryGovernanceService::with_settings(settings)),
            config,
            data_source: DataSourceId::new("ds-snowflake"),
        }
    }

    pub fn orchestrator<S: HasAccessProviderFields>(
        &self,
    ) -> AccessProviderOrchestrator<InMemoryGovernanceService, S> {
        AccessProviderOrchestrator::new(self.service.clone(), self.config.clone())
    }

    pub async fn mutation_count(&self) -> usize {
        self.service.mutation_count().await
    }
}
