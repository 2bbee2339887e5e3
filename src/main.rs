//! Optimization service binary.

use std::sync::Arc;

use anyhow::Context;
use regatta_scheduler::builders::build_coordinator;
use regatta_scheduler::config::ServiceConfig;
use regatta_scheduler::core::AppResult;
use regatta_scheduler::infra::InMemoryTournamentStore;
use regatta_scheduler::runtime::serve;
use regatta_scheduler::util::init_tracing;
use tracing::info;

#[tokio::main]
async fn main() -> AppResult<()> {
    let config = ServiceConfig::from_env().map_err(anyhow::Error::msg).context("loading service configuration")?;
    init_tracing();
    info!(
        bind_addr = %config.bind_addr,
        progress_buffer = config.progress_buffer,
        settings_file = ?config.settings_file,
        "starting regatta scheduler"
    );

    let store = Arc::new(InMemoryTournamentStore::new());
    let coordinator = build_coordinator(&config, store).context("building coordinator")?;
    serve(coordinator, &config.bind_addr).await
}
