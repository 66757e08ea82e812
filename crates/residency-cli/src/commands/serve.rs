//! `residency serve` - start the HTTP API.

use anyhow::Context;
use residency_adapter_pg::PgStore;
use residency_core::ResidencyConfig;
use residency_runtime::Store;
use residency_server::{ApiServer, AppState};
use tracing::{info, warn};

pub async fn run(config: ResidencyConfig, memory: bool) -> anyhow::Result<()> {
    config.validate()?;

    let store = if memory {
        warn!("using the in-memory store; data is lost on exit");
        Store::in_memory()
    } else {
        let pg = PgStore::connect(&config.database)
            .await
            .context("connecting to postgres")?;
        if config.database.run_migrations {
            pg.migrate().await.context("applying migrations")?;
        } else {
            info!("skipping migrations (database.run_migrations is off)");
        }
        pg.into_store()
    };

    let state = AppState::from_config(&config, store)?;
    ApiServer::new(state).run().await?;
    Ok(())
}
