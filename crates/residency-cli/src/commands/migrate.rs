//! `residency migrate` - apply the embedded schema.

use anyhow::Context;
use residency_adapter_pg::{PgStore, migrate};
use residency_core::ResidencyConfig;

pub async fn run(config: &ResidencyConfig, status_only: bool) -> anyhow::Result<()> {
    let pg = PgStore::connect(&config.database)
        .await
        .context("connecting to postgres")?;
    let before = migrate::current_version(pg.pool()).await?;

    if status_only {
        println!("Schema version: {before}");
        return Ok(());
    }

    pg.migrate().await.context("applying migrations")?;
    let after = migrate::current_version(pg.pool()).await?;
    if after == before {
        println!("✔ Schema is up to date (version {after})");
    } else {
        println!("✔ Migrated schema from version {before} to {after}");
    }
    Ok(())
}
