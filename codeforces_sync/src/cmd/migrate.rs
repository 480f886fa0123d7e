use crate::cmd::connect_store;
use anyhow::Result;
use clap::Args;

#[derive(Debug, Args)]
pub struct MigrateArgs {}

pub async fn run(_args: MigrateArgs) -> Result<()> {
    // マイグレーションは接続時に実行される
    connect_store().await?;
    tracing::info!("Database schema is up to date.");

    Ok(())
}
