use crate::cmd::build_synchronizer;
use anyhow::{Context, Result};
use clap::Args;

#[derive(Debug, Args)]
pub struct RemoveArgs {
    handle: String,
}

pub async fn run(args: RemoveArgs) -> Result<()> {
    let synchronizer = build_synchronizer().await?;

    synchronizer.remove(&args.handle).await.with_context(|| {
        let message = format!("Failed to remove user {}.", args.handle);
        tracing::error!("{}", message);
        message
    })?;

    Ok(())
}
