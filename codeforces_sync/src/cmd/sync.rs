use crate::cmd::build_synchronizer;
use anyhow::{Context, Result};
use clap::Args;
use tokio::{signal, sync::watch};

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Exit with a failure status when any user failed to sync
    #[arg(long)]
    strict: bool,
}

pub async fn run(args: SyncArgs) -> Result<()> {
    let synchronizer = build_synchronizer().await?;

    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing the user in progress.");
            tx.send(true).ok();
        }
    });

    let report = synchronizer.sync_all_until(rx).await.with_context(|| {
        let message = "Failed to sync all users.";
        tracing::error!(message);
        message
    })?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if args.strict && report.failed > 0 {
        anyhow::bail!("{} users failed to sync", report.failed);
    }
    Ok(())
}
