use crate::cmd::build_synchronizer;
use anyhow::{Context, Result};
use clap::Args;

#[derive(Debug, Args)]
pub struct RefreshArgs {
    handle: String,
    /// Replaces the stored address
    #[arg(long)]
    email: Option<String>,
    /// Moves the tracked user to this handle and refetches its history
    #[arg(long)]
    new_handle: Option<String>,
}

pub async fn run(args: RefreshArgs) -> Result<()> {
    let synchronizer = build_synchronizer().await?;

    let result = match args.new_handle.as_deref() {
        Some(new_handle) => {
            synchronizer
                .rename(&args.handle, new_handle, args.email.as_deref())
                .await
        }
        None => synchronizer.refresh(&args.handle, args.email.as_deref()).await,
    };
    let report = result.with_context(|| {
        let message = format!("Failed to sync user {}.", args.handle);
        tracing::error!("{}", message);
        message
    })?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
