use crate::cmd::build_synchronizer;
use anyhow::{Context, Result};
use clap::Args;

#[derive(Debug, Args)]
pub struct OnboardArgs {
    handle: String,
    /// Address inactivity notices are sent to
    #[arg(long)]
    email: Option<String>,
}

pub async fn run(args: OnboardArgs) -> Result<()> {
    let synchronizer = build_synchronizer().await?;

    let report = synchronizer
        .onboard(&args.handle, args.email.as_deref())
        .await
        .with_context(|| {
            let message = format!("Failed to add user {}.", args.handle);
            tracing::error!("{}", message);
            message
        })?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
