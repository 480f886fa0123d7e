use crate::cmd::build_synchronizer;
use anyhow::Result;
use clap::Args;
use codeforces_sync_libs::activity::DEFAULT_INACTIVITY_DAYS;

#[derive(Debug, Args)]
pub struct InactiveArgs {
    handle: String,
    #[arg(long, default_value_t = DEFAULT_INACTIVITY_DAYS, value_parser = clap::value_parser!(i64).range(1..))]
    days: i64,
}

pub async fn run(args: InactiveArgs) -> Result<()> {
    let synchronizer = build_synchronizer().await?;

    let inactive = synchronizer.is_inactive(&args.handle, args.days).await;
    println!("{}", inactive);

    Ok(())
}
