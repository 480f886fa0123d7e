mod cmd;

use crate::cmd::{
    inactive::{self, InactiveArgs},
    migrate::{self, MigrateArgs},
    onboard::{self, OnboardArgs},
    refresh::{self, RefreshArgs},
    remove::{self, RemoveArgs},
    sync::{self, SyncArgs},
};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::{env, str::FromStr};
use tokio::runtime::Builder;
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt::{self, time::OffsetTime},
};

#[derive(Debug, Parser)]
#[command(name = "codeforces_sync")]
#[command(about = "Codeforces profile synchronizer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start tracking a handle
    Onboard(OnboardArgs),
    /// Refetch a tracked handle
    Refresh(RefreshArgs),
    /// Stop tracking a handle and delete its history
    Remove(RemoveArgs),
    /// Refresh every tracked handle and notify inactive users
    Sync(SyncArgs),
    /// Check whether a handle has been inactive
    Inactive(InactiveArgs),
    /// Run database migrations
    Migrate(MigrateArgs),
}

fn main() {
    dotenv().ok();

    let log_level = env::var("RUST_LOG").unwrap_or(String::from("info"));
    let filter = EnvFilter::builder()
        .with_default_directive(
            LevelFilter::from_str(&log_level)
                .expect("couldn't parse specified log level")
                .into(),
        )
        .from_env_lossy();
    let format = fmt::format()
        .with_level(true)
        .with_target(true)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_timer(OffsetTime::local_rfc_3339().unwrap());
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .event_format(format)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("failed to set tracing subscriber");

    let runtime = Builder::new_multi_thread().enable_all().build().unwrap();

    let result = match Cli::parse().command {
        Commands::Onboard(args) => runtime.block_on(onboard::run(args)),
        Commands::Refresh(args) => runtime.block_on(refresh::run(args)),
        Commands::Remove(args) => runtime.block_on(remove::run(args)),
        Commands::Sync(args) => runtime.block_on(sync::run(args)),
        Commands::Inactive(args) => runtime.block_on(inactive::run(args)),
        Commands::Migrate(args) => runtime.block_on(migrate::run(args)),
    };

    if let Err(e) = result {
        eprintln!("{:?}", e);
        std::process::exit(1);
    }
}
