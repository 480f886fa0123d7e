pub mod inactive;
pub mod migrate;
pub mod onboard;
pub mod refresh;
pub mod remove;
pub mod sync;

use anyhow::{Context, Result};
use async_trait::async_trait;
use codeforces_sync_libs::{
    codeforces::{CodeforcesClient, DEFAULT_API_URL},
    notify::{InactivityNotice, LogNotifier, MailRelayNotifier, Notifier, NotifyError},
    store::PgStore,
    SyncConfig, Synchronizer,
};
use std::env;
use tokio::time::Duration;

pub type AppSynchronizer = Synchronizer<CodeforcesClient, PgStore, AppNotifier>;

/// Notifier chosen from the environment.
pub enum AppNotifier {
    Relay(MailRelayNotifier),
    Log(LogNotifier),
}

#[async_trait]
impl Notifier for AppNotifier {
    async fn send(&self, notice: &InactivityNotice) -> Result<(), NotifyError> {
        match self {
            AppNotifier::Relay(notifier) => notifier.send(notice).await,
            AppNotifier::Log(notifier) => notifier.send(notice).await,
        }
    }
}

pub async fn connect_store() -> Result<PgStore> {
    let database_url: String = env::var("DATABASE_URL").with_context(|| {
        let message = "DATABASE_URL must be configured.";
        tracing::error!(message);
        message
    })?;

    let store = PgStore::connect(&database_url).await.with_context(|| {
        let message = "Failed to create database connection pool.";
        tracing::error!(message);
        message
    })?;
    store.migrate().await.with_context(|| {
        let message = "Failed to run database migrations.";
        tracing::error!(message);
        message
    })?;

    Ok(store)
}

pub async fn build_synchronizer() -> Result<AppSynchronizer> {
    let store = connect_store().await?;

    let api_url = env::var("CODEFORCES_API_URL").unwrap_or_else(|_| {
        tracing::warn!(
            "CODEFORCES_API_URL is not configured, default value {} will be used.",
            DEFAULT_API_URL
        );
        String::from(DEFAULT_API_URL)
    });
    let client = CodeforcesClient::new(&api_url).with_context(|| {
        let message = format!("Invalid Codeforces API url: {}", api_url);
        tracing::error!("{}", message);
        message
    })?;

    let notifier = build_notifier()?;
    let config = build_config()?;

    Ok(Synchronizer::new(client, store, notifier, config))
}

fn build_notifier() -> Result<AppNotifier> {
    let relay_url = match env::var("MAIL_RELAY_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!("MAIL_RELAY_URL is not configured, inactivity notices will only be logged.");
            return Ok(AppNotifier::Log(LogNotifier));
        }
    };
    let from = env::var("MAIL_FROM").with_context(|| {
        let message = "MAIL_FROM must be configured when MAIL_RELAY_URL is set.";
        tracing::error!(message);
        message
    })?;
    let token = env::var("MAIL_RELAY_TOKEN").ok();

    let notifier = MailRelayNotifier::new(&relay_url, &from, token).with_context(|| {
        let message = format!("Invalid mail relay url: {}", relay_url);
        tracing::error!("{}", message);
        message
    })?;

    Ok(AppNotifier::Relay(notifier))
}

fn build_config() -> Result<SyncConfig> {
    let mut config = SyncConfig::default();
    if let Some(interval) = millis_from_env("SYNC_REQUEST_INTERVAL_MS", config.request_interval)? {
        config.request_interval = interval;
    }
    if let Some(interval) = millis_from_env("SYNC_USER_INTERVAL_MS", config.user_interval)? {
        config.user_interval = interval;
    }

    Ok(config)
}

fn millis_from_env(key: &str, default: Duration) -> Result<Option<Duration>> {
    match env::var(key) {
        Ok(value) => {
            let millis: u64 = value.trim().parse().with_context(|| {
                let message = format!("{} must be an integer in milliseconds: {}", key, value);
                tracing::error!("{}", message);
                message
            })?;
            Ok(Some(Duration::from_millis(millis)))
        }
        Err(_) => {
            tracing::warn!(
                "{} is not configured, default value {}ms will be used.",
                key,
                default.as_millis()
            );
            Ok(None)
        }
    }
}
