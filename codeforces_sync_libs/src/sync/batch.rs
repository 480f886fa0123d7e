use crate::{
    codeforces::ProfileSource,
    notify::{notify_inactive, Notifier},
    store::Store,
    sync::{Result, SyncError, Synchronizer},
};
use serde::Serialize;
use tokio::sync::watch;

/// Outcome of one pass over every tracked user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub success: usize,
    pub failed: usize,
    pub inactive: usize,
    /// `"<handle>: <message>"` for every failed user.
    pub errors: Vec<String>,
    /// Users left out because a stop was requested.
    pub skipped: usize,
}

impl<S, D, N> Synchronizer<S, D, N>
where
    S: ProfileSource + Send + Sync,
    D: Store + Send + Sync,
    N: Notifier + Send + Sync,
{
    /// Refreshes every tracked user one after another.
    ///
    /// A failing user is recorded and skipped. Only a failure to enumerate the tracked users
    /// is returned as an error.
    pub async fn sync_all(&self) -> Result<BatchReport> {
        let (_tx, rx) = watch::channel(false);
        self.sync_all_until(rx).await
    }

    /// Same as [`Synchronizer::sync_all`], but schedules no further user once `stop` turns true.
    /// The user in flight is always finished.
    pub async fn sync_all_until(&self, stop: watch::Receiver<bool>) -> Result<BatchReport> {
        let profiles = self.store.list_profiles().await.map_err(|e| {
            tracing::error!("Failed to sync all users: {:?}", e);
            SyncError::from(e)
        })?;
        tracing::info!("Start to sync {} users", profiles.len());

        let mut report = BatchReport::default();
        for (i, profile) in profiles.iter().enumerate() {
            if i > 0 {
                self.pacer.wait_extra(self.config.user_interval).await;
            }
            let stopped = *stop.borrow();
            if stopped {
                report.skipped = profiles.len() - i;
                tracing::warn!("Sync stopped, {} users left", report.skipped);
                break;
            }

            let handle = profile.handle.as_str();
            match self.refresh(handle, None).await {
                Ok(synced) => {
                    report.success += 1;

                    let days = self.config.inactivity_days;
                    if self.is_inactive(handle, days).await {
                        tracing::info!("{} has no submission in the last {} days", handle, days);
                        report.inactive += 1;
                        notify_inactive(&self.notifier, &synced.profile, days).await;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to sync user {}: {}", handle, e);
                    report.failed += 1;
                    report.errors.push(format!("{}: {}", handle, e));
                }
            }
        }

        tracing::info!(
            "Sync completed: {} succeeded, {} failed, {} inactive",
            report.success,
            report.failed,
            report.inactive
        );
        Ok(report)
    }
}
