use crate::store::Store;
use chrono::{DateTime, Utc};

pub const DEFAULT_INACTIVITY_DAYS: i64 = 7;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Whether `handle` has no submission in the `window_days` preceding `now`.
///
/// A handle without any stored submission is reported as not inactive. Lookup failures are
/// reported as not inactive too, so that no notice goes out on a guess.
pub async fn is_inactive<D>(store: &D, handle: &str, window_days: i64, now: DateTime<Utc>) -> bool
where
    D: Store + Sync + ?Sized,
{
    let since = match window_days
        .checked_mul(SECONDS_PER_DAY)
        .filter(|window| *window >= 0)
        .and_then(|window| now.timestamp().checked_sub(window))
    {
        Some(since) => since,
        None => {
            tracing::error!(
                "Invalid inactivity window of {} days for {}",
                window_days,
                handle
            );
            return false;
        }
    };

    match store.count_submissions(handle).await {
        Ok(0) => {
            tracing::info!("{} has no submissions at all, not flagged as inactive", handle);
            return false;
        }
        Ok(_) => {}
        Err(e) => {
            tracing::error!("Error checking inactivity for {}: {:?}", handle, e);
            return false;
        }
    }

    match store.latest_submission_since(handle, since).await {
        Ok(latest) => latest.is_none(),
        Err(e) => {
            tracing::error!("Error checking inactivity for {}: {:?}", handle, e);
            false
        }
    }
}
