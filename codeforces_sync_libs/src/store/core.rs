use crate::store::model::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database operation failed")]
    Database(#[from] sqlx::Error),
    #[error("failed to run migrations")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("record already exists: {0}")]
    Duplicate(String),
    #[error("handle not tracked: {0}")]
    NotFound(String),
}

/// Persisted-state collaborator of the synchronizer.
///
/// Profiles are keyed by handle, submissions by their external id across all handles.
/// Contest results and submissions reference a handle only at the application level.
#[async_trait]
pub trait Store {
    async fn find_profile(&self, handle: &str) -> Result<Option<Profile>>;
    async fn list_profiles(&self) -> Result<Vec<Profile>>;
    async fn create_profile(
        &self,
        handle: &str,
        fields: &ProfileFields,
        now: DateTime<Utc>,
    ) -> Result<Profile>;
    async fn update_profile(&self, handle: &str, fields: &ProfileFields) -> Result<Profile>;
    async fn touch_last_sync(&self, handle: &str, now: DateTime<Utc>) -> Result<Profile>;
    /// Moves the profile of `handle` to `new_handle`, keeping every other field.
    ///
    /// Fails with `NotFound` when `handle` is untracked and `Duplicate` when `new_handle` is taken.
    async fn rename_profile(&self, handle: &str, new_handle: &str) -> Result<Profile>;
    /// Returns whether a profile was removed.
    async fn delete_profile(&self, handle: &str) -> Result<bool>;

    /// Removes every contest result of `handle` and stores `contests` in their place.
    async fn replace_contests(&self, handle: &str, contests: &[ContestResult]) -> Result<u64>;
    async fn delete_contests(&self, handle: &str) -> Result<u64>;
    /// Most recent first.
    async fn find_contests(&self, handle: &str) -> Result<Vec<ContestResult>>;

    async fn delete_submissions(&self, handle: &str) -> Result<u64>;
    /// Inserts row by row; a rejected row never stops the remaining ones.
    async fn insert_submissions(&self, records: &[SubmissionRecord]) -> Result<InsertOutcome>;
    async fn count_submissions(&self, handle: &str) -> Result<u64>;
    /// Latest submission of `handle` created at or after `since` (epoch seconds).
    async fn latest_submission_since(
        &self,
        handle: &str,
        since: i64,
    ) -> Result<Option<SubmissionRecord>>;
}
