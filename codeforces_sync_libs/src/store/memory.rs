use crate::store::{core::*, model::*};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{
    collections::{BTreeMap, HashSet},
    sync::{Mutex, MutexGuard},
};

#[derive(Default)]
struct Tables {
    profiles: BTreeMap<String, Profile>,
    contests: Vec<ContestResult>,
    submissions: Vec<SubmissionRecord>,
}

/// Write step that can be made to fail for a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Contests,
    Submissions,
}

/// In-memory [`Store`] with the same key constraints as the PostgreSQL schema.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_points: Mutex<HashSet<(String, FailPoint)>>,
    failing_lookups: Mutex<bool>,
    failing_listing: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Makes writes of `point` fail for `handle`.
    pub fn fail_at(&self, handle: &str, point: FailPoint) {
        self.fail_points
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((String::from(handle), point));
    }

    /// Makes submission lookups fail.
    pub fn fail_lookups(&self) {
        *self.failing_lookups.lock().unwrap_or_else(|e| e.into_inner()) = true;
    }

    /// Makes profile enumeration fail.
    pub fn fail_listing(&self) {
        *self.failing_listing.lock().unwrap_or_else(|e| e.into_inner()) = true;
    }

    fn check_writable(&self, handle: &str, point: FailPoint) -> Result<()> {
        let failing = self.fail_points.lock().unwrap_or_else(|e| e.into_inner());
        if failing.contains(&(String::from(handle), point)) {
            Err(StoreError::Database(sqlx::Error::Protocol(format!(
                "writes rejected for {}",
                handle
            ))))
        } else {
            Ok(())
        }
    }

    fn check_lookup(&self) -> Result<()> {
        if *self.failing_lookups.lock().unwrap_or_else(|e| e.into_inner()) {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        } else {
            Ok(())
        }
    }

    pub fn submissions(&self, handle: &str) -> Vec<SubmissionRecord> {
        self.tables()
            .submissions
            .iter()
            .filter(|record| record.handle == handle)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_profile(&self, handle: &str) -> Result<Option<Profile>> {
        Ok(self.tables().profiles.get(handle).cloned())
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>> {
        if *self.failing_listing.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.tables().profiles.values().cloned().collect())
    }

    async fn create_profile(
        &self,
        handle: &str,
        fields: &ProfileFields,
        now: DateTime<Utc>,
    ) -> Result<Profile> {
        let mut tables = self.tables();
        if tables.profiles.contains_key(handle) {
            return Err(StoreError::Duplicate(String::from(handle)));
        }

        let profile = Profile {
            handle: String::from(handle),
            first_name: fields.first_name.clone(),
            last_name: fields.last_name.clone(),
            email: fields.email.clone(),
            rank: fields.rank.clone(),
            rating: fields.rating,
            max_rating: fields.max_rating,
            avatar: fields.avatar.clone(),
            friend_of_count: fields.friend_of_count,
            last_sync_time: now,
            created_at: now,
            updated_at: now,
        };
        tables
            .profiles
            .insert(String::from(handle), profile.clone());

        Ok(profile)
    }

    async fn update_profile(&self, handle: &str, fields: &ProfileFields) -> Result<Profile> {
        let mut tables = self.tables();
        let profile = tables
            .profiles
            .get_mut(handle)
            .ok_or_else(|| StoreError::NotFound(String::from(handle)))?;

        profile.first_name = fields.first_name.clone();
        profile.last_name = fields.last_name.clone();
        if fields.email.is_some() {
            profile.email = fields.email.clone();
        }
        profile.rank = fields.rank.clone();
        profile.rating = fields.rating;
        profile.max_rating = profile.max_rating.max(fields.max_rating);
        profile.avatar = fields.avatar.clone();
        if fields.friend_of_count.is_some() {
            profile.friend_of_count = fields.friend_of_count;
        }
        profile.updated_at = Utc::now();

        Ok(profile.clone())
    }

    async fn touch_last_sync(&self, handle: &str, now: DateTime<Utc>) -> Result<Profile> {
        let mut tables = self.tables();
        let profile = tables
            .profiles
            .get_mut(handle)
            .ok_or_else(|| StoreError::NotFound(String::from(handle)))?;
        profile.last_sync_time = now;
        profile.updated_at = now;

        Ok(profile.clone())
    }

    async fn rename_profile(&self, handle: &str, new_handle: &str) -> Result<Profile> {
        let mut tables = self.tables();
        if tables.profiles.contains_key(new_handle) {
            return Err(StoreError::Duplicate(String::from(new_handle)));
        }
        let mut profile = tables
            .profiles
            .remove(handle)
            .ok_or_else(|| StoreError::NotFound(String::from(handle)))?;

        profile.handle = String::from(new_handle);
        profile.updated_at = Utc::now();
        tables
            .profiles
            .insert(String::from(new_handle), profile.clone());

        Ok(profile)
    }

    async fn delete_profile(&self, handle: &str) -> Result<bool> {
        Ok(self.tables().profiles.remove(handle).is_some())
    }

    async fn replace_contests(&self, handle: &str, contests: &[ContestResult]) -> Result<u64> {
        self.check_writable(handle, FailPoint::Contests)?;

        let mut tables = self.tables();
        tables.contests.retain(|contest| contest.handle != handle);
        tables.contests.extend(contests.iter().cloned().map(|mut contest| {
            contest.handle = String::from(handle);
            contest
        }));

        Ok(contests.len() as u64)
    }

    async fn delete_contests(&self, handle: &str) -> Result<u64> {
        let mut tables = self.tables();
        let before = tables.contests.len();
        tables.contests.retain(|contest| contest.handle != handle);

        Ok((before - tables.contests.len()) as u64)
    }

    async fn find_contests(&self, handle: &str) -> Result<Vec<ContestResult>> {
        let mut contests: Vec<ContestResult> = self
            .tables()
            .contests
            .iter()
            .filter(|contest| contest.handle == handle)
            .cloned()
            .collect();
        contests.sort_by(|a, b| b.contest_time.cmp(&a.contest_time));

        Ok(contests)
    }

    async fn delete_submissions(&self, handle: &str) -> Result<u64> {
        self.check_writable(handle, FailPoint::Submissions)?;

        let mut tables = self.tables();
        let before = tables.submissions.len();
        tables.submissions.retain(|record| record.handle != handle);

        Ok((before - tables.submissions.len()) as u64)
    }

    async fn insert_submissions(&self, records: &[SubmissionRecord]) -> Result<InsertOutcome> {
        let mut outcome = InsertOutcome {
            attempted: records.len(),
            inserted: 0,
        };

        let mut tables = self.tables();
        for record in records.iter() {
            if tables
                .submissions
                .iter()
                .any(|stored| stored.submission_id == record.submission_id)
            {
                tracing::warn!(
                    "submission {} of {} already exists, skipped",
                    record.submission_id,
                    record.handle
                );
                continue;
            }
            tables.submissions.push(record.clone());
            outcome.inserted += 1;
        }

        Ok(outcome)
    }

    async fn count_submissions(&self, handle: &str) -> Result<u64> {
        Ok(self
            .tables()
            .submissions
            .iter()
            .filter(|record| record.handle == handle)
            .count() as u64)
    }

    async fn latest_submission_since(
        &self,
        handle: &str,
        since: i64,
    ) -> Result<Option<SubmissionRecord>> {
        self.check_lookup()?;

        Ok(self
            .tables()
            .submissions
            .iter()
            .filter(|record| record.handle == handle && record.creation_time_seconds >= since)
            .max_by_key(|record| record.creation_time_seconds)
            .cloned())
    }
}
