use crate::{
    activity,
    codeforces::{model::UserInfo, ProfileSource},
    notify::Notifier,
    store::{
        model::{ContestResult, InsertOutcome, ProfileFields, SubmissionRecord, UNRATED},
        Store,
    },
    sync::{lock::HandleLocks, pacer::Pacer, Result, SyncConfig, SyncError, SyncReport, SyncRequest},
};
use chrono::Utc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Onboard,
    Refresh,
    Rename,
}

/// Counts of one history pass.
struct HistoryCounts {
    contests: usize,
    submissions: InsertOutcome,
}

/// Fetch-and-persist engine for tracked Codeforces users.
///
/// The source, store and notifier are injected once and shared by every pass. All external
/// requests of the process go through one [`Pacer`], and a pass over a handle holds that
/// handle's lock from the first request to the last write.
pub struct Synchronizer<S, D, N> {
    pub(crate) source: S,
    pub(crate) store: D,
    pub(crate) notifier: N,
    pub(crate) config: SyncConfig,
    pub(crate) pacer: Pacer,
    locks: HandleLocks,
}

impl<S, D, N> Synchronizer<S, D, N>
where
    S: ProfileSource + Send + Sync,
    D: Store + Send + Sync,
    N: Notifier + Send + Sync,
{
    pub fn new(source: S, store: D, notifier: N, config: SyncConfig) -> Self {
        let pacer = Pacer::new(config.request_interval);
        Self {
            source,
            store,
            notifier,
            config,
            pacer,
            locks: HandleLocks::new(),
        }
    }

    pub fn store(&self) -> &D {
        &self.store
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Starts tracking `handle` and stores its whole history.
    ///
    /// Anything written for the handle is removed again if a step after the profile creation
    /// fails.
    pub async fn onboard(&self, handle: &str, email: Option<&str>) -> Result<SyncReport> {
        let request = SyncRequest::parse(handle, email)?;
        let handle = request.handle.as_str();
        let _guard = self.locks.acquire(handle).await;

        if self.store.find_profile(handle).await?.is_some() {
            tracing::warn!("{} is already added", handle);
            return Err(SyncError::AlreadyExists(String::from(handle)));
        }

        tracing::info!("Fetching user info for handle: {}", handle);
        self.pacer.wait().await;
        let info = self.source.fetch_profile(handle).await.map_err(|e| {
            tracing::error!("failed to fetch user info of {}: {:?}", handle, e);
            SyncError::OnboardFailed {
                handle: String::from(handle),
                source: Box::new(SyncError::Profile(e)),
            }
        })?;

        let fields = profile_fields(&info, request.email.clone());
        self.store.create_profile(handle, &fields, Utc::now()).await?;
        tracing::info!("{} created", handle);

        let result = async {
            let counts = self.sync_history(handle, Mode::Onboard).await?;
            let profile = self.store.touch_last_sync(handle, Utc::now()).await?;
            Ok::<_, SyncError>((profile, counts))
        }
        .await;

        match result {
            Ok((profile, counts)) => {
                tracing::info!(
                    "{} added with {} contests and {} submissions ({} stored)",
                    handle,
                    counts.contests,
                    counts.submissions.attempted,
                    counts.submissions.inserted
                );
                Ok(SyncReport {
                    profile,
                    contest_count: counts.contests,
                    submission_count: counts.submissions.attempted,
                    submissions_inserted: counts.submissions.inserted,
                })
            }
            Err(e) => {
                tracing::error!("Error creating user {}: {:?}", handle, e);
                self.rollback(handle).await;
                Err(SyncError::OnboardFailed {
                    handle: String::from(handle),
                    source: Box::new(e),
                })
            }
        }
    }

    /// Refetches everything of an already tracked `handle`.
    ///
    /// A failed profile fetch leaves the stored data untouched.
    pub async fn refresh(&self, handle: &str, email: Option<&str>) -> Result<SyncReport> {
        let request = SyncRequest::parse(handle, email)?;
        let handle = request.handle.as_str();
        let _guard = self.locks.acquire(handle).await;

        if self.store.find_profile(handle).await?.is_none() {
            return Err(SyncError::NotFound(String::from(handle)));
        }

        tracing::info!("Syncing data for user: {}", handle);
        self.pacer.wait().await;
        let info = self.source.fetch_profile(handle).await.map_err(|e| {
            tracing::error!("failed to fetch user info of {}: {:?}", handle, e);
            SyncError::Profile(e)
        })?;

        let fields = profile_fields(&info, request.email.clone());
        self.store.update_profile(handle, &fields).await?;

        let counts = self.sync_history(handle, Mode::Refresh).await?;
        let profile = self.store.touch_last_sync(handle, Utc::now()).await?;

        tracing::info!(
            "Successfully synced user {}: {} contests, {} submissions ({} stored)",
            handle,
            counts.contests,
            counts.submissions.attempted,
            counts.submissions.inserted
        );

        Ok(SyncReport {
            profile,
            contest_count: counts.contests,
            submission_count: counts.submissions.attempted,
            submissions_inserted: counts.submissions.inserted,
        })
    }

    /// Moves a tracked `handle` to `new_handle` and refetches everything under the new handle.
    ///
    /// The stored email is kept unless one is given. Contests and submissions stored under the
    /// old handle are deleted. A failed profile fetch leaves the stored data untouched.
    pub async fn rename(
        &self,
        handle: &str,
        new_handle: &str,
        email: Option<&str>,
    ) -> Result<SyncReport> {
        let request = SyncRequest::parse(handle, email)?;
        let renamed = SyncRequest::parse(new_handle, None)?;
        let handle = request.handle.as_str();
        let new_handle = renamed.handle.as_str();
        if handle == new_handle {
            return self.refresh(handle, email).await;
        }

        // 常に同じ順でロックを取る
        let (first, second) = if handle < new_handle {
            (handle, new_handle)
        } else {
            (new_handle, handle)
        };
        let _first = self.locks.acquire(first).await;
        let _second = self.locks.acquire(second).await;

        if self.store.find_profile(handle).await?.is_none() {
            return Err(SyncError::NotFound(String::from(handle)));
        }
        if self.store.find_profile(new_handle).await?.is_some() {
            tracing::warn!("{} is already added", new_handle);
            return Err(SyncError::AlreadyExists(String::from(new_handle)));
        }

        tracing::info!("Fetching user info for new handle of {}: {}", handle, new_handle);
        self.pacer.wait().await;
        let info = self.source.fetch_profile(new_handle).await.map_err(|e| {
            tracing::error!("failed to fetch user info of {}: {:?}", new_handle, e);
            SyncError::Profile(e)
        })?;

        self.store.rename_profile(handle, new_handle).await?;
        let fields = profile_fields(&info, request.email.clone());
        self.store.update_profile(new_handle, &fields).await?;

        let contests = self.store.delete_contests(handle).await?;
        let submissions = self.store.delete_submissions(handle).await?;
        tracing::info!(
            "{} renamed to {}, {} contests and {} submissions of the old handle deleted",
            handle,
            new_handle,
            contests,
            submissions
        );

        let counts = self.sync_history(new_handle, Mode::Rename).await?;
        let profile = self.store.touch_last_sync(new_handle, Utc::now()).await?;

        Ok(SyncReport {
            profile,
            contest_count: counts.contests,
            submission_count: counts.submissions.attempted,
            submissions_inserted: counts.submissions.inserted,
        })
    }

    /// Stops tracking `handle` and deletes its contests and submissions.
    pub async fn remove(&self, handle: &str) -> Result<()> {
        let request = SyncRequest::parse(handle, None)?;
        let handle = request.handle.as_str();
        let _guard = self.locks.acquire(handle).await;

        if self.store.find_profile(handle).await?.is_none() {
            return Err(SyncError::NotFound(String::from(handle)));
        }

        let contests = self.store.delete_contests(handle).await?;
        let submissions = self.store.delete_submissions(handle).await?;
        self.store.delete_profile(handle).await?;

        tracing::info!(
            "{} removed with {} contests and {} submissions",
            handle,
            contests,
            submissions
        );
        Ok(())
    }

    pub async fn is_inactive(&self, handle: &str, window_days: i64) -> bool {
        activity::is_inactive(&self.store, handle, window_days, Utc::now()).await
    }

    async fn sync_history(&self, handle: &str, mode: Mode) -> Result<HistoryCounts> {
        tracing::info!("Fetching contest history for handle: {}", handle);
        self.pacer.wait().await;
        let history = self.source.fetch_rating_history(handle).await;

        let contests = if !history.is_empty() {
            let contests: Vec<ContestResult> = history
                .iter()
                .map(|change| ContestResult::from_rating_change(handle, change))
                .collect();
            self.store.replace_contests(handle, &contests).await?;
            contests.len()
        } else {
            if mode != Mode::Refresh {
                // 以前の削除で残ったレコードがあれば消す
                self.store.delete_contests(handle).await?;
            } else {
                tracing::info!("No contest update for {}, keeping stored results", handle);
            }
            0
        };

        tracing::info!("Fetching submissions for handle: {}", handle);
        self.pacer.wait().await;
        let fetched = self
            .source
            .fetch_submissions(handle, self.config.submission_count)
            .await;

        let submissions = if !fetched.is_empty() {
            self.store.delete_submissions(handle).await?;

            let records: Vec<SubmissionRecord> = fetched
                .iter()
                .filter_map(|submission| SubmissionRecord::from_submission(handle, submission))
                .collect();
            if records.is_empty() {
                InsertOutcome::default()
            } else {
                let outcome = self.store.insert_submissions(&records).await?;
                if outcome.inserted < outcome.attempted {
                    tracing::warn!(
                        "{} of {} submissions of {} were not stored",
                        outcome.attempted - outcome.inserted,
                        outcome.attempted,
                        handle
                    );
                }
                outcome
            }
        } else {
            if mode != Mode::Refresh {
                self.store.delete_submissions(handle).await?;
            } else {
                tracing::info!("No submission update for {}, keeping stored records", handle);
            }
            InsertOutcome::default()
        };

        Ok(HistoryCounts {
            contests,
            submissions,
        })
    }

    /// Deletes whatever an aborted onboarding wrote. Failures are only logged.
    async fn rollback(&self, handle: &str) {
        if let Err(e) = self.store.delete_profile(handle).await {
            tracing::error!("Error during cleanup of profile {}: {:?}", handle, e);
        }
        if let Err(e) = self.store.delete_contests(handle).await {
            tracing::error!("Error during cleanup of contests of {}: {:?}", handle, e);
        }
        if let Err(e) = self.store.delete_submissions(handle).await {
            tracing::error!("Error during cleanup of submissions of {}: {:?}", handle, e);
        }
    }
}

/// Profile fields observed in `info`.
///
/// An address given by the caller wins over the fetched one. `None` keeps the stored address.
fn profile_fields(info: &UserInfo, email: Option<String>) -> ProfileFields {
    let rating = info.rating.unwrap_or(0);

    ProfileFields {
        first_name: info.first_name.clone().unwrap_or_default(),
        last_name: info.last_name.clone().unwrap_or_default(),
        email: email.or_else(|| {
            info.email
                .as_deref()
                .map(str::trim)
                .filter(|email| !email.is_empty())
                .map(String::from)
        }),
        rank: info
            .rank
            .clone()
            .filter(|rank| !rank.is_empty())
            .unwrap_or(String::from(UNRATED)),
        rating,
        max_rating: info.max_rating.unwrap_or(rating).max(rating),
        avatar: info
            .avatar
            .clone()
            .filter(|avatar| !avatar.is_empty())
            .or_else(|| info.title_photo.clone())
            .unwrap_or_default(),
        friend_of_count: info.friend_of_count,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        codeforces::CodeforcesError,
        store::{FailPoint, MemoryStore},
        sync::{
            testing::{contest, submission, user, Endpoint, RecordingNotifier, Script, ScriptedSource},
            ErrorKind,
        },
    };
    use tokio::time::{Duration, Instant};

    type TestSynchronizer = Synchronizer<ScriptedSource, MemoryStore, RecordingNotifier>;

    fn synchronizer() -> TestSynchronizer {
        Synchronizer::new(
            ScriptedSource::new(),
            MemoryStore::new(),
            RecordingNotifier::default(),
            SyncConfig::default(),
        )
    }

    fn alice_script() -> Script {
        Script {
            profile: Some(user("alice", 1500, Some(1500))),
            rating: vec![
                contest("Codeforces Round 900", 1695000000, 0, 1400),
                contest("Codeforces Round 901", 1696000000, 1400, 1500),
            ],
            submissions: vec![
                submission(1, 1696000100),
                submission(2, 1696000200),
                submission(3, 1696000300),
                submission(4, 1696000400),
                submission(2, 1696000500),
            ],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_onboard_scenario() {
        let sync = synchronizer();
        sync.source().set("alice", alice_script());

        let report = sync.onboard("alice", None).await.unwrap();

        assert_eq!(report.contest_count, 2);
        assert_eq!(report.submission_count, 5);
        assert_eq!(report.submissions_inserted, 4);
        assert_eq!(report.profile.max_rating, 1500);
        assert_eq!(report.profile.first_name, "Alice");
        assert_eq!(sync.store().count_submissions("alice").await.unwrap(), 4);

        // the first occurrence of a repeated id is the one kept
        let stored: Vec<(i64, i64)> = sync
            .store()
            .submissions("alice")
            .iter()
            .map(|record| (record.submission_id, record.creation_time_seconds))
            .collect();
        assert!(stored.contains(&(2, 1696000200)));
        assert!(!stored.contains(&(2, 1696000500)));

        let stored = sync.store().find_profile("alice").await.unwrap().unwrap();
        assert_eq!(stored.max_rating, 1500);
        assert_eq!(stored.rank, "specialist");
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_are_spaced() {
        let sync = synchronizer();
        sync.source().set("alice", alice_script());
        let start = Instant::now();

        sync.onboard("alice", None).await.unwrap();

        let calls = sync.source().calls.lock().unwrap().clone();
        let endpoints: Vec<Endpoint> = calls.iter().map(|call| call.1).collect();
        assert_eq!(endpoints, vec![Endpoint::Info, Endpoint::Rating, Endpoint::Status]);

        let offsets: Vec<Duration> = calls.iter().map(|call| call.2 - start).collect();
        assert_eq!(
            offsets,
            vec![
                Duration::ZERO,
                Duration::from_millis(2200),
                Duration::from_millis(4400)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_onboard_defaults() {
        let sync = synchronizer();
        sync.source().set(
            "newbie",
            Script {
                profile: Some(UserInfo {
                    handle: String::from("newbie"),
                    title_photo: Some(String::from("https://userpic.codeforces.org/title.jpg")),
                    friend_of_count: Some(3),
                    ..UserInfo::default()
                }),
                ..Script::default()
            },
        );

        let report = sync.onboard("newbie", Some("newbie@example.com")).await.unwrap();

        assert_eq!(report.contest_count, 0);
        assert_eq!(report.submission_count, 0);
        assert_eq!(report.profile.rank, UNRATED);
        assert_eq!(report.profile.rating, 0);
        assert_eq!(report.profile.max_rating, 0);
        assert_eq!(report.profile.first_name, "");
        assert_eq!(report.profile.avatar, "https://userpic.codeforces.org/title.jpg");
        assert_eq!(report.profile.friend_of_count, Some(3));
        assert_eq!(report.profile.email.as_deref(), Some("newbie@example.com"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_onboard_twice() {
        let sync = synchronizer();
        sync.source().set("alice", alice_script());
        sync.onboard("alice", None).await.unwrap();

        let result = sync.onboard("alice", None).await;

        assert!(matches!(result, Err(SyncError::AlreadyExists(ref handle)) if handle == "alice"));
        assert_eq!(result.unwrap_err().kind(), ErrorKind::BadRequest);
        assert!(sync.store().find_profile("alice").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_onboard_unknown_handle() {
        let sync = synchronizer();

        let result = sync.onboard("ghost", None).await;

        assert!(matches!(result, Err(SyncError::OnboardFailed { .. })));
        assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
        assert!(sync.store().find_profile("ghost").await.unwrap().is_none());
        assert_eq!(sync.source().call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_onboard_invalid_handle_makes_no_request() {
        let sync = synchronizer();

        let result = sync.onboard("no spaces allowed", None).await;

        assert!(matches!(result, Err(SyncError::InvalidHandle(_))));
        assert_eq!(sync.source().call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_onboard_rolls_back_on_contest_failure() {
        let sync = synchronizer();
        sync.source().set("alice", alice_script());
        sync.store().fail_at("alice", FailPoint::Contests);

        let result = sync.onboard("alice", None).await;

        let e = result.unwrap_err();
        assert!(matches!(e, SyncError::OnboardFailed { .. }));
        assert_eq!(e.to_string(), "unable to add user alice");
        assert!(sync.store().find_profile("alice").await.unwrap().is_none());
        assert!(sync.store().find_contests("alice").await.unwrap().is_empty());
        assert_eq!(sync.store().count_submissions("alice").await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_onboard_rolls_back_on_submission_failure() {
        let sync = synchronizer();
        sync.source().set("alice", alice_script());
        // cleanup of submissions fails as well, the original error is still reported
        sync.store().fail_at("alice", FailPoint::Submissions);

        let result = sync.onboard("alice", None).await;

        match result {
            Err(SyncError::OnboardFailed { handle, source }) => {
                assert_eq!(handle, "alice");
                assert!(matches!(*source, SyncError::Store(_)));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(sync.store().find_profile("alice").await.unwrap().is_none());
        assert!(sync.store().find_contests("alice").await.unwrap().is_empty());
        assert_eq!(sync.store().count_submissions("alice").await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_untracked_handle() {
        let sync = synchronizer();
        sync.source().set("alice", alice_script());

        let result = sync.refresh("alice", None).await;

        assert!(matches!(result, Err(SyncError::NotFound(_))));
        assert_eq!(sync.source().call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_rating_never_regresses() {
        let sync = synchronizer();
        let ratings = [1500, 1700, 1600, 1200, 1750];

        let mut highest = 0;
        for (i, rating) in ratings.iter().enumerate() {
            sync.source().set(
                "alice",
                Script {
                    profile: Some(user("alice", *rating, None)),
                    ..Script::default()
                },
            );
            let report = if i == 0 {
                sync.onboard("alice", None).await.unwrap()
            } else {
                sync.refresh("alice", None).await.unwrap()
            };
            highest = highest.max(*rating);

            assert_eq!(report.profile.rating, *rating);
            assert_eq!(report.profile.max_rating, highest);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_replaces_contests() {
        let sync = synchronizer();
        sync.source().set("alice", alice_script());
        sync.onboard("alice", None).await.unwrap();

        let rating = vec![contest("Educational Round 156", 1697000000, 1500, 1560)];
        sync.source().set(
            "alice",
            Script {
                rating: rating.clone(),
                ..alice_script()
            },
        );
        let report = sync.refresh("alice", None).await.unwrap();

        let expected: Vec<ContestResult> = rating
            .iter()
            .map(|change| ContestResult::from_rating_change("alice", change))
            .collect();
        assert_eq!(report.contest_count, 1);
        assert_eq!(sync.store().find_contests("alice").await.unwrap(), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_keeps_contests_and_submissions_on_empty_history() {
        let sync = synchronizer();
        sync.source().set("alice", alice_script());
        sync.onboard("alice", None).await.unwrap();
        let contests = sync.store().find_contests("alice").await.unwrap();
        let submissions = sync.store().submissions("alice");

        sync.source().set(
            "alice",
            Script {
                profile: Some(user("alice", 1480, Some(1500))),
                ..Script::default()
            },
        );
        let report = sync.refresh("alice", None).await.unwrap();

        assert_eq!(report.contest_count, 0);
        assert_eq!(report.submission_count, 0);
        assert_eq!(sync.store().find_contests("alice").await.unwrap(), contests);
        assert_eq!(sync.store().submissions("alice"), submissions);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_failure_leaves_store_untouched() {
        let sync = synchronizer();
        sync.source().set("alice", alice_script());
        let before = sync.onboard("alice", None).await.unwrap().profile;

        sync.source().set("alice", Script::default());
        let result = sync.refresh("alice", None).await;

        assert!(matches!(
            result,
            Err(SyncError::Profile(CodeforcesError::HandleNotFound(_, _)))
        ));
        assert_eq!(sync.store().find_profile("alice").await.unwrap(), Some(before));
        assert_eq!(sync.store().find_contests("alice").await.unwrap().len(), 2);
        assert_eq!(sync.store().count_submissions("alice").await.unwrap(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_email_priority() {
        let sync = synchronizer();
        sync.source().set("alice", alice_script());
        sync.onboard("alice", Some("alice@example.com")).await.unwrap();

        // neither given nor fetched: kept
        let report = sync.refresh("alice", None).await.unwrap();
        assert_eq!(report.profile.email.as_deref(), Some("alice@example.com"));

        // fetched only: replaced
        let mut info = user("alice", 1500, Some(1500));
        info.email = Some(String::from("fetched@example.com"));
        sync.source().set(
            "alice",
            Script {
                profile: Some(info),
                ..alice_script()
            },
        );
        let report = sync.refresh("alice", None).await.unwrap();
        assert_eq!(report.profile.email.as_deref(), Some("fetched@example.com"));

        // given and fetched: the given one wins
        let report = sync.refresh("alice", Some("given@example.com")).await.unwrap();
        assert_eq!(report.profile.email.as_deref(), Some("given@example.com"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submissions_without_id_are_skipped() {
        let sync = synchronizer();
        let mut script = alice_script();
        script.submissions.push(crate::codeforces::model::Submission {
            id: None,
            creation_time_seconds: 1696000600,
            ..crate::codeforces::model::Submission::default()
        });
        sync.source().set("alice", script);

        let report = sync.onboard("alice", None).await.unwrap();

        assert_eq!(report.submission_count, 5);
        assert_eq!(report.submissions_inserted, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_cascades() {
        let sync = synchronizer();
        sync.source().set("alice", alice_script());
        sync.onboard("alice", None).await.unwrap();

        sync.remove("alice").await.unwrap();

        assert!(sync.store().find_profile("alice").await.unwrap().is_none());
        assert!(sync.store().find_contests("alice").await.unwrap().is_empty());
        assert_eq!(sync.store().count_submissions("alice").await.unwrap(), 0);
        assert!(matches!(
            sync.remove("alice").await,
            Err(SyncError::NotFound(_))
        ));
    }

    fn alice_renamed_script() -> Script {
        Script {
            profile: Some(user("alice_2", 1550, Some(1550))),
            rating: vec![contest("Codeforces Round 905", 1698000000, 1500, 1550)],
            submissions: vec![submission(10, 1698000100), submission(11, 1698000200)],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rename_moves_profile() {
        let sync = synchronizer();
        sync.source().set("alice", alice_script());
        sync.onboard("alice", Some("alice@example.com")).await.unwrap();
        sync.source().set("alice_2", alice_renamed_script());

        let report = sync.rename("alice", "alice_2", None).await.unwrap();

        assert_eq!(report.profile.handle, "alice_2");
        assert_eq!(report.profile.email.as_deref(), Some("alice@example.com"));
        assert_eq!(report.profile.max_rating, 1550);
        assert_eq!(report.contest_count, 1);
        assert_eq!(report.submissions_inserted, 2);

        assert!(sync.store().find_profile("alice").await.unwrap().is_none());
        assert!(sync.store().find_contests("alice").await.unwrap().is_empty());
        assert!(sync.store().submissions("alice").is_empty());
        assert_eq!(sync.store().find_contests("alice_2").await.unwrap().len(), 1);
        assert_eq!(sync.store().count_submissions("alice_2").await.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rename_to_unknown_handle_leaves_store_untouched() {
        let sync = synchronizer();
        sync.source().set("alice", alice_script());
        let before = sync.onboard("alice", None).await.unwrap().profile;

        let result = sync.rename("alice", "ghost", None).await;

        assert!(matches!(
            result,
            Err(SyncError::Profile(CodeforcesError::HandleNotFound(_, _)))
        ));
        assert_eq!(sync.store().find_profile("alice").await.unwrap(), Some(before));
        assert!(sync.store().find_profile("ghost").await.unwrap().is_none());
        assert_eq!(sync.store().find_contests("alice").await.unwrap().len(), 2);
        assert_eq!(sync.store().count_submissions("alice").await.unwrap(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rename_to_tracked_handle() {
        let sync = synchronizer();
        sync.source().set("alice", alice_script());
        sync.source().set("alice_2", alice_renamed_script());
        sync.onboard("alice", None).await.unwrap();
        sync.onboard("alice_2", None).await.unwrap();
        let calls = sync.source().call_count();

        let result = sync.rename("alice", "alice_2", None).await;

        assert!(matches!(result, Err(SyncError::AlreadyExists(ref handle)) if handle == "alice_2"));
        assert_eq!(sync.source().call_count(), calls);
        assert!(sync.store().find_profile("alice").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rename_validates_new_handle() {
        let sync = synchronizer();
        sync.source().set("alice", alice_script());
        sync.onboard("alice", None).await.unwrap();

        let result = sync.rename("alice", "no spaces allowed", None).await;

        assert!(matches!(result, Err(SyncError::InvalidHandle(_))));
        assert!(sync.store().find_profile("alice").await.unwrap().is_some());
    }
}
