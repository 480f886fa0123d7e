use crate::{
    codeforces::{model::*, CodeforcesError, ProfileSource},
    notify::{InactivityNotice, Notifier, NotifyError},
};
use async_trait::async_trait;
use std::{collections::HashMap, sync::Mutex};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Info,
    Rating,
    Status,
}

#[derive(Debug, Clone, Default)]
pub struct Script {
    pub profile: Option<UserInfo>,
    pub rating: Vec<RatingChange>,
    pub submissions: Vec<Submission>,
}

/// Profile source answering from per-handle scripts and recording every call.
#[derive(Default)]
pub struct ScriptedSource {
    scripts: Mutex<HashMap<String, Script>>,
    pub calls: Mutex<Vec<(String, Endpoint, Instant)>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, handle: &str, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .insert(String::from(handle), script);
    }

    fn script(&self, handle: &str, endpoint: Endpoint) -> Script {
        self.calls
            .lock()
            .unwrap()
            .push((String::from(handle), endpoint, Instant::now()));
        self.scripts
            .lock()
            .unwrap()
            .get(handle)
            .cloned()
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ProfileSource for ScriptedSource {
    async fn fetch_profile(&self, handle: &str) -> Result<UserInfo, CodeforcesError> {
        self.script(handle, Endpoint::Info)
            .profile
            .ok_or(CodeforcesError::HandleNotFound(String::from(handle), None))
    }

    async fn fetch_rating_history(&self, handle: &str) -> Vec<RatingChange> {
        self.script(handle, Endpoint::Rating).rating
    }

    async fn fetch_submissions(&self, handle: &str, count: u32) -> Vec<Submission> {
        let mut submissions = self.script(handle, Endpoint::Status).submissions;
        submissions.truncate(count as usize);
        submissions
    }
}

pub fn user(handle: &str, rating: i32, max_rating: Option<i32>) -> UserInfo {
    UserInfo {
        handle: String::from(handle),
        first_name: Some(String::from("Alice")),
        last_name: Some(String::from("Liddell")),
        rank: Some(String::from("specialist")),
        rating: Some(rating),
        max_rating,
        avatar: Some(String::from("https://userpic.codeforces.org/no-avatar.jpg")),
        ..UserInfo::default()
    }
}

pub fn contest(name: &str, time: i64, old_rating: i32, new_rating: i32) -> RatingChange {
    RatingChange {
        contest_name: Some(String::from(name)),
        rank: Some(100),
        old_rating: Some(old_rating),
        new_rating: Some(new_rating),
        rating_update_time_seconds: time,
        ..RatingChange::default()
    }
}

pub fn submission(id: i64, time: i64) -> Submission {
    Submission {
        id: Some(id),
        contest_id: Some(1881),
        creation_time_seconds: time,
        problem: Some(Problem {
            contest_id: Some(1881),
            index: Some(String::from("A")),
            name: Some(String::from("Don't Try to Count")),
            problem_type: Some(String::from("PROGRAMMING")),
            rating: Some(800),
        }),
        programming_language: Some(String::from("Rust 2021")),
        verdict: Some(String::from("OK")),
    }
}

/// Notifier recording every notice, optionally failing all deliveries.
#[derive(Default)]
pub struct RecordingNotifier {
    pub fail: bool,
    pub sent: Mutex<Vec<InactivityNotice>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notice: &InactivityNotice) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Rejected(String::from("relay unavailable")));
        }
        self.sent.lock().unwrap().push(notice.clone());
        Ok(())
    }
}
