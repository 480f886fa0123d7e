use crate::codeforces::model::{RatingChange, Submission};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use sqlx::FromRow;

pub const UNRATED: &str = "unrated";
pub const UNKNOWN_CONTEST: &str = "Unknown Contest";
pub const ACCEPTED: &str = "OK";

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub handle: String,               // ハンドル名
    pub first_name: String,           // 名
    pub last_name: String,            // 姓
    pub email: Option<String>,        // 通知先アドレス
    pub rank: String,                 // ランク
    pub rating: i32,                  // レート
    pub max_rating: i32,              // 最高レート
    pub avatar: String,               // アバター画像
    pub friend_of_count: Option<i32>, // フォロワー数
    pub last_sync_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Address an inactivity notice can be sent to, if any.
    pub fn address(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }

    pub fn display_name(&self) -> &str {
        if self.first_name.trim().is_empty() {
            &self.handle
        } else {
            &self.first_name
        }
    }
}

/// Fields the synchronizer writes on every pass.
///
/// `email: None` leaves the stored address untouched on update.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfileFields {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub rank: String,
    pub rating: i32,
    pub max_rating: i32,
    pub avatar: String,
    pub friend_of_count: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ContestResult {
    pub handle: String,
    pub contest_name: String,
    pub rank: i32,
    pub old_rating: i32,
    pub new_rating: i32,
    pub contest_time: DateTime<Utc>,
}

impl ContestResult {
    pub fn from_rating_change(handle: &str, change: &RatingChange) -> Self {
        Self {
            handle: String::from(handle),
            contest_name: change
                .contest_name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or(String::from(UNKNOWN_CONTEST)),
            rank: change.rank.unwrap_or(0),
            old_rating: change.old_rating.unwrap_or(0),
            new_rating: change.new_rating.unwrap_or(0),
            contest_time: epoch_to_datetime(change.rating_update_time_seconds),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProblemDescriptor {
    pub contest_id: Option<i64>,
    pub index: String,
    pub name: String,
    pub problem_type: String,
    pub rating: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub handle: String,
    pub submission_id: i64,
    pub contest_id: Option<i64>,
    pub creation_time_seconds: i64,
    pub problem: ProblemDescriptor,
    pub programming_language: String,
    pub verdict: String,
}

impl SubmissionRecord {
    /// Maps an API submission, or `None` when it carries no id.
    pub fn from_submission(handle: &str, submission: &Submission) -> Option<Self> {
        let submission_id = submission.id?;
        let problem = submission.problem.clone().unwrap_or_default();

        Some(Self {
            handle: String::from(handle),
            submission_id,
            contest_id: submission.contest_id,
            creation_time_seconds: submission.creation_time_seconds,
            problem: ProblemDescriptor {
                contest_id: problem.contest_id,
                index: problem.index.unwrap_or_default(),
                name: problem.name.unwrap_or_default(),
                problem_type: problem.problem_type.unwrap_or_default(),
                rating: problem.rating,
            },
            programming_language: submission.programming_language.clone().unwrap_or_default(),
            verdict: submission.verdict.clone().unwrap_or_default(),
        })
    }
}

/// Flat row shape of `submission_records`.
#[derive(Debug, FromRow)]
pub struct SubmissionRow {
    pub handle: String,
    pub submission_id: i64,
    pub contest_id: Option<i64>,
    pub creation_time_seconds: i64,
    pub problem_contest_id: Option<i64>,
    pub problem_index: String,
    pub problem_name: String,
    pub problem_type: String,
    pub problem_rating: Option<i32>,
    pub programming_language: String,
    pub verdict: String,
}

impl From<SubmissionRow> for SubmissionRecord {
    fn from(row: SubmissionRow) -> Self {
        Self {
            handle: row.handle,
            submission_id: row.submission_id,
            contest_id: row.contest_id,
            creation_time_seconds: row.creation_time_seconds,
            problem: ProblemDescriptor {
                contest_id: row.problem_contest_id,
                index: row.problem_index,
                name: row.problem_name,
                problem_type: row.problem_type,
                rating: row.problem_rating,
            },
            programming_language: row.programming_language,
            verdict: row.verdict,
        }
    }
}

/// Result of a best-effort bulk insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InsertOutcome {
    pub attempted: usize,
    pub inserted: usize,
}

pub fn epoch_to_datetime(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
