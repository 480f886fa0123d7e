pub mod batch;
pub mod lock;
pub mod pacer;
pub mod user;

#[cfg(test)]
pub(crate) mod testing;

pub use self::{batch::BatchReport, lock::HandleLocks, pacer::Pacer, user::Synchronizer};

use crate::{
    activity::DEFAULT_INACTIVITY_DAYS,
    codeforces::{CodeforcesError, DEFAULT_SUBMISSION_COUNT, RATE_LIMIT_INTERVAL},
    store::{model::Profile, StoreError},
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tokio::time::Duration;
use validator::Validate;

pub type Result<T> = std::result::Result<T, SyncError>;

static HANDLE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").unwrap());

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Minimum spacing between two external requests.
    pub request_interval: Duration,
    /// Extra pause between two users of a batch.
    pub user_interval: Duration,
    pub submission_count: u32,
    pub inactivity_days: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            request_interval: RATE_LIMIT_INTERVAL,
            user_interval: Duration::from_millis(1000),
            submission_count: DEFAULT_SUBMISSION_COUNT,
            inactivity_days: DEFAULT_INACTIVITY_DAYS,
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid handle: {0}")]
    InvalidHandle(String),
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
    #[error("user not found: {0}")]
    NotFound(String),
    #[error("user is already added: {0}")]
    AlreadyExists(String),
    #[error("failed to fetch user info: {0}")]
    Profile(#[source] CodeforcesError),
    #[error("storage failure: {0}")]
    Store(#[source] StoreError),
    #[error("unable to add user {handle}")]
    OnboardFailed {
        handle: String,
        #[source]
        source: Box<SyncError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    NotFound,
    Internal,
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Internal => 500,
        }
    }
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::InvalidHandle(_)
            | SyncError::InvalidEmail(_)
            | SyncError::AlreadyExists(_) => ErrorKind::BadRequest,
            SyncError::NotFound(_) | SyncError::Profile(CodeforcesError::HandleNotFound(_, _)) => {
                ErrorKind::NotFound
            }
            SyncError::Profile(_) | SyncError::Store(_) => ErrorKind::Internal,
            SyncError::OnboardFailed { source, .. } => match source.kind() {
                ErrorKind::NotFound => ErrorKind::NotFound,
                _ => ErrorKind::Internal,
            },
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(handle) => SyncError::AlreadyExists(handle),
            StoreError::NotFound(handle) => SyncError::NotFound(handle),
            e => SyncError::Store(e),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub profile: Profile,
    pub contest_count: usize,
    /// Size of the attempted submission batch.
    pub submission_count: usize,
    /// Submissions that were actually stored.
    pub submissions_inserted: usize,
}

#[derive(Debug, Validate)]
pub(crate) struct SyncRequest {
    #[validate(length(min = 3, max = 24), regex = "HANDLE_PATTERN")]
    pub handle: String,
    #[validate(email)]
    pub email: Option<String>,
}

impl SyncRequest {
    pub(crate) fn parse(handle: &str, email: Option<&str>) -> Result<Self> {
        let request = Self {
            handle: String::from(handle.trim()),
            email: email
                .map(str::trim)
                .filter(|email| !email.is_empty())
                .map(String::from),
        };

        match request.validate() {
            Ok(()) => Ok(request),
            Err(e) if e.field_errors().contains_key("handle") => {
                Err(SyncError::InvalidHandle(request.handle))
            }
            Err(_) => Err(SyncError::InvalidEmail(request.email.unwrap_or_default())),
        }
    }
}
