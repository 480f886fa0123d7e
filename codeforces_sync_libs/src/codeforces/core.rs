use crate::codeforces::model::*;
use async_trait::async_trait;
use reqwest::{self, Client, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::time::Duration;

type Result<T> = std::result::Result<T, CodeforcesError>;

pub const DEFAULT_API_URL: &str = "https://codeforces.com/api/";

/// Codeforces allows roughly one request every two seconds per client.
pub const RATE_LIMIT_INTERVAL: Duration = Duration::from_millis(2200);

pub const DEFAULT_SUBMISSION_COUNT: u32 = 10000;

#[derive(Debug, Error)]
pub enum CodeforcesError {
    #[error("failed to request to Codeforces API")]
    RequestError(#[from] reqwest::Error),
    #[error("failed to deserialize JSON data")]
    DeserializeError(#[from] serde_json::Error),
    #[error("invalid Codeforces API url given")]
    InvalidUrlError(#[from] url::ParseError),
    #[error("invalid handle or user not found: {0}")]
    HandleNotFound(String, Option<String>),
    #[error("{0}")]
    UnexpectedError(String),
}

/// Read operations against the external profile source.
///
/// Only `fetch_profile` reports failures. The history endpoints degrade to an empty
/// sequence, since an unrated user legitimately has no contests.
///
/// Implementations do not space their own calls. Callers keep at least
/// [`RATE_LIMIT_INTERVAL`] between any two requests.
#[async_trait]
pub trait ProfileSource {
    async fn fetch_profile(&self, handle: &str) -> Result<UserInfo>;
    async fn fetch_rating_history(&self, handle: &str) -> Vec<RatingChange>;
    async fn fetch_submissions(&self, handle: &str, count: u32) -> Vec<Submission>;
}

pub struct CodeforcesClient {
    info_url: Url,
    rating_url: Url,
    status_url: Url,
    client: Client,
}

impl CodeforcesClient {
    pub fn new(api_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(api_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let info_url = base_url.join("user.info")?;
        let rating_url = base_url.join("user.rating")?;
        let status_url = base_url.join("user.status")?;

        let client = Client::builder()
            .gzip(true)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(CodeforcesClient {
            info_url,
            rating_url,
            status_url,
            client,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: &Url,
        params: &[(&str, &str)],
    ) -> Result<ApiResponse<T>> {
        let res = self.client.get(url.clone()).query(params).send().await?;
        let status = res.status();
        let body = res.text().await?;

        // A rejected call still carries the FAILED envelope (e.g. 400 with a comment).
        match serde_json::from_str::<ApiResponse<T>>(&body) {
            Ok(response) => Ok(response),
            Err(e) if status.is_success() => Err(CodeforcesError::DeserializeError(e)),
            Err(_) => Err(CodeforcesError::UnexpectedError(format!(
                "unexpected response [{}] from {}",
                status,
                url.path()
            ))),
        }
    }
}

#[async_trait]
impl ProfileSource for CodeforcesClient {
    async fn fetch_profile(&self, handle: &str) -> Result<UserInfo> {
        let response: ApiResponse<Vec<UserInfo>> =
            self.get(&self.info_url, &[("handles", handle)]).await?;

        if !response.is_ok() {
            let comment = response.comment;
            tracing::error!("Codeforces rejected handle {}: {:?}", handle, comment);
            return Err(CodeforcesError::HandleNotFound(String::from(handle), comment));
        }

        response
            .result
            .and_then(|users| users.into_iter().next())
            .ok_or(CodeforcesError::HandleNotFound(String::from(handle), None))
    }

    async fn fetch_rating_history(&self, handle: &str) -> Vec<RatingChange> {
        match self
            .get::<Vec<RatingChange>>(&self.rating_url, &[("handle", handle)])
            .await
        {
            Ok(response) if response.is_ok() => response.result.unwrap_or_default(),
            Ok(response) => {
                tracing::warn!(
                    "No rating history for {}: {}",
                    handle,
                    response.comment.unwrap_or_default()
                );
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("No rating history for {}: {:?}", handle, e);
                Vec::new()
            }
        }
    }

    async fn fetch_submissions(&self, handle: &str, count: u32) -> Vec<Submission> {
        let count = count.to_string();
        match self
            .get::<Vec<Submission>>(
                &self.status_url,
                &[("handle", handle), ("from", "1"), ("count", &count)],
            )
            .await
        {
            Ok(response) if response.is_ok() => response.result.unwrap_or_default(),
            Ok(response) => {
                tracing::warn!(
                    "No submissions found for {}: {}",
                    handle,
                    response.comment.unwrap_or_default()
                );
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("No submissions found for {}: {:?}", handle, e);
                Vec::new()
            }
        }
    }
}
