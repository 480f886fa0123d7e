use crate::store::model::Profile;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Url};
use serde::Serialize;
use thiserror::Error;
use tokio::time::Duration;

static TAG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n+").unwrap());

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to request to mail relay")]
    RequestError(#[from] reqwest::Error),
    #[error("invalid mail relay url given")]
    InvalidUrlError(#[from] url::ParseError),
    #[error("mail relay rejected the message: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InactivityNotice {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl InactivityNotice {
    /// Composes the notice for `profile`, or `None` when it has no address.
    pub fn compose(profile: &Profile, window_days: i64) -> Option<Self> {
        let to = profile.address()?;
        let html = format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
<h1>Hey {name}!</h1>
<p>We noticed you haven't been active on Codeforces for the past {days} days.</p>
<p>Don't let your skills get rusty. A few ways to get back on track:</p>
<ul>
<li>Solve a problem from your favorite rating range</li>
<li>Participate in the next contest</li>
<li>Try problems from a new topic or algorithm</li>
<li>Challenge yourself with a harder problem</li>
</ul>
<p><a href="https://codeforces.com/profile/{handle}">Visit your profile</a></p>
<p>Keep coding, keep growing!</p>
</div>"#,
            name = profile.display_name(),
            days = window_days,
            handle = profile.handle,
        );
        let text = strip_tags(&html);

        Some(Self {
            to: String::from(to),
            subject: String::from("Time to get back to coding!"),
            html,
            text,
        })
    }
}

fn strip_tags(html: &str) -> String {
    let text = TAG_PATTERN.replace_all(html, "");
    BLANK_LINES.replace_all(text.trim(), "\n").into_owned()
}

/// Delivery transport of inactivity notices.
#[async_trait]
pub trait Notifier {
    async fn send(&self, notice: &InactivityNotice) -> Result<(), NotifyError>;
}

#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    #[serde(flatten)]
    notice: &'a InactivityNotice,
}

/// Posts notices as JSON to an HTTP mail relay.
pub struct MailRelayNotifier {
    url: Url,
    from: String,
    token: Option<String>,
    client: Client,
}

impl MailRelayNotifier {
    pub fn new(url: &str, from: &str, token: Option<String>) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            url: Url::parse(url)?,
            from: String::from(from),
            token,
            client,
        })
    }
}

#[async_trait]
impl Notifier for MailRelayNotifier {
    async fn send(&self, notice: &InactivityNotice) -> Result<(), NotifyError> {
        let message = RelayMessage {
            from: &self.from,
            notice,
        };
        let mut request = self.client.post(self.url.clone()).json(&message);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let res = request.send().await?;
        match res.error_for_status_ref() {
            Ok(_) => Ok(()),
            Err(e) => {
                let body = res.text().await.unwrap_or_default();
                Err(NotifyError::Rejected(format!("{} cause [{}]", e, body)))
            }
        }
    }
}

/// Logs notices instead of delivering them.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notice: &InactivityNotice) -> Result<(), NotifyError> {
        tracing::info!(
            "Inactivity notice for {} (no mail relay configured): {}",
            notice.to,
            notice.subject
        );
        Ok(())
    }
}

/// Sends an inactivity notice to `profile`. Returns whether the notice was delivered.
///
/// Never fails: a missing address or a delivery error is only logged.
pub async fn notify_inactive<N>(notifier: &N, profile: &Profile, window_days: i64) -> bool
where
    N: Notifier + Sync + ?Sized,
{
    let notice = match InactivityNotice::compose(profile, window_days) {
        Some(notice) => notice,
        None => {
            tracing::info!("No email found for user: {}", profile.handle);
            return false;
        }
    };

    match notifier.send(&notice).await {
        Ok(()) => {
            tracing::info!("Inactivity email sent to {} ({})", profile.handle, notice.to);
            true
        }
        Err(e) => {
            tracing::error!(
                "Failed to send inactivity email to {}: {:?}",
                profile.handle,
                e
            );
            false
        }
    }
}
