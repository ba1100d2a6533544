//! Pure Twitter v1.1 REST API client.
//!
//! A minimal client for the two endpoints a timeline crawler needs: paging
//! through a user's timeline and looking up a profile. Rate-limit windows are
//! slept through (up to a bound) and transient failures are retried with
//! exponential backoff, so callers only see errors that need a decision.
//!
//! # Example
//!
//! ```rust,ignore
//! use twitter_client::TwitterClient;
//!
//! let client = TwitterClient::new("bearer-token".into());
//!
//! let posts = client.timeline_since(783214, Some(1_500_000_000_000_000_000)).await?;
//! println!("{} new posts", posts.len());
//! ```

pub mod error;
pub mod types;

pub use error::{ErrorKind, Result, TwitterError};
pub use types::{RetryPolicy, User, UserLookup};

use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

const BASE_URL: &str = "https://api.twitter.com/1.1";

/// Maximum page size accepted by `statuses/user_timeline`.
const TIMELINE_PAGE_SIZE: u32 = 200;

pub struct TwitterClient {
    client: reqwest::Client,
    bearer_token: String,
    base_url: String,
    retry: RetryPolicy,
}

impl TwitterClient {
    pub fn new(bearer_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            bearer_token,
            base_url: BASE_URL.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    /// Point the client at a different API root (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch one page of a user's timeline, newest first.
    ///
    /// `since_id` excludes posts at or below that id; `max_id` excludes posts above it.
    pub async fn user_timeline_page(
        &self,
        user_id: u64,
        since_id: Option<u64>,
        max_id: Option<u64>,
    ) -> Result<Vec<Value>> {
        let mut query = vec![
            ("user_id", user_id.to_string()),
            ("count", TIMELINE_PAGE_SIZE.to_string()),
            ("include_rts", "true".to_string()),
            ("tweet_mode", "extended".to_string()),
        ];
        if let Some(since_id) = since_id {
            query.push(("since_id", since_id.to_string()));
        }
        if let Some(max_id) = max_id {
            query.push(("max_id", max_id.to_string()));
        }

        self.get_json("/statuses/user_timeline.json", &query).await
    }

    /// Fetch every post newer than `since_id` (or the whole reachable timeline when `None`).
    ///
    /// Pages backward from the newest post using `max_id` until the API returns an
    /// empty page. Posts are returned in the order the API produced them.
    pub async fn timeline_since(&self, user_id: u64, since_id: Option<u64>) -> Result<Vec<Value>> {
        let mut posts = Vec::new();
        let mut max_id = None;

        loop {
            let page = self.user_timeline_page(user_id, since_id, max_id).await?;
            let oldest = page.iter().filter_map(post_id).min();
            let page_len = page.len();
            posts.extend(page);

            tracing::debug!(user_id, page_len, total = posts.len(), "Fetched timeline page");

            match oldest {
                Some(oldest) if oldest > 0 => {
                    if since_id.is_some_and(|since| oldest <= since.saturating_add(1)) {
                        break;
                    }
                    max_id = Some(oldest - 1);
                }
                _ => break,
            }
        }

        Ok(posts)
    }

    /// Look up a user profile by id or screen name.
    pub async fn lookup_user(&self, lookup: &UserLookup) -> Result<User> {
        let (key, value) = lookup.query();
        self.get_json("/users/show.json", &[(key, value)]).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0;
        let mut rate_limit_waits = 0;

        loop {
            let sent = self
                .client
                .get(&url)
                .bearer_auth(&self.bearer_token)
                .query(query)
                .send()
                .await;

            let error = match sent {
                Ok(resp) if resp.status().is_success() => {
                    let body = resp.bytes().await?;
                    return Ok(serde_json::from_slice(&body)?);
                }
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    let reset_at = rate_limit_reset(resp.headers());
                    let body = resp.text().await.unwrap_or_default();
                    let error = TwitterError::from_response(status, &body);

                    if error.kind() == ErrorKind::RateLimited {
                        if rate_limit_waits >= self.retry.max_rate_limit_waits {
                            return Err(TwitterError::RateLimited { reset_at });
                        }
                        rate_limit_waits += 1;
                        let wait = self.rate_limit_sleep(reset_at);
                        tracing::warn!(
                            path,
                            wait_secs = wait.as_secs(),
                            rate_limit_waits,
                            "Rate limited, sleeping until window resets"
                        );
                        tokio::time::sleep(wait).await;
                        continue;
                    }
                    error
                }
                Err(e) => TwitterError::Http(e),
            };

            if error.kind() == ErrorKind::Transient && attempt < self.retry.max_retries {
                attempt += 1;
                let delay = self.retry.backoff(attempt);
                tracing::warn!(
                    path,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Transient API failure, retrying"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            return Err(error);
        }
    }

    fn rate_limit_sleep(&self, reset_at: Option<DateTime<Utc>>) -> Duration {
        let wait = reset_at
            .map(|reset| (reset - Utc::now()).to_std().unwrap_or(Duration::ZERO))
            .map(|d| d + Duration::from_secs(1))
            .unwrap_or(self.retry.max_rate_limit_sleep);
        wait.clamp(Duration::from_secs(1), self.retry.max_rate_limit_sleep)
    }
}

fn post_id(post: &Value) -> Option<u64> {
    post.get("id").and_then(Value::as_u64).or_else(|| {
        post.get("id_str")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    })
}

fn rate_limit_reset(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let epoch: i64 = headers
        .get("x-rate-limit-reset")?
        .to_str()
        .ok()?
        .parse()
        .ok()?;
    Utc.timestamp_opt(epoch, 0).single()
}
