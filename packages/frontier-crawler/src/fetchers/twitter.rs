//! [`PostFetcher`] backed by the Twitter v1.1 REST client.

use async_trait::async_trait;
use serde_json::Value;
use twitter_client::{ErrorKind, TwitterClient, TwitterError};

use crate::error::{FetchError, FetchResult, UnavailableReason};
use crate::traits::fetcher::PostFetcher;
use crate::types::account::AccountId;
use crate::types::post::Post;

pub struct TwitterFetcher {
    client: TwitterClient,
}

impl TwitterFetcher {
    pub fn new(client: TwitterClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &TwitterClient {
        &self.client
    }
}

#[async_trait]
impl PostFetcher for TwitterFetcher {
    async fn fetch_since(&self, account: AccountId, since: Option<u64>) -> FetchResult<Vec<Post>> {
        let raw = self
            .client
            .timeline_since(account.0, since)
            .await
            .map_err(|e| map_error(account, e))?;
        Ok(parse_posts(account, raw))
    }
}

/// Keep the posts the crawler can read. Malformed objects are logged and dropped.
pub(crate) fn parse_posts(account: AccountId, raw: Vec<Value>) -> Vec<Post> {
    raw.into_iter()
        .filter_map(|value| match Post::from_json(value) {
            Ok(post) => Some(post),
            Err(e) => {
                tracing::warn!(account_id = %account, error = %e, "Dropping malformed post");
                None
            }
        })
        .collect()
}

pub(crate) fn map_error(account: AccountId, error: TwitterError) -> FetchError {
    let mapped = match error.kind() {
        ErrorKind::NotFound => FetchError::Unavailable(UnavailableReason::NotFound),
        ErrorKind::Suspended => FetchError::Unavailable(UnavailableReason::Suspended),
        ErrorKind::Unauthorized => FetchError::Unavailable(UnavailableReason::Unauthorized),
        ErrorKind::RateLimited => FetchError::QuotaExhausted,
        ErrorKind::Transient => FetchError::Transient(error.to_string()),
        ErrorKind::Other => FetchError::Fatal(error.to_string()),
    };
    tracing::debug!(account_id = %account, error = %error, mapped = %mapped, "Timeline fetch failed");
    mapped
}
