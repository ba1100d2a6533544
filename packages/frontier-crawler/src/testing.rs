//! Testing utilities including mock implementations.
//!
//! These let applications exercise a full crawl cycle without network access.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{FetchError, FetchResult};
use crate::traits::fetcher::PostFetcher;
use crate::types::account::AccountId;
use crate::types::post::Post;

/// A mock fetcher serving predefined timelines.
///
/// Posts are filtered by the cursor the same way the real API does: only ids
/// strictly greater than `since` are returned.
#[derive(Default, Clone)]
pub struct MockFetcher {
    /// Posts by author
    timelines: Arc<RwLock<HashMap<AccountId, Vec<Post>>>>,

    /// Accounts that fail, and how
    errors: Arc<RwLock<HashMap<AccountId, FetchError>>>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockFetchCall>>>,
}

/// Record of a call made to the mock fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockFetchCall {
    pub account: AccountId,
    pub since: Option<u64>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add posts to an account's timeline.
    pub fn with_timeline(self, account: impl Into<AccountId>, posts: impl IntoIterator<Item = Post>) -> Self {
        self.timelines
            .write()
            .unwrap()
            .entry(account.into())
            .or_default()
            .extend(posts);
        self
    }

    /// Make every fetch of `account` fail with `error`.
    pub fn with_error(self, account: impl Into<AccountId>, error: FetchError) -> Self {
        self.errors.write().unwrap().insert(account.into(), error);
        self
    }

    /// Add a post after construction, e.g. between two cycles.
    pub fn push_post(&self, post: Post) {
        self.timelines
            .write()
            .unwrap()
            .entry(post.author_id())
            .or_default()
            .push(post);
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockFetchCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn fetched_accounts(&self) -> Vec<AccountId> {
        self.calls().into_iter().map(|c| c.account).collect()
    }
}

#[async_trait]
impl PostFetcher for MockFetcher {
    async fn fetch_since(&self, account: AccountId, since: Option<u64>) -> FetchResult<Vec<Post>> {
        self.calls
            .write()
            .unwrap()
            .push(MockFetchCall { account, since });

        if let Some(error) = self.errors.read().unwrap().get(&account) {
            return Err(error.clone());
        }

        let posts = self
            .timelines
            .read()
            .unwrap()
            .get(&account)
            .map(|posts| {
                posts
                    .iter()
                    .filter(|p| since.map_or(true, |s| p.id > s))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(posts)
    }
}

/// Builds posts shaped like the v1.1 API objects.
#[derive(Debug, Clone)]
pub struct PostBuilder {
    id: u64,
    author_id: u64,
    author_name: String,
    created_at: DateTime<Utc>,
    text: String,
    reply_to: Option<(u64, String)>,
    repost_of: Option<(u64, String)>,
}

impl PostBuilder {
    pub fn new(id: u64, author_id: u64) -> Self {
        Self {
            id,
            author_id,
            author_name: format!("user{author_id}"),
            created_at: Utc.with_ymd_and_hms(2018, 10, 10, 20, 19, 24).unwrap(),
            text: String::new(),
            reply_to: None,
            repost_of: None,
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn author_name(mut self, name: impl Into<String>) -> Self {
        self.author_name = name.into();
        self
    }

    pub fn reply_to(mut self, account_id: u64, screen_name: impl Into<String>) -> Self {
        self.reply_to = Some((account_id, screen_name.into()));
        self
    }

    pub fn repost_of(mut self, account_id: u64, screen_name: impl Into<String>) -> Self {
        self.repost_of = Some((account_id, screen_name.into()));
        self
    }

    pub fn to_json(&self) -> Value {
        let mut raw = json!({
            "id": self.id,
            "id_str": self.id.to_string(),
            "created_at": self.created_at.format("%a %b %d %H:%M:%S +0000 %Y").to_string(),
            "full_text": self.text,
            "user": {"id": self.author_id, "screen_name": self.author_name},
            "in_reply_to_user_id": null,
            "in_reply_to_screen_name": null,
        });
        if let Some((id, name)) = &self.reply_to {
            raw["in_reply_to_user_id"] = json!(id);
            raw["in_reply_to_screen_name"] = json!(name);
        }
        if let Some((id, name)) = &self.repost_of {
            raw["retweeted_status"] = json!({
                "id": self.id.saturating_sub(1),
                "user": {"id": id, "screen_name": name},
            });
        }
        raw
    }

    pub fn build(self) -> Post {
        Post::from_json(self.to_json()).expect("PostBuilder produces valid posts")
    }
}
