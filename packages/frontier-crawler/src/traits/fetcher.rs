//! Post fetcher trait.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::FetchResult;
use crate::types::account::AccountId;
use crate::types::post::Post;

/// Source of an account's posts.
#[async_trait]
pub trait PostFetcher: Send + Sync {
    /// Fetch the posts of `account` with an id strictly greater than
    /// `since`, or the most recent page when `since` is `None`.
    ///
    /// Order is not guaranteed. Implementations retry transient failures
    /// themselves and report what is left as a [`FetchError`](crate::FetchError).
    async fn fetch_since(&self, account: AccountId, since: Option<u64>) -> FetchResult<Vec<Post>>;
}

#[async_trait]
impl<T: PostFetcher + ?Sized> PostFetcher for Arc<T> {
    async fn fetch_since(&self, account: AccountId, since: Option<u64>) -> FetchResult<Vec<Post>> {
        (**self).fetch_since(account, since).await
    }
}

#[async_trait]
impl<T: PostFetcher + ?Sized> PostFetcher for Box<T> {
    async fn fetch_since(&self, account: AccountId, since: Option<u64>) -> FetchResult<Vec<Post>> {
        (**self).fetch_since(account, since).await
    }
}
