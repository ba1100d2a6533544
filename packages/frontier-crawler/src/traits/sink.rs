//! Post sink trait.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::SinkResult;
use crate::types::post::Post;

/// Append-only destination for fetched posts, grouped by day.
#[async_trait]
pub trait PostSink: Send + Sync {
    /// Record `post` under `day_key` (`YYYY-MM-DD`).
    async fn append(&self, day_key: &str, post: &Post) -> SinkResult<()>;
}

#[async_trait]
impl<T: PostSink + ?Sized> PostSink for Arc<T> {
    async fn append(&self, day_key: &str, post: &Post) -> SinkResult<()> {
        (**self).append(day_key, post).await
    }
}
