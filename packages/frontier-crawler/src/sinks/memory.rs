//! In-memory sink for tests and dry runs.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, RwLock};

use crate::error::{SinkError, SinkResult};
use crate::traits::sink::PostSink;
use crate::types::post::Post;

#[derive(Debug, Clone, PartialEq)]
pub struct SinkEntry {
    pub day_key: String,
    pub post_id: u64,
    pub raw: Value,
}

/// Keeps appended posts in memory, or refuses every append when failing.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    entries: Arc<RwLock<Vec<SinkEntry>>>,
    failing: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose storage is unavailable.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn entries(&self) -> Vec<SinkEntry> {
        self.entries
            .read()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PostSink for MemorySink {
    async fn append(&self, day_key: &str, post: &Post) -> SinkResult<()> {
        let unavailable = |reason: &str| SinkError::Io {
            path: format!("memory://{day_key}").into(),
            source: std::io::Error::other(reason.to_string()),
        };
        if self.failing {
            return Err(unavailable("sink is failing"));
        }

        let mut entries = self
            .entries
            .write()
            .map_err(|_| unavailable("lock poisoned"))?;
        entries.push(SinkEntry {
            day_key: day_key.to_string(),
            post_id: post.id,
            raw: post.raw.clone(),
        });
        Ok(())
    }
}
