//! One JSON Lines file per day.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::error::{SinkError, SinkResult};
use crate::traits::sink::PostSink;
use crate::types::post::{Post, DAY_KEY_FORMAT};

/// Appends each post's raw API object as one line of `<dir>/<day_key>.jsonl`.
///
/// Files are only ever appended to, so posts from earlier cycles survive.
#[derive(Debug, Clone)]
pub struct DailyFileSink {
    dir: PathBuf,
}

impl DailyFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn day_path(&self, day_key: &str) -> SinkResult<PathBuf> {
        validate_day_key(day_key)?;
        Ok(self.dir.join(format!("{day_key}.jsonl")))
    }
}

/// Day keys become file names, so only canonical dates are accepted.
fn validate_day_key(day_key: &str) -> SinkResult<()> {
    let canonical = NaiveDate::parse_from_str(day_key, DAY_KEY_FORMAT)
        .ok()
        .map(|d| d.format(DAY_KEY_FORMAT).to_string());
    match canonical {
        Some(c) if c == day_key => Ok(()),
        _ => Err(SinkError::InvalidDayKey(day_key.to_string())),
    }
}

#[async_trait]
impl PostSink for DailyFileSink {
    async fn append(&self, day_key: &str, post: &Post) -> SinkResult<()> {
        let path = self.day_path(day_key)?;

        let mut line = serde_json::to_vec(&post.raw)?;
        line.push(b'\n');

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| SinkError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let io_error = |source: std::io::Error| SinkError::Io {
            path: path.clone(),
            source,
        };
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(io_error)?;
        file.write_all(&line).await.map_err(io_error)?;
        file.flush().await.map_err(io_error)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::PostBuilder;

    #[tokio::test]
    async fn test_appends_one_line_per_post() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DailyFileSink::new(dir.path().join("posts"));

        let first = PostBuilder::new(1, 10).text("first").build();
        let second = PostBuilder::new(2, 10).text("second").build();
        sink.append("2018-10-10", &first).await.unwrap();
        sink.append("2018-10-10", &second).await.unwrap();

        let contents = std::fs::read_to_string(dir.path().join("posts/2018-10-10.jsonl")).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], first.raw);
        assert_eq!(lines[1]["full_text"], "second");
    }

    #[tokio::test]
    async fn test_existing_file_is_appended_not_replaced() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("2020-01-01.jsonl"), "{\"earlier\":true}\n").unwrap();
        let sink = DailyFileSink::new(dir.path());

        sink.append("2020-01-01", &PostBuilder::new(1, 1).build())
            .await
            .unwrap();

        let contents = std::fs::read_to_string(dir.path().join("2020-01-01.jsonl")).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.starts_with("{\"earlier\":true}"));
    }

    #[tokio::test]
    async fn test_rejects_non_date_keys() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DailyFileSink::new(dir.path());
        let post = PostBuilder::new(1, 1).build();

        for key in ["../escape", "2020-1-1", "2020-02-30", ""] {
            assert!(
                matches!(sink.append(key, &post).await, Err(SinkError::InvalidDayKey(_))),
                "accepted {key:?}"
            );
        }
    }
}
