//! Canonical CSV layout of the score store.
//!
//! Header: `user_id,screen_name,since_id,last_update,score`. A `since_id` of 0
//! means never fetched and an empty `last_update` means never updated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::migration::{detect_schema, SchemaVersion};
use super::ScoreStore;
use crate::error::{StoreError, StoreResult};
use crate::types::account::{AccountId, AccountRecord};

pub const CANONICAL_HEADER: [&str; 5] = ["user_id", "screen_name", "since_id", "last_update", "score"];

/// Cursor value written for accounts that were never fetched.
const NEVER_FETCHED: u64 = 0;

#[derive(Debug, Serialize, Deserialize)]
struct CanonicalRow {
    user_id: u64,
    screen_name: String,
    since_id: u64,
    last_update: Option<DateTime<Utc>>,
    score: f64,
}

impl From<&AccountRecord> for CanonicalRow {
    fn from(record: &AccountRecord) -> Self {
        Self {
            user_id: record.account_id.0,
            screen_name: record.display_name.clone(),
            since_id: record.cursor.unwrap_or(NEVER_FETCHED),
            last_update: record.last_update,
            score: record.score,
        }
    }
}

impl From<CanonicalRow> for AccountRecord {
    fn from(row: CanonicalRow) -> Self {
        Self {
            account_id: AccountId(row.user_id),
            display_name: row.screen_name,
            cursor: (row.since_id != NEVER_FETCHED).then_some(row.since_id),
            last_update: row.last_update,
            score: row.score,
        }
    }
}

pub(crate) fn read_store(path: &Path) -> StoreResult<ScoreStore> {
    let mut reader = ::csv::Reader::from_path(path).map_err(|e| open_error(path, e))?;

    let headers = reader
        .headers()
        .map_err(|e| StoreError::corrupt(path, e.to_string()))?
        .clone();

    match detect_schema(&headers) {
        Some(SchemaVersion::V3) => {}
        Some(version) => {
            return Err(StoreError::OutdatedSchema {
                path: path.to_path_buf(),
                version,
            })
        }
        None => {
            return Err(StoreError::corrupt(
                path,
                format!("unrecognised header `{}`", headers.iter().collect::<Vec<_>>().join(",")),
            ))
        }
    }

    let mut store = ScoreStore::new();
    for (index, row) in reader.deserialize::<CanonicalRow>().enumerate() {
        let row = row.map_err(|e| row_error(path, &e))?;
        if !row.score.is_finite() {
            return Err(StoreError::corrupt(
                path,
                format!("line {}: non-finite score `{}`", index + 2, row.score),
            ));
        }
        let record = AccountRecord::from(row);
        let id = record.account_id;
        if !store.insert_new(record) {
            return Err(StoreError::corrupt(path, format!("duplicate account id {id}")));
        }
    }

    Ok(store)
}

/// Write the store to `path` through a temporary sibling, replacing the file atomically.
pub(crate) fn write_store(store: &ScoreStore, path: &Path) -> StoreResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let tmp = tmp_path(path);
    {
        let mut writer = ::csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&tmp)
            .map_err(|e| open_error(&tmp, e))?;
        writer.write_record(CANONICAL_HEADER)?;
        for record in store.records() {
            writer.serialize(CanonicalRow::from(record))?;
        }
        writer.flush().map_err(|e| StoreError::io(&tmp, e))?;
    }

    fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn open_error(path: &Path, err: ::csv::Error) -> StoreError {
    match err.into_kind() {
        ::csv::ErrorKind::Io(source) => StoreError::io(path, source),
        other => StoreError::corrupt(path, format!("{other:?}")),
    }
}

fn row_error(path: &Path, err: &::csv::Error) -> StoreError {
    match err.position() {
        Some(pos) => StoreError::corrupt(path, format!("line {}: {}", pos.line(), err)),
        None => StoreError::corrupt(path, err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn write(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("accounts.csv");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_round_trip_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores").join("accounts.csv");

        let mut fetched = AccountRecord::seeded(1050118621198921728, "name, with comma");
        fetched.cursor = Some(1050118621198921999);
        fetched.last_update = Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
        fetched.score = 0.1 + 0.2;
        let discovered =
            AccountRecord::discovered(&crate::AccountRef::new(42, None));

        let store: ScoreStore = [fetched.clone(), discovered.clone()].into_iter().collect();
        write_store(&store, &path).unwrap();

        let loaded = read_store(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get(fetched.account_id), Some(&fetched));
        assert_eq!(loaded.get(discovered.account_id), Some(&discovered));
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn test_empty_store_keeps_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.csv");
        write_store(&ScoreStore::new(), &path).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap().trim(),
            "user_id,screen_name,since_id,last_update,score"
        );
        assert!(read_store(&path).unwrap().is_empty());
    }

    #[test]
    fn test_unparsable_score_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "user_id,screen_name,since_id,last_update,score\n1,a,0,,high\n",
        );
        let err = read_store(&path).unwrap_err();
        match err {
            StoreError::CorruptStore { reason, .. } => assert!(reason.contains("line 2"), "{reason}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_finite_score_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        for (value, line) in [("NaN", 3), ("inf", 3), ("-inf", 3)] {
            let path = write(
                dir.path(),
                &format!("user_id,screen_name,since_id,last_update,score\n1,a,0,,0.5\n2,b,0,,{value}\n"),
            );
            match read_store(&path).unwrap_err() {
                StoreError::CorruptStore { reason, .. } => {
                    assert!(reason.starts_with(&format!("line {line}")), "{reason}");
                    assert!(reason.contains("non-finite"), "{reason}");
                }
                other => panic!("unexpected error for {value}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_missing_columns_are_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "user_id,score\n1,0.5\n");
        assert!(matches!(
            read_store(&path),
            Err(StoreError::CorruptStore { .. })
        ));
    }

    #[test]
    fn test_duplicate_ids_are_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "user_id,screen_name,since_id,last_update,score\n1,a,0,,0.5\n1,a,0,,-1\n",
        );
        assert!(matches!(
            read_store(&path),
            Err(StoreError::CorruptStore { .. })
        ));
    }

    #[test]
    fn test_older_schema_is_reported_not_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "user_id,screen_name,since_id,score\n1,a,0,0.5\n");
        assert!(matches!(
            read_store(&path),
            Err(StoreError::OutdatedSchema {
                version: SchemaVersion::V1,
                ..
            })
        ));
    }
}
