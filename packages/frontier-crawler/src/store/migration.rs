//! Versioned upgrades for score stores written by older layouts.
//!
//! | Version | Header | Cursor sentinel | Notes |
//! |---|---|---|---|
//! | v1 | `user_id,screen_name,since_id,score` | `0` | no update column, may hold duplicate ids |
//! | v2 | `user_id,screen_name,since_id,update,score` | `-1` | `update` as `YYYY-MM-DD HH:MM:SS` UTC |
//! | v3 | `user_id,screen_name,since_id,last_update,score` | `0` | canonical |
//!
//! Loading never migrates implicitly; [`migrate_file`] has to be called.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use super::ScoreStore;
use crate::error::{StoreError, StoreResult};
use crate::types::account::{AccountId, AccountRecord};

const LEGACY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    V1,
    V2,
    V3,
}

impl SchemaVersion {
    pub const CURRENT: SchemaVersion = SchemaVersion::V3;

    pub fn number(self) -> u8 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
            Self::V3 => 3,
        }
    }

    fn columns(self) -> &'static [&'static str] {
        match self {
            Self::V1 => &["user_id", "screen_name", "since_id", "score"],
            Self::V2 => &["user_id", "screen_name", "since_id", "update", "score"],
            Self::V3 => &["user_id", "screen_name", "since_id", "last_update", "score"],
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.number())
    }
}

/// Identify the layout from a header row. Column order does not matter.
pub fn detect_schema(headers: &::csv::StringRecord) -> Option<SchemaVersion> {
    let found: HashSet<&str> = headers.iter().map(str::trim).collect();
    if found.len() != headers.len() {
        return None;
    }
    [SchemaVersion::V3, SchemaVersion::V2, SchemaVersion::V1]
        .into_iter()
        .find(|version| {
            let expected = version.columns();
            expected.len() == found.len() && expected.iter().all(|c| found.contains(c))
        })
}

/// Outcome of [`migrate_file`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub from: SchemaVersion,
    pub to: SchemaVersion,
    pub records: usize,
    pub duplicates_dropped: usize,
    /// Copy of the original file, when one was rewritten.
    pub backup: Option<PathBuf>,
}

/// Upgrade the store at `path` to the canonical layout in place.
///
/// The original is copied to `<path>.<version>.bak` first. Duplicate ids keep
/// their first occurrence. A canonical file is validated and left untouched.
pub fn migrate_file(path: impl AsRef<Path>) -> StoreResult<MigrationReport> {
    let path = path.as_ref();
    let (version, rows) = read_any(path)?;

    if version == SchemaVersion::CURRENT {
        let store = ScoreStore::load(path)?;
        return Ok(MigrationReport {
            from: version,
            to: version,
            records: store.len(),
            duplicates_dropped: 0,
            backup: None,
        });
    }

    let total = rows.len();
    let store: ScoreStore = rows.into_iter().collect();
    let duplicates_dropped = total - store.len();

    let backup = backup_path(path, version);
    fs::copy(path, &backup).map_err(|e| StoreError::io(&backup, e))?;
    super::table::write_store(&store, path)?;

    tracing::info!(
        path = %path.display(),
        from = %version,
        to = %SchemaVersion::CURRENT,
        records = store.len(),
        duplicates_dropped,
        "Score store migrated"
    );

    Ok(MigrationReport {
        from: version,
        to: SchemaVersion::CURRENT,
        records: store.len(),
        duplicates_dropped,
        backup: Some(backup),
    })
}

fn backup_path(path: &Path, version: SchemaVersion) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{version}.bak"));
    path.with_file_name(name)
}

/// Read every row of a store in any known layout, duplicates included.
fn read_any(path: &Path) -> StoreResult<(SchemaVersion, Vec<AccountRecord>)> {
    let mut reader = ::csv::Reader::from_path(path).map_err(|e| match e.into_kind() {
        ::csv::ErrorKind::Io(source) => StoreError::io(path, source),
        other => StoreError::corrupt(path, format!("{other:?}")),
    })?;
    let headers = reader
        .headers()
        .map_err(|e| StoreError::corrupt(path, e.to_string()))?
        .clone();
    let version = detect_schema(&headers)
        .ok_or_else(|| StoreError::corrupt(path, "unrecognised header"))?;
    let columns = LegacyColumns::locate(&headers);

    let mut rows = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let line = index + 2;
        let row = row.map_err(|e| StoreError::corrupt(path, format!("line {line}: {e}")))?;
        let record = columns
            .parse(&row)
            .map_err(|reason| StoreError::corrupt(path, format!("line {line}: {reason}")))?;
        rows.push(record);
    }

    Ok((version, rows))
}

struct LegacyColumns {
    user_id: usize,
    screen_name: usize,
    since_id: usize,
    update: Option<usize>,
    score: usize,
}

impl LegacyColumns {
    /// Only called after `detect_schema` accepted the header.
    fn locate(headers: &::csv::StringRecord) -> Self {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        Self {
            user_id: find("user_id").unwrap_or(0),
            screen_name: find("screen_name").unwrap_or(1),
            since_id: find("since_id").unwrap_or(2),
            update: find("update").or_else(|| find("last_update")),
            score: find("score").unwrap_or(headers.len().saturating_sub(1)),
        }
    }

    fn parse(&self, row: &::csv::StringRecord) -> Result<AccountRecord, String> {
        let field = |index: usize, name: &str| {
            row.get(index)
                .map(str::trim)
                .ok_or_else(|| format!("missing `{name}`"))
        };

        let user_id: u64 = field(self.user_id, "user_id")?
            .parse()
            .map_err(|e| format!("invalid user_id: {e}"))?;

        let since_id = field(self.since_id, "since_id")?;
        let cursor = if since_id.is_empty() {
            None
        } else {
            let value: i64 = since_id
                .parse()
                .map_err(|e| format!("invalid since_id `{since_id}`: {e}"))?;
            // 0 and -1 were both used as "never fetched".
            u64::try_from(value).ok().filter(|v| *v > 0)
        };

        let last_update = match self.update {
            Some(index) => parse_legacy_timestamp(field(index, "update")?)?,
            None => None,
        };

        let score = field(self.score, "score")?;
        let score: f64 = score
            .parse()
            .map_err(|e| format!("invalid score `{score}`: {e}"))?;
        if !score.is_finite() {
            return Err(format!("non-finite score `{score}`"));
        }

        Ok(AccountRecord {
            account_id: AccountId(user_id),
            display_name: field(self.screen_name, "screen_name")?.to_string(),
            cursor,
            last_update,
            score,
        })
    }
}

fn parse_legacy_timestamp(value: &str) -> Result<Option<DateTime<Utc>>, String> {
    if value.is_empty() {
        return Ok(None);
    }
    let parsed = NaiveDateTime::parse_from_str(value, LEGACY_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc)))
        .map_err(|_| format!("invalid update timestamp `{value}`"))?;
    // The epoch was the old "never updated" sentinel.
    Ok((parsed.timestamp() != 0).then_some(parsed))
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
    fn test_detects_versions_regardless_of_order() {
        let v1 = ::csv::StringRecord::from(vec!["user_id", "screen_name", "since_id", "score"]);
        let v2 = ::csv::StringRecord::from(vec!["user_id", "score", "update", "since_id", "screen_name"]);
        let v3 = ::csv::StringRecord::from(vec!["user_id", "screen_name", "since_id", "last_update", "score"]);
        let unknown = ::csv::StringRecord::from(vec!["user_id", "score"]);

        assert_eq!(detect_schema(&v1), Some(SchemaVersion::V1));
        assert_eq!(detect_schema(&v2), Some(SchemaVersion::V2));
        assert_eq!(detect_schema(&v3), Some(SchemaVersion::V3));
        assert_eq!(detect_schema(&unknown), None);
    }

    #[test]
    fn test_migrates_v1_and_drops_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "user_id,screen_name,since_id,score\n\
             10,alice,1500,0.75\n\
             20,bob,0,-1\n\
             20,bob,0,-1\n",
        );

        let report = migrate_file(&path).unwrap();
        assert_eq!(report.from, SchemaVersion::V1);
        assert_eq!(report.to, SchemaVersion::V3);
        assert_eq!(report.records, 2);
        assert_eq!(report.duplicates_dropped, 1);
        assert!(report.backup.as_ref().unwrap().exists());

        let store = ScoreStore::load(&path).unwrap();
        let alice = store.get(AccountId(10)).unwrap();
        assert_eq!(alice.cursor, Some(1500));
        assert_eq!(alice.score, 0.75);
        assert!(alice.last_update.is_none());
        assert!(store.get(AccountId(20)).unwrap().never_fetched());
    }

    #[test]
    fn test_migrates_v2_sentinels() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "user_id,screen_name,since_id,update,score\n\
             10,alice,-1,1970-01-01 00:00:00,-1\n\
             20,bob,900,2023-05-06 07:08:09,1.5\n",
        );

        migrate_file(&path).unwrap();
        let store = ScoreStore::load(&path).unwrap();

        let alice = store.get(AccountId(10)).unwrap();
        assert!(alice.never_fetched());
        assert!(alice.last_update.is_none());

        let bob = store.get(AccountId(20)).unwrap();
        assert_eq!(bob.cursor, Some(900));
        assert_eq!(
            bob.last_update,
            Some(Utc.with_ymd_and_hms(2023, 5, 6, 7, 8, 9).unwrap())
        );
    }

    #[test]
    fn test_current_version_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "user_id,screen_name,since_id,last_update,score\n1,a,0,,0.5\n",
        );
        let before = fs::read_to_string(&path).unwrap();

        let report = migrate_file(&path).unwrap();
        assert_eq!(report.from, SchemaVersion::V3);
        assert!(report.backup.is_none());
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_bad_legacy_row_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "user_id,screen_name,since_id,score\n1,a,0,0.5\nnot-a-number,b,0,0.5\n",
        );
        match migrate_file(&path).unwrap_err() {
            StoreError::CorruptStore { reason, .. } => assert!(reason.starts_with("line 3"), "{reason}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
