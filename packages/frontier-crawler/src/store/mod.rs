//! Durable account table.
//!
//! The table is an insertion-ordered map from account id to its crawl state.
//! Persistence is a CSV file (see [`table`]) with a timestamped snapshot written
//! beside it on every save; older layouts are upgraded by [`migration`].

pub mod table;
pub mod migration;

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::StoreResult;
use crate::types::account::{AccountId, AccountRecord};

/// Snapshot suffix format, local time.
pub const SNAPSHOT_TIME_FORMAT: &str = "%Y-%m-%d=%H-%M-%S";

/// Where a save landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedStore {
    pub live: PathBuf,
    pub snapshot: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreStore {
    records: IndexMap<AccountId, AccountRecord>,
}

impl ScoreStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of known accounts.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether `id` already has a record.
    pub fn contains(&self, id: AccountId) -> bool {
        self.records.contains_key(&id)
    }

    /// Get the record for `id`.
    pub fn get(&self, id: AccountId) -> Option<&AccountRecord> {
        self.records.get(&id)
    }

    /// Get the record for `id` for in-place updates.
    pub fn get_mut(&mut self, id: AccountId) -> Option<&mut AccountRecord> {
        self.records.get_mut(&id)
    }

    /// Apply `f` to the record for `id`. Returns false when the id is unknown.
    pub fn update(&mut self, id: AccountId, f: impl FnOnce(&mut AccountRecord)) -> bool {
        match self.records.get_mut(&id) {
            Some(record) => {
                f(record);
                true
            }
            None => false,
        }
    }

    /// Insert a record unless its id is already present. Returns whether it was inserted.
    pub fn insert_new(&mut self, record: AccountRecord) -> bool {
        match self.records.entry(record.account_id) {
            indexmap::map::Entry::Occupied(_) => false,
            indexmap::map::Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
    }

    /// Records in insertion order.
    pub fn records(&self) -> impl Iterator<Item = &AccountRecord> {
        self.records.values()
    }

    /// Account ids in insertion order.
    pub fn account_ids(&self) -> impl Iterator<Item = AccountId> + '_ {
        self.records.keys().copied()
    }

    /// Account ids by descending score, ties kept in insertion order.
    pub fn ordered_account_ids(&self) -> Vec<AccountId> {
        let mut ranked: Vec<&AccountRecord> = self.records.values().collect();
        // sort_by is stable, which gives the insertion-order tie break.
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.into_iter().map(|r| r.account_id).collect()
    }

    /// Add newly discovered accounts.
    ///
    /// Existing records keep their cursor, score and last update; an empty
    /// display name is filled in from the candidate. Returns how many
    /// records were added.
    pub fn merge(&mut self, candidates: impl IntoIterator<Item = AccountRecord>) -> usize {
        let mut added = 0;
        for candidate in candidates {
            match self.records.get_mut(&candidate.account_id) {
                Some(existing) => {
                    if existing.display_name.is_empty() && !candidate.display_name.is_empty() {
                        existing.display_name = candidate.display_name;
                    }
                }
                None => {
                    self.records.insert(candidate.account_id, candidate);
                    added += 1;
                }
            }
        }
        added
    }

    /// Read a canonical store file.
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        table::read_store(path.as_ref())
    }

    /// Read a store, or `None` when the file does not exist yet.
    pub fn load_if_exists(path: impl AsRef<Path>) -> StoreResult<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        Self::load(path).map(Some)
    }

    /// Overwrite the live file and write a timestamped snapshot beside it.
    pub fn save(&self, path: impl AsRef<Path>) -> StoreResult<SavedStore> {
        self.save_at(path, Local::now())
    }

    pub fn save_at(&self, path: impl AsRef<Path>, at: DateTime<Local>) -> StoreResult<SavedStore> {
        let live = path.as_ref().to_path_buf();
        table::write_store(self, &live)?;

        let snapshot = snapshot_path(&live, at);
        std::fs::copy(&live, &snapshot)
            .map_err(|e| crate::error::StoreError::io(&snapshot, e))?;

        tracing::debug!(
            live = %live.display(),
            snapshot = %snapshot.display(),
            accounts = self.len(),
            "Score store saved"
        );

        Ok(SavedStore { live, snapshot })
    }
}

impl FromIterator<AccountRecord> for ScoreStore {
    /// Later duplicates of an id are dropped.
    fn from_iter<I: IntoIterator<Item = AccountRecord>>(iter: I) -> Self {
        let mut store = Self::new();
        for record in iter {
            store.insert_new(record);
        }
        store
    }
}

/// `<dir>/<stem>_<YYYY-MM-DD=HH-MM-SS>.<ext>`
pub fn snapshot_path(live: &Path, at: DateTime<Local>) -> PathBuf {
    let stem = live
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "scores".to_string());
    let mut name = format!("{}_{}", stem, at.format(SNAPSHOT_TIME_FORMAT));
    if let Some(ext) = live.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    live.with_file_name(name)
}
