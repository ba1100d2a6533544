//! Account identity and per-account crawl state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Score assigned to accounts found through discovery, before their first crawl.
pub const DISCOVERED_SCORE: f64 = -1.0;

/// Score assigned to accounts an operator seeds by hand.
pub const SEEDED_SCORE: f64 = 0.0;

/// Remote account identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for AccountId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// An account as referenced from inside a post (author, reply target, repost source).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountRef {
    pub id: AccountId,
    pub screen_name: Option<String>,
}

impl AccountRef {
    pub fn new(id: impl Into<AccountId>, screen_name: Option<String>) -> Self {
        Self {
            id: id.into(),
            screen_name,
        }
    }
}

/// Crawl state for one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub account_id: AccountId,

    /// Most recently observed handle. Best effort, may be empty.
    pub display_name: String,

    /// Highest post id already fetched. `None` means never fetched.
    pub cursor: Option<u64>,

    /// Creation time of the newest post seen, or the time of the last empty fetch.
    /// `None` means never updated.
    pub last_update: Option<DateTime<Utc>>,

    /// Crawl priority. Higher is crawled first.
    pub score: f64,
}

impl AccountRecord {
    /// A candidate found through a reply or repost.
    pub fn discovered(account: &AccountRef) -> Self {
        Self {
            account_id: account.id,
            display_name: account.screen_name.clone().unwrap_or_default(),
            cursor: None,
            last_update: None,
            score: DISCOVERED_SCORE,
        }
    }

    /// An account added by an operator.
    pub fn seeded(account_id: impl Into<AccountId>, display_name: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            display_name: display_name.into(),
            cursor: None,
            last_update: None,
            score: SEEDED_SCORE,
        }
    }

    pub fn never_fetched(&self) -> bool {
        self.cursor.is_none()
    }

    /// Move the cursor forward to `post_id`. Never moves it backward.
    pub fn advance_cursor(&mut self, post_id: u64) {
        self.cursor = Some(self.cursor.map_or(post_id, |c| c.max(post_id)));
    }

    /// Whether the account was updated less than `window` before `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.last_update.is_some_and(|t| now - t < window)
    }
}
