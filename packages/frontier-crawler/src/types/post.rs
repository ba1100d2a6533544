//! Typed view over a remote post object.
//!
//! The remote object is kept verbatim in [`Post::raw`] so sinks record exactly
//! what the API returned; the crawler only reads the handful of fields below.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::PostParseError;
use crate::types::account::{AccountId, AccountRef};

/// `created_at` format used by the v1.1 API, e.g. `Wed Oct 10 20:19:24 +0000 2018`.
pub const API_TIMESTAMP_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Day key format for post logs.
pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: u64,
    pub author: AccountRef,
    pub created_at: DateTime<Utc>,
    pub text: String,
    pub in_reply_to: Option<AccountRef>,
    pub reposted_from: Option<AccountRef>,
    pub raw: Value,
}

impl Post {
    /// Extract the crawler's fields from a raw API object.
    pub fn from_json(raw: Value) -> Result<Self, PostParseError> {
        let id = id_field(&raw, "id").ok_or(PostParseError::MissingField("id"))?;

        let user = raw.get("user").ok_or(PostParseError::MissingField("user"))?;
        let author_id = id_field(user, "id").ok_or(PostParseError::MissingField("user.id"))?;
        let author = AccountRef::new(author_id, str_field(user, "screen_name"));

        let created_at = raw
            .get("created_at")
            .and_then(Value::as_str)
            .ok_or(PostParseError::MissingField("created_at"))?;
        let created_at = parse_timestamp(created_at)?;

        let text = str_field(&raw, "full_text")
            .or_else(|| str_field(&raw, "text"))
            .unwrap_or_default();

        let in_reply_to = id_field(&raw, "in_reply_to_user_id").map(|reply_id| {
            AccountRef::new(reply_id, str_field(&raw, "in_reply_to_screen_name"))
        });

        let reposted_from = raw
            .get("retweeted_status")
            .and_then(|status| status.get("user"))
            .and_then(|user| {
                id_field(user, "id")
                    .map(|repost_id| AccountRef::new(repost_id, str_field(user, "screen_name")))
            });

        Ok(Self {
            id,
            author,
            created_at,
            text,
            in_reply_to,
            reposted_from,
            raw,
        })
    }

    /// Calendar day (UTC) this post belongs to in the post log.
    pub fn day_key(&self) -> String {
        self.created_at.format(DAY_KEY_FORMAT).to_string()
    }

    pub fn author_id(&self) -> AccountId {
        self.author.id
    }

    /// Accounts this post interacts with, reply target first.
    pub fn referenced_accounts(&self) -> impl Iterator<Item = &AccountRef> {
        self.in_reply_to.iter().chain(self.reposted_from.iter())
    }
}

/// Parse a post timestamp in the API format, falling back to RFC 3339.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, PostParseError> {
    DateTime::parse_from_str(value, API_TIMESTAMP_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| PostParseError::InvalidTimestamp(value.to_string()))
}

/// Numeric id with an `<name>_str` fallback. Null and zero both mean absent.
fn id_field(value: &Value, name: &str) -> Option<u64> {
    value
        .get(name)
        .and_then(Value::as_u64)
        .or_else(|| {
            value
                .get(format!("{name}_str"))
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok())
        })
        .filter(|id| *id != 0)
}

fn str_field(value: &Value, name: &str) -> Option<String> {
    value.get(name).and_then(Value::as_str).map(str::to_string)
}
