use std::fmt;
use std::time::Duration;

use serde::Deserialize;

/// A user profile as returned by `users/show`.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: u64,
    pub screen_name: String,
    pub name: Option<String>,
    #[serde(default)]
    pub protected: bool,
    pub statuses_count: Option<u64>,
}

/// How to identify a user for a profile lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserLookup {
    Id(u64),
    ScreenName(String),
}

impl UserLookup {
    pub(crate) fn query(&self) -> (&'static str, String) {
        match self {
            Self::Id(id) => ("user_id", id.to_string()),
            Self::ScreenName(name) => ("screen_name", name.clone()),
        }
    }
}

impl fmt::Display for UserLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::ScreenName(name) => write!(f, "@{name}"),
        }
    }
}

/// Retry and backoff settings for a client.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries for transient failures (network errors, 5xx).
    pub max_retries: u32,
    /// First backoff delay; doubles with each retry.
    pub base_delay: Duration,
    /// How many times to sleep through a rate-limit window before giving up.
    pub max_rate_limit_waits: u32,
    /// Upper bound for a single rate-limit sleep.
    pub max_rate_limit_sleep: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
            max_rate_limit_waits: 3,
            max_rate_limit_sleep: Duration::from_secs(15 * 60 + 5),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}
