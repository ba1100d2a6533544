//! Configuration for a crawl cycle.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default number of accounts crawled per cycle.
pub const DEFAULT_FRONTIER_SIZE: usize = 300;

/// Default share of the frontier spent on random exploration.
pub const DEFAULT_EPSILON: f64 = 0.2;

/// Default base of the keyword-count decay term.
pub const DEFAULT_DECAY_BASE: f64 = 0.9;

/// Accounts updated more recently than this are not re-fetched.
pub const FRESHNESS_WINDOW_HOURS: i64 = 24;

/// Configuration for one crawl cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Maximum accounts selected per cycle.
    ///
    /// Default: 300.
    pub frontier_size: usize,

    /// Fraction of the frontier drawn uniformly at random (0.0 to 1.0).
    ///
    /// The rest is filled with the highest-scoring accounts.
    /// Default: 0.2.
    pub epsilon: f64,

    /// Keywords whose presence in a post counts as engagement.
    ///
    /// Case-sensitive substring match, any keyword counts.
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Base of the `1 - base^count` reward term, in (0, 1).
    ///
    /// Default: 0.9.
    pub decay_base: f64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            frontier_size: DEFAULT_FRONTIER_SIZE,
            epsilon: DEFAULT_EPSILON,
            keywords: vec![],
            decay_base: DEFAULT_DECAY_BASE,
        }
    }
}

impl CrawlConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frontier_size(mut self, size: usize) -> Self {
        self.frontier_size = size;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_keywords(mut self, keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.keywords = keywords.into_iter().map(|k| k.into()).collect();
        self
    }

    pub fn with_decay_base(mut self, decay_base: f64) -> Self {
        self.decay_base = decay_base;
        self
    }

    /// The freshness throttle window. Fixed at 24 hours.
    pub fn freshness_window(&self) -> Duration {
        Duration::hours(FRESHNESS_WINDOW_HOURS)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(ConfigError::InvalidEpsilon(self.epsilon));
        }
        if !(self.decay_base > 0.0 && self.decay_base < 1.0) {
            return Err(ConfigError::InvalidDecayBase(self.decay_base));
        }
        Ok(())
    }
}
