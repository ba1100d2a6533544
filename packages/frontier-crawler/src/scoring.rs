//! Keyword engagement and the score recurrence.

use crate::error::ConfigError;

/// Weight of the previous score in the recurrence.
pub const HISTORY_WEIGHT: f64 = 0.5;

/// Case-sensitive substring matcher, any keyword counts.
#[derive(Debug, Clone, Default)]
pub struct KeywordMatcher {
    keywords: Vec<String>,
}

impl KeywordMatcher {
    /// Empty keywords are ignored: they would match every post.
    pub fn new(keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            keywords: keywords
                .into_iter()
                .map(Into::into)
                .filter(|k: &String| !k.is_empty())
                .collect(),
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

/// `next = (1 - decay_base^count) + 0.5 * previous`
///
/// The reward term lies in `[0, 1)`, so scores stay bounded: a run of cycles
/// converges below 2 no matter how many posts match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRecurrence {
    decay_base: f64,
}

impl ScoreRecurrence {
    pub fn new(decay_base: f64) -> Result<Self, ConfigError> {
        if !(decay_base > 0.0 && decay_base < 1.0) {
            return Err(ConfigError::InvalidDecayBase(decay_base));
        }
        Ok(Self { decay_base })
    }

    pub fn decay_base(&self) -> f64 {
        self.decay_base
    }

    pub fn next(&self, previous: f64, count: usize) -> f64 {
        let exponent = i32::try_from(count).unwrap_or(i32::MAX);
        (1.0 - self.decay_base.powi(exponent)) + HISTORY_WEIGHT * previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_matching_is_case_sensitive_or() {
        let matcher = KeywordMatcher::new(["Rust", "tokio"]);
        assert!(matcher.matches("Learning Rust today"));
        assert!(matcher.matches("async with tokio"));
        assert!(!matcher.matches("learning rust today"));
        assert!(!matcher.matches("nothing here"));
    }

    #[test]
    fn test_empty_keywords_never_match() {
        let matcher = KeywordMatcher::new([""]);
        assert!(matcher.is_empty());
        assert!(!matcher.matches("anything"));
    }

    #[test]
    fn test_zero_matches_halves_score() {
        let recurrence = ScoreRecurrence::new(0.9).unwrap();
        assert_eq!(recurrence.next(1.5, 0), 0.75);
        assert_eq!(recurrence.next(-1.0, 0), -0.5);
    }

    #[test]
    fn test_two_matches_from_zero() {
        let recurrence = ScoreRecurrence::new(0.9).unwrap();
        assert!((recurrence.next(0.0, 2) - 0.19).abs() < 1e-12);
    }

    #[test]
    fn test_saturates_near_one_plus_half_previous() {
        let recurrence = ScoreRecurrence::new(0.9).unwrap();
        assert!((recurrence.next(1.0, 10_000) - 1.5).abs() < 1e-12);
        assert!((recurrence.next(1.0, usize::MAX) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_decay_base_outside_unit_interval() {
        assert!(ScoreRecurrence::new(0.0).is_err());
        assert!(ScoreRecurrence::new(1.0).is_err());
        assert!(ScoreRecurrence::new(-0.5).is_err());
    }
}
