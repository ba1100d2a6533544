use anyhow::{Context, Result};
use dotenvy::dotenv;
use frontier_crawler::types::config::{DEFAULT_DECAY_BASE, DEFAULT_EPSILON, DEFAULT_FRONTIER_SIZE};
use frontier_crawler::CrawlConfig;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_REQUESTS_PER_MINUTE: u32 = 60;

/// Crawler configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub bearer_token: Option<String>,
    pub data_dir: PathBuf,
    pub keywords: Vec<String>,
    pub frontier_size: usize,
    pub epsilon: f64,
    pub decay_base: f64,
    pub requests_per_minute: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            bearer_token: lookup("TWITTER_BEARER_TOKEN").filter(|t| !t.is_empty()),
            data_dir: lookup("CRAWL_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            keywords: lookup("CRAWL_KEYWORDS")
                .map(|raw| split_keywords(&raw))
                .unwrap_or_default(),
            frontier_size: parse_or(&lookup, "CRAWL_FRONTIER_SIZE", DEFAULT_FRONTIER_SIZE)?,
            epsilon: parse_or(&lookup, "CRAWL_EPSILON", DEFAULT_EPSILON)?,
            decay_base: parse_or(&lookup, "CRAWL_DECAY_BASE", DEFAULT_DECAY_BASE)?,
            requests_per_minute: parse_or(
                &lookup,
                "CRAWL_REQUESTS_PER_MINUTE",
                DEFAULT_REQUESTS_PER_MINUTE,
            )?,
        })
    }

    pub fn bearer_token(&self) -> Result<&str> {
        self.bearer_token
            .as_deref()
            .context("TWITTER_BEARER_TOKEN must be set")
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("scores").join("accounts.csv")
    }

    pub fn posts_dir(&self) -> PathBuf {
        self.data_dir.join("posts")
    }

    pub fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig::new()
            .with_frontier_size(self.frontier_size)
            .with_epsilon(self.epsilon)
            .with_decay_base(self.decay_base)
            .with_keywords(self.keywords.iter().cloned())
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a valid number, got `{raw}`")),
        _ => Ok(default),
    }
}

/// Comma separated; surrounding whitespace is dropped, inner whitespace kept.
fn split_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert!(config.bearer_token.is_none());
        assert!(config.bearer_token().is_err());
        assert_eq!(config.frontier_size, 300);
        assert_eq!(config.epsilon, 0.2);
        assert_eq!(config.requests_per_minute, 60);
        assert_eq!(config.store_path(), PathBuf::from("./data/scores/accounts.csv"));
        assert_eq!(config.posts_dir(), PathBuf::from("./data/posts"));
    }

    #[test]
    fn test_reads_overrides() {
        let config = config_from(&[
            ("TWITTER_BEARER_TOKEN", "abc"),
            ("CRAWL_DATA_DIR", "/var/crawl"),
            ("CRAWL_KEYWORDS", "rust, tokio ,,async await"),
            ("CRAWL_FRONTIER_SIZE", "50"),
            ("CRAWL_EPSILON", "0.1"),
        ])
        .unwrap();

        assert_eq!(config.bearer_token().unwrap(), "abc");
        assert_eq!(config.keywords, vec!["rust", "tokio", "async await"]);
        assert_eq!(config.frontier_size, 50);
        assert_eq!(config.crawl_config().epsilon, 0.1);
        assert_eq!(config.store_path(), PathBuf::from("/var/crawl/scores/accounts.csv"));
    }

    #[test]
    fn test_rejects_bad_numbers() {
        let err = config_from(&[("CRAWL_FRONTIER_SIZE", "lots")]).unwrap_err();
        assert!(err.to_string().contains("CRAWL_FRONTIER_SIZE"));
    }
}
