//! Self-Prioritizing Timeline Crawl Frontier
//!
//! Decides which social accounts to crawl each cycle, fetches their new posts,
//! appends those posts to day-partitioned logs, rescores every crawled account
//! by how many posts matched a keyword list, and grows the account set by
//! discovering the accounts that crawled accounts reply to or repost.
//!
//! # Cycle
//!
//! 1. Load the [`ScoreStore`]; a missing store means there is nothing to crawl.
//! 2. Pick a frontier with epsilon-greedy selection ([`FrontierSelector`]).
//! 3. For each account not updated in the last 24 hours, fetch posts newer
//!    than its cursor, record them, count keyword matches, queue discoveries,
//!    and apply `score = (1 - 0.9^count) + 0.5 * score`.
//! 4. Merge discoveries and save the store with a timestamped snapshot.
//!
//! # Usage
//!
//! ```rust,ignore
//! use frontier_crawler::{CrawlConfig, CrawlScheduler, DailyFileSink};
//! use frontier_crawler::testing::{MockFetcher, PostBuilder};
//!
//! let fetcher = MockFetcher::new()
//!     .with_timeline(1, [PostBuilder::new(10, 1).text("rust release").build()]);
//!
//! let scheduler = CrawlScheduler::new(
//!     CrawlConfig::new().with_keywords(["rust"]),
//!     fetcher,
//!     DailyFileSink::new("data/posts"),
//! )?;
//!
//! let report = scheduler.run_cycle("data/scores/accounts.csv").await?;
//! println!("crawled {} accounts", report.crawled());
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Fetcher and sink seams
//! - [`types`] - Accounts, posts, configuration
//! - [`store`] - Score table, CSV persistence, schema migration
//! - [`selector`] - Epsilon-greedy frontier selection
//! - [`scoring`] - Keyword matching and the score recurrence
//! - [`discovery`] - Per-cycle discovery queue
//! - [`scheduler`] - The crawl cycle
//! - [`fetchers`] - Rate limiting and the Twitter fetcher
//! - [`sinks`] - Daily JSON Lines files and an in-memory sink
//! - [`testing`] - Mock implementations for testing

pub mod discovery;
pub mod error;
pub mod fetchers;
pub mod scheduler;
pub mod scoring;
pub mod selector;
pub mod sinks;
pub mod store;
pub mod testing;
pub mod traits;
pub mod types;

pub use error::{
    ConfigError, CycleError, FetchError, PostParseError, SinkError, StoreError, UnavailableReason,
};
pub use traits::{fetcher::PostFetcher, sink::PostSink};
pub use types::{
    account::{AccountId, AccountRecord, AccountRef},
    config::CrawlConfig,
    post::Post,
};

pub use discovery::DiscoveryQueue;
pub use scheduler::{
    AccountOutcome, AccountReport, CrawlScheduler, CycleReport, CycleSummary, HaltReason,
};
pub use scoring::{KeywordMatcher, ScoreRecurrence};
pub use selector::{Frontier, FrontierSelector};
pub use store::{
    migration::{migrate_file, MigrationReport, SchemaVersion},
    SavedStore, ScoreStore,
};

pub use fetchers::{PostFetcherExt, RateLimitedFetcher};
pub use sinks::{DailyFileSink, MemorySink};

#[cfg(feature = "twitter")]
pub use fetchers::TwitterFetcher;
