//! One crawl cycle: load, select, fetch, score, discover, persist.
//!
//! Accounts are crawled strictly one after another. The store and the
//! discovery queue are owned by the running cycle, so each account is updated
//! at most once and every update is applied in place without locking.

use chrono::{DateTime, Local, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::Instrument;
use uuid::Uuid;

use crate::discovery::DiscoveryQueue;
use crate::error::{ConfigError, CycleError, FetchError, UnavailableReason};
use crate::scoring::{KeywordMatcher, ScoreRecurrence};
use crate::selector::FrontierSelector;
use crate::store::{SavedStore, ScoreStore};
use crate::traits::fetcher::PostFetcher;
use crate::traits::sink::PostSink;
use crate::types::account::AccountId;
use crate::types::config::CrawlConfig;

/// What happened to one selected account.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountOutcome {
    /// Updated within the freshness window, not fetched.
    SkippedFresh,
    Crawled {
        posts: usize,
        matches: usize,
        discovered: usize,
    },
    /// Treated as an empty fetch.
    Unavailable(UnavailableReason),
    /// Left untouched for this cycle.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountReport {
    pub account_id: AccountId,
    pub outcome: AccountOutcome,
}

/// Why a cycle stopped before the end of its frontier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HaltReason {
    QuotaExhausted,
    Sink(String),
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuotaExhausted => f.write_str("remote quota exhausted"),
            Self::Sink(e) => write!(f, "post sink failed: {e}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    /// False when there was no store to crawl.
    pub store_found: bool,
    pub selected: usize,
    pub outcomes: Vec<AccountReport>,
    pub posts_recorded: usize,
    pub keyword_matches: usize,
    /// Candidates queued this cycle.
    pub discovered: usize,
    /// Candidates actually added to the store.
    pub merged: usize,
    pub halted: Option<HaltReason>,
    pub saved: Option<SavedStore>,
}

impl CycleReport {
    fn new(cycle_id: Uuid, selected: usize) -> Self {
        Self {
            cycle_id,
            store_found: true,
            selected,
            outcomes: Vec::with_capacity(selected),
            posts_recorded: 0,
            keyword_matches: 0,
            discovered: 0,
            merged: 0,
            halted: None,
            saved: None,
        }
    }

    /// Report for a cycle that found no store.
    pub fn noop(cycle_id: Uuid) -> Self {
        Self {
            store_found: false,
            ..Self::new(cycle_id, 0)
        }
    }

    fn record(&mut self, account_id: AccountId, outcome: AccountOutcome) {
        if let AccountOutcome::Crawled { posts, matches, .. } = &outcome {
            self.posts_recorded += posts;
            self.keyword_matches += matches;
        }
        self.outcomes.push(AccountReport {
            account_id,
            outcome,
        });
    }

    fn count(&self, predicate: impl Fn(&AccountOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|r| predicate(&r.outcome)).count()
    }

    pub fn crawled(&self) -> usize {
        self.count(|o| matches!(o, AccountOutcome::Crawled { .. }))
    }

    pub fn skipped_fresh(&self) -> usize {
        self.count(|o| matches!(o, AccountOutcome::SkippedFresh))
    }

    pub fn unavailable(&self) -> usize {
        self.count(|o| matches!(o, AccountOutcome::Unavailable(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, AccountOutcome::Failed(_)))
    }

    pub fn outcome(&self, account_id: AccountId) -> Option<&AccountOutcome> {
        self.outcomes
            .iter()
            .find(|r| r.account_id == account_id)
            .map(|r| &r.outcome)
    }

    /// Counters only, for logs and command output.
    pub fn summary(&self) -> CycleSummary {
        CycleSummary {
            cycle_id: self.cycle_id,
            store_found: self.store_found,
            selected: self.selected,
            crawled: self.crawled(),
            skipped_fresh: self.skipped_fresh(),
            unavailable: self.unavailable(),
            failed: self.failed(),
            posts_recorded: self.posts_recorded,
            keyword_matches: self.keyword_matches,
            discovered: self.discovered,
            merged: self.merged,
            halted: self.halted.clone(),
            saved: self.saved.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub cycle_id: Uuid,
    pub store_found: bool,
    pub selected: usize,
    pub crawled: usize,
    pub skipped_fresh: usize,
    pub unavailable: usize,
    pub failed: usize,
    pub posts_recorded: usize,
    pub keyword_matches: usize,
    pub discovered: usize,
    pub merged: usize,
    pub halted: Option<HaltReason>,
    pub saved: Option<SavedStore>,
}

/// Runs crawl cycles against a store file.
///
/// # Example
///
/// ```rust,ignore
/// use frontier_crawler::{CrawlConfig, CrawlScheduler, DailyFileSink};
///
/// let scheduler = CrawlScheduler::new(
///     CrawlConfig::new().with_keywords(["rust"]),
///     fetcher,
///     DailyFileSink::new("data/posts"),
/// )?;
/// let report = scheduler.run_cycle("data/scores/accounts.csv").await?;
/// ```
pub struct CrawlScheduler<F, S> {
    config: CrawlConfig,
    selector: FrontierSelector,
    matcher: KeywordMatcher,
    recurrence: ScoreRecurrence,
    fetcher: F,
    sink: S,
}

impl<F: PostFetcher, S: PostSink> CrawlScheduler<F, S> {
    /// Validate `config` and build the selector, matcher and recurrence it describes.
    pub fn new(config: CrawlConfig, fetcher: F, sink: S) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            selector: FrontierSelector::from_config(&config)?,
            matcher: KeywordMatcher::new(config.keywords.iter().cloned()),
            recurrence: ScoreRecurrence::new(config.decay_base)?,
            config,
            fetcher,
            sink,
        })
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Run one cycle with the current time and a fresh random source.
    ///
    /// The snapshot is named after the wall clock at save time, not the cycle start.
    pub async fn run_cycle(&self, store_path: impl AsRef<Path>) -> Result<CycleReport, CycleError> {
        let mut rng = StdRng::from_entropy();
        self.instrumented(store_path.as_ref(), Utc::now(), None, &mut rng)
            .await
    }

    /// Run one cycle as if it started at `now`, drawing exploration picks from `rng`.
    ///
    /// The snapshot is stamped with `now` too, so replays produce the same file names.
    pub async fn run_cycle_at<R: Rng + ?Sized>(
        &self,
        store_path: &Path,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<CycleReport, CycleError> {
        self.instrumented(store_path, now, Some(now.with_timezone(&Local)), rng)
            .await
    }

    async fn instrumented<R: Rng + ?Sized>(
        &self,
        store_path: &Path,
        now: DateTime<Utc>,
        snapshot_at: Option<DateTime<Local>>,
        rng: &mut R,
    ) -> Result<CycleReport, CycleError> {
        let cycle_id = Uuid::new_v4();
        let span = tracing::info_span!("crawl_cycle", %cycle_id);
        self.cycle(cycle_id, store_path, now, snapshot_at, rng)
            .instrument(span)
            .await
    }

    async fn cycle<R: Rng + ?Sized>(
        &self,
        cycle_id: Uuid,
        store_path: &Path,
        now: DateTime<Utc>,
        snapshot_at: Option<DateTime<Local>>,
        rng: &mut R,
    ) -> Result<CycleReport, CycleError> {
        let Some(mut store) = ScoreStore::load_if_exists(store_path)? else {
            tracing::warn!(path = %store_path.display(), "No score store yet, nothing to crawl");
            return Ok(CycleReport::noop(cycle_id));
        };

        let frontier = self.selector.choose(&store, rng);
        tracing::info!(
            accounts = store.len(),
            selected = frontier.len(),
            explored = frontier.explored.len(),
            "Starting crawl cycle"
        );

        let mut report = CycleReport::new(cycle_id, frontier.len());
        let mut discoveries = DiscoveryQueue::new();

        for account_id in frontier.ids() {
            match self
                .crawl_account(&mut store, account_id, now, &mut discoveries)
                .await
            {
                Ok(outcome) => report.record(account_id, outcome),
                Err(halt) => {
                    tracing::warn!(
                        account_id = %account_id,
                        reason = %halt,
                        "Stopping cycle early, saving progress"
                    );
                    report.halted = Some(halt);
                    break;
                }
            }
        }

        report.discovered = discoveries.len();
        report.merged = store.merge(discoveries.into_records());
        report.saved = Some(store.save_at(store_path, snapshot_at.unwrap_or_else(Local::now))?);

        tracing::info!(
            crawled = report.crawled(),
            skipped_fresh = report.skipped_fresh(),
            unavailable = report.unavailable(),
            failed = report.failed(),
            posts = report.posts_recorded,
            merged = report.merged,
            halted = report.halted.is_some(),
            "Crawl cycle complete"
        );

        Ok(report)
    }

    /// Fetch and rescore one account. `Err` stops the cycle.
    async fn crawl_account(
        &self,
        store: &mut ScoreStore,
        account_id: AccountId,
        now: DateTime<Utc>,
        discoveries: &mut DiscoveryQueue,
    ) -> Result<AccountOutcome, HaltReason> {
        let Some(current) = store.get(account_id).cloned() else {
            return Ok(AccountOutcome::Failed(format!("account {account_id} not in store")));
        };

        if current.is_fresh(now, self.config.freshness_window()) {
            tracing::debug!(account_id = %account_id, "Updated recently, skipping");
            return Ok(AccountOutcome::SkippedFresh);
        }

        let (posts, unavailable) = match self.fetcher.fetch_since(account_id, current.cursor).await {
            Ok(posts) => (posts, None),
            Err(FetchError::Unavailable(reason)) => {
                tracing::info!(account_id = %account_id, %reason, "Account unavailable");
                (Vec::new(), Some(reason))
            }
            Err(FetchError::QuotaExhausted) => return Err(HaltReason::QuotaExhausted),
            Err(e) => {
                tracing::warn!(account_id = %account_id, error = %e, "Fetch failed, skipping account");
                return Ok(AccountOutcome::Failed(e.to_string()));
            }
        };

        let mut updated = current.clone();
        let mut matches = 0;
        let mut discovered = 0;
        let mut newest: Option<DateTime<Utc>> = None;
        let mut handle: Option<(u64, &str)> = None;

        for post in &posts {
            self.sink
                .append(&post.day_key(), post)
                .await
                .map_err(|e| HaltReason::Sink(e.to_string()))?;

            updated.advance_cursor(post.id);
            if self.matcher.matches(&post.text) {
                matches += 1;
            }
            newest = Some(newest.map_or(post.created_at, |t| t.max(post.created_at)));

            if post.author_id() == account_id {
                if let Some(name) = post.author.screen_name.as_deref().filter(|n| !n.is_empty()) {
                    if handle.map_or(true, |(id, _)| post.id > id) {
                        handle = Some((post.id, name));
                    }
                }
            }

            discovered += discoveries.observe(store, post);
        }

        updated.score = self.recurrence.next(current.score, matches);
        updated.last_update = Some(newest.unwrap_or(now));
        if let Some((_, name)) = handle {
            updated.display_name = name.to_string();
        }

        tracing::info!(
            account_id = %account_id,
            posts = posts.len(),
            matches,
            discovered,
            score = updated.score,
            "Account crawled"
        );
        store.update(account_id, |record| *record = updated);

        Ok(match unavailable {
            Some(reason) => AccountOutcome::Unavailable(reason),
            None => AccountOutcome::Crawled {
                posts: posts.len(),
                matches,
                discovered,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::MemorySink;
    use crate::testing::{MockFetcher, PostBuilder};
    use crate::types::account::AccountRecord;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn scheduler(fetcher: MockFetcher, sink: MemorySink) -> CrawlScheduler<MockFetcher, MemorySink> {
        CrawlScheduler::new(
            CrawlConfig::new().with_epsilon(0.0).with_keywords(["rust"]),
            fetcher,
            sink,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_crawl_account_updates_in_place() {
        let mut store: ScoreStore = [AccountRecord::seeded(1, "old_name")].into_iter().collect();
        let fetcher = MockFetcher::new().with_timeline(
            1,
            [
                PostBuilder::new(11, 1).text("rust is fun").author_name("new_name").build(),
                PostBuilder::new(10, 1).text("cooking").author_name("older_name").build(),
            ],
        );
        let sink = MemorySink::new();
        let scheduler = scheduler(fetcher, sink.clone());
        let mut queue = DiscoveryQueue::new();

        let outcome = scheduler
            .crawl_account(&mut store, AccountId(1), now(), &mut queue)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            AccountOutcome::Crawled {
                posts: 2,
                matches: 1,
                discovered: 0
            }
        );
        let record = store.get(AccountId(1)).unwrap();
        assert_eq!(record.cursor, Some(11));
        assert_eq!(record.display_name, "new_name");
        assert!((record.score - 0.1).abs() < 1e-12);
        assert_eq!(sink.len(), 2);
    }

    #[tokio::test]
    async fn test_sink_failure_leaves_account_untouched() {
        let mut store: ScoreStore = [AccountRecord::seeded(1, "a")].into_iter().collect();
        let fetcher = MockFetcher::new().with_timeline(1, [PostBuilder::new(5, 1).build()]);
        let scheduler = scheduler(fetcher, MemorySink::failing());

        let result = scheduler
            .crawl_account(&mut store, AccountId(1), now(), &mut DiscoveryQueue::new())
            .await;

        assert!(matches!(result, Err(HaltReason::Sink(_))));
        assert_eq!(store.get(AccountId(1)), Some(&AccountRecord::seeded(1, "a")));
    }

    #[tokio::test]
    async fn test_transient_failure_is_per_account() {
        let mut store: ScoreStore = [AccountRecord::seeded(1, "a")].into_iter().collect();
        let fetcher = MockFetcher::new().with_error(1, FetchError::Transient("timeout".into()));
        let scheduler = scheduler(fetcher, MemorySink::new());

        let outcome = scheduler
            .crawl_account(&mut store, AccountId(1), now(), &mut DiscoveryQueue::new())
            .await
            .unwrap();

        assert!(matches!(outcome, AccountOutcome::Failed(_)));
        assert_eq!(store.get(AccountId(1)), Some(&AccountRecord::seeded(1, "a")));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = CrawlScheduler::new(
            CrawlConfig::new().with_decay_base(1.5),
            MockFetcher::new(),
            MemorySink::new(),
        );
        assert!(matches!(result, Err(ConfigError::InvalidDecayBase(_))));
    }

    #[test]
    fn test_report_counters() {
        let mut report = CycleReport::new(Uuid::new_v4(), 4);
        report.record(AccountId(1), AccountOutcome::SkippedFresh);
        report.record(
            AccountId(2),
            AccountOutcome::Crawled {
                posts: 3,
                matches: 2,
                discovered: 1,
            },
        );
        report.record(AccountId(3), AccountOutcome::Unavailable(UnavailableReason::NotFound));
        report.record(AccountId(4), AccountOutcome::Failed("boom".into()));

        let summary = report.summary();
        assert_eq!(
            (summary.crawled, summary.skipped_fresh, summary.unavailable, summary.failed),
            (1, 1, 1, 1)
        );
        assert_eq!(report.posts_recorded, 3);
        assert_eq!(report.keyword_matches, 2);
        assert_eq!(report.outcome(AccountId(1)), Some(&AccountOutcome::SkippedFresh));
    }
}
