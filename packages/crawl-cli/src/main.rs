//! `crawl` - run and maintain the timeline crawl frontier.
//!
//! Every command prints JSON on stdout; logs go to stderr.

mod config;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use frontier_crawler::{
    migrate_file, AccountRecord, CrawlScheduler, DailyFileSink, PostFetcherExt, ScoreStore,
    TwitterFetcher,
};
use twitter_client::{TwitterClient, UserLookup};

#[derive(Parser)]
#[command(name = "crawl")]
#[command(about = "Self-prioritizing timeline crawler")]
struct Cli {
    /// Data directory (overrides CRAWL_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one crawl cycle
    Run {
        #[arg(long)]
        frontier_size: Option<usize>,
        #[arg(long)]
        epsilon: Option<f64>,
        /// Keyword to count (repeatable, replaces CRAWL_KEYWORDS)
        #[arg(long = "keyword")]
        keywords: Vec<String>,
    },

    /// Add accounts to the store, creating it if needed
    Seed {
        #[arg(long = "id")]
        ids: Vec<u64>,
        #[arg(long = "screen-name")]
        screen_names: Vec<String>,
    },

    /// Show the highest-scoring accounts
    Top {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Upgrade a store written by an older layout
    Migrate,
}

#[derive(Serialize)]
struct SeedResponse {
    added: Vec<AccountRecord>,
    already_present: Vec<u64>,
    failed: Vec<SeedFailure>,
}

#[derive(Serialize)]
struct SeedFailure {
    account: String,
    error: String,
}

fn output<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to encode output")?
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,frontier_crawler=debug,twitter_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    match cli.command {
        Commands::Run {
            frontier_size,
            epsilon,
            keywords,
        } => {
            if let Some(size) = frontier_size {
                config.frontier_size = size;
            }
            if let Some(epsilon) = epsilon {
                config.epsilon = epsilon;
            }
            if !keywords.is_empty() {
                config.keywords = keywords;
            }
            run(&config).await
        }
        Commands::Seed { ids, screen_names } => seed(&config, ids, screen_names).await,
        Commands::Top { limit } => top(&config, limit),
        Commands::Migrate => migrate(&config),
    }
}

async fn run(config: &Config) -> Result<()> {
    let client = TwitterClient::new(config.bearer_token()?.to_string());
    let fetcher = TwitterFetcher::new(client)
        .rate_limited_per_minute(config.requests_per_minute)
        .context("Invalid CRAWL_REQUESTS_PER_MINUTE")?;
    let sink = DailyFileSink::new(config.posts_dir());

    let scheduler = CrawlScheduler::new(config.crawl_config(), fetcher, sink)
        .context("Invalid crawl configuration")?;

    tracing::info!(
        store = %config.store_path().display(),
        keywords = config.keywords.len(),
        "Starting crawl"
    );
    let report = scheduler
        .run_cycle(config.store_path())
        .await
        .context("Crawl cycle failed")?;

    output(&report.summary())
}

async fn seed(config: &Config, ids: Vec<u64>, screen_names: Vec<String>) -> Result<()> {
    if ids.is_empty() && screen_names.is_empty() {
        bail!("Pass at least one --id or --screen-name");
    }

    let client = TwitterClient::new(config.bearer_token()?.to_string());
    let path = config.store_path();
    let mut store = ScoreStore::load_if_exists(&path)
        .with_context(|| format!("Failed to load {}", path.display()))?
        .unwrap_or_default();

    let lookups = ids
        .into_iter()
        .map(UserLookup::Id)
        .chain(screen_names.into_iter().map(UserLookup::ScreenName));

    let mut response = SeedResponse {
        added: Vec::new(),
        already_present: Vec::new(),
        failed: Vec::new(),
    };

    for lookup in lookups {
        match client.lookup_user(&lookup).await {
            Ok(user) => {
                let record = AccountRecord::seeded(user.id, user.screen_name);
                if store.insert_new(record.clone()) {
                    tracing::info!(account_id = user.id, "Seeded account");
                    response.added.push(record);
                } else {
                    response.already_present.push(user.id);
                }
            }
            Err(e) => {
                tracing::warn!(account = %lookup, error = %e, "Profile lookup failed");
                response.failed.push(SeedFailure {
                    account: lookup.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    if !response.added.is_empty() {
        store
            .save(&path)
            .with_context(|| format!("Failed to save {}", path.display()))?;
    }

    output(&response)
}

fn top(config: &Config, limit: usize) -> Result<()> {
    let path = config.store_path();
    let store = ScoreStore::load_if_exists(&path)
        .with_context(|| format!("Failed to load {}", path.display()))?
        .unwrap_or_default();

    let ranked: Vec<&AccountRecord> = store
        .ordered_account_ids()
        .into_iter()
        .take(limit)
        .filter_map(|id| store.get(id))
        .collect();

    output(&ranked)
}

fn migrate(config: &Config) -> Result<()> {
    let path = config.store_path();
    let report =
        migrate_file(&path).with_context(|| format!("Failed to migrate {}", path.display()))?;
    output(&report)
}
