use anyhow::anyhow;
use clap::{Parser, Subcommand};
use mn_core::{ArticleFilters, CacheConfig, Category, ProviderSettings, RefreshTrigger};
use mn_engine::NewsCache;
use mn_providers::{GnewsSource, MockSource, NewsDataSource, NewsSource};
use mn_storage::MemoryStore;
use std::str::FromStr;
use std::sync::{Arc, Once};
use std::time::Duration;
use tracing::{info, warn, Level};

static INIT: Once = Once::new();

fn init_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt().with_max_level(Level::INFO).init();
    });
}

#[derive(Debug, Clone)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_unit = false;

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if let Ok(num) = current_number.parse::<u64>() {
                match c {
                    's' => total_seconds += num,
                    'm' => total_seconds += num * 60,
                    'h' => total_seconds += num * 3600,
                    'd' => total_seconds += num * 86400,
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                }
                current_number.clear();
                has_unit = true;
            } else if !c.is_whitespace() {
                return Err(format!("Invalid character in duration: {}", c));
            }
        }

        // A bare number means seconds.
        if !current_number.is_empty() {
            match current_number.parse::<u64>() {
                Ok(num) => {
                    total_seconds += num;
                    has_unit = true;
                }
                Err(_) => return Err("Invalid number in duration".to_string()),
            }
        }

        if !has_unit {
            return Err("Duration must include a number".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

#[derive(Parser)]
#[command(name = "marketnews", about = "Financial news cache engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one refresh to completion
    Refresh {
        /// Trigger recorded in the audit log: auto, manual or scheduled
        #[arg(long, default_value = "manual")]
        trigger: String,
    },
    /// Query the active corpus
    Articles {
        #[arg(long)]
        ticker: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        days_old: Option<i64>,
        #[arg(long)]
        min_relevance: Option<f64>,
        #[arg(long)]
        limit: Option<usize>,
        /// Group output by ticker
        #[arg(long)]
        grouped: bool,
        /// Refresh first if the corpus is stale
        #[arg(long)]
        fresh: bool,
    },
    /// Print cache statistics
    Stats,
    /// Print recent refresh runs
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Aggregate refresh outcomes over a window
    RefreshStats {
        #[arg(long, default_value_t = 7)]
        window_days: i64,
    },
    /// Periodic scheduled refresh loop
    Watch {
        #[arg(long, default_value = "15m")]
        interval: HumanDuration,
    },
}

fn parse_trigger(raw: &str) -> anyhow::Result<RefreshTrigger> {
    match raw.to_ascii_lowercase().as_str() {
        "auto" => Ok(RefreshTrigger::Auto),
        "manual" => Ok(RefreshTrigger::Manual),
        "scheduled" => Ok(RefreshTrigger::Scheduled),
        other => Err(anyhow!("unknown trigger: {}", other)),
    }
}

/// Builds the source chain from the environment: configured providers in
/// order, mock generator last.
fn build_sources(config: &CacheConfig) -> anyhow::Result<Vec<Arc<dyn NewsSource>>> {
    let mut sources: Vec<Arc<dyn NewsSource>> = Vec::new();

    let newsdata = match std::env::var("NEWSDATA_API_KEY") {
        Ok(key) if !key.is_empty() => ProviderSettings::with_api_key(key),
        _ => ProviderSettings::default(),
    };
    sources.push(Arc::new(NewsDataSource::new(newsdata, config.http_timeout)?));

    let gnews = match std::env::var("GNEWS_API_KEY") {
        Ok(key) if !key.is_empty() => ProviderSettings::with_api_key(key),
        _ => ProviderSettings::default(),
    };
    sources.push(Arc::new(GnewsSource::new(gnews, config.http_timeout)?));

    sources.push(Arc::new(MockSource::new()));
    Ok(sources)
}

fn print_article(article: &mn_core::Article) {
    println!(
        "  [{:.2}] {} — {} ({}, {})",
        article.relevance_score,
        article.title,
        article.source,
        article.category,
        article.published_at.format("%Y-%m-%d %H:%M"),
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config = CacheConfig::default();
    let store = Arc::new(MemoryStore::new());
    let sources = build_sources(&config)?;
    let cache = NewsCache::new(store.clone(), store, sources, config.clone());

    match cli.command {
        Commands::Refresh { trigger } => {
            let trigger = parse_trigger(&trigger)?;
            let outcome = cache.refresh(trigger).await?;
            info!(
                "🗞️ refresh {:?}: {} active articles ({:.1}% within 3 days)",
                outcome.status,
                outcome.distribution.total,
                outcome.distribution.pct_within_3_days
            );
        }
        Commands::Articles {
            ticker,
            category,
            days_old,
            min_relevance,
            limit,
            grouped,
            fresh,
        } => {
            let category = match category {
                Some(raw) => Some(Category::from_str(&raw).map_err(|e| anyhow!(e))?),
                None => None,
            };
            let filters = ArticleFilters {
                ticker,
                category,
                days_old,
                min_relevance,
                limit,
            };
            if grouped {
                let groups = cache.get_articles_grouped(&filters).await?;
                for (ticker, articles) in groups {
                    println!("{}:", ticker);
                    for article in &articles {
                        print_article(article);
                    }
                }
            } else {
                let articles = if fresh {
                    cache.get_articles_with_refresh(&filters).await?
                } else {
                    cache.get_articles(&filters).await?
                };
                for article in &articles {
                    print_article(article);
                }
            }
        }
        Commands::Stats => {
            let stats = cache.get_cache_stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::History { limit } => {
            let logs = cache.get_refresh_history(limit).await?;
            println!("{}", serde_json::to_string_pretty(&logs)?);
        }
        Commands::RefreshStats { window_days } => {
            let stats = cache.get_refresh_stats(window_days).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Watch { interval } => {
            info!("⏰ watching: scheduled refresh every {:?}", interval.0);
            let mut ticker = tokio::time::interval(interval.0);
            loop {
                ticker.tick().await;
                match cache.needs_refresh().await {
                    Ok(false) => info!("😴 corpus fresh, skipping refresh"),
                    Ok(true) => match cache.refresh(RefreshTrigger::Scheduled).await {
                        Ok(outcome) => info!(
                            "🗞️ scheduled refresh {:?}: {} active articles",
                            outcome.status, outcome.distribution.total
                        ),
                        Err(e) => warn!("⚠️ scheduled refresh failed: {}", e),
                    },
                    Err(e) => warn!("⚠️ staleness check failed: {}", e),
                }
            }
        }
    }

    Ok(())
}
