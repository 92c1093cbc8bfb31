use chrono::{DateTime, Duration, Utc};
use mn_core::{Article, ArticleStore, DistributionStats, Result};

/// Sole source of truth for recency percentages. `needs_refresh`, the
/// cleanup guard, and pruning targets all read from here rather than
/// re-deriving counts.
pub struct DistributionAnalyzer;

impl DistributionAnalyzer {
    pub async fn stats(store: &dyn ArticleStore) -> Result<DistributionStats> {
        let articles = store.active_articles().await?;
        Ok(Self::compute(&articles, Utc::now()))
    }

    pub fn compute(articles: &[Article], now: DateTime<Utc>) -> DistributionStats {
        let total = articles.len() as u64;
        if total == 0 {
            return DistributionStats::empty();
        }
        let within_3_days = articles
            .iter()
            .filter(|a| now - a.published_at <= Duration::days(3))
            .count() as u64;
        let within_week = articles
            .iter()
            .filter(|a| now - a.published_at <= Duration::days(7))
            .count() as u64;
        let oldest = articles.iter().map(|a| a.published_at).min();

        DistributionStats {
            total,
            within_3_days,
            within_week,
            pct_within_3_days: round_pct(within_3_days, total),
            pct_within_week: round_pct(within_week, total),
            oldest,
        }
    }
}

fn round_pct(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 1000.0).round() / 10.0
}
