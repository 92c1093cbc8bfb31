use chrono::{Duration, Utc};
use mn_core::{Article, ArticleStore, CacheConfig, Result};
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::info;

use crate::distribution::DistributionAnalyzer;

/// Why a retention pass declined to act. A decline is a structured
/// outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionSkipReason {
    MinimumNotMet,
    WeekWindowAtRisk,
    IntervalNotElapsed,
    NothingOutdated,
    AtOrUnderTarget,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetentionResult {
    pub archived: u64,
    pub reason: Option<RetentionSkipReason>,
}

impl RetentionResult {
    pub fn archived(n: u64) -> Self {
        Self {
            archived: n,
            reason: None,
        }
    }

    pub fn skipped(reason: RetentionSkipReason) -> Self {
        Self {
            archived: 0,
            reason: Some(reason),
        }
    }
}

/// Archives outdated and excess articles without ever violating the
/// distribution invariants it exists to maintain. All removals are soft
/// deletes; nothing is ever physically removed.
pub struct RetentionManager {
    store: Arc<dyn ArticleStore>,
    config: CacheConfig,
}

impl RetentionManager {
    pub fn new(store: Arc<dyn ArticleStore>, config: CacheConfig) -> Self {
        Self { store, config }
    }

    /// Soft-deletes articles older than `config.max_age_days`, least
    /// valuable first, capped per invocation. Guarded no-op when the pass
    /// would leave the corpus under `keep_minimum`, or when the 7-day
    /// window is already below 75% of `keep_minimum`.
    pub async fn cleanup_outdated(&self, keep_minimum: u64) -> Result<RetentionResult> {
        let articles = self.store.active_articles().await?;
        let stats = DistributionAnalyzer::compute(&articles, Utc::now());

        if stats.total <= keep_minimum {
            return Ok(RetentionResult::skipped(RetentionSkipReason::MinimumNotMet));
        }
        if (stats.within_week as f64) < keep_minimum as f64 * 0.75 {
            return Ok(RetentionResult::skipped(
                RetentionSkipReason::WeekWindowAtRisk,
            ));
        }

        let cutoff = Utc::now() - Duration::days(self.config.max_age_days);
        let mut victims: Vec<&Article> = articles
            .iter()
            .filter(|a| a.published_at < cutoff)
            .collect();
        if victims.is_empty() {
            return Ok(RetentionResult::skipped(RetentionSkipReason::NothingOutdated));
        }

        // Least valuable, least accessed, oldest first.
        victims.sort_by(|a, b| {
            a.relevance_score
                .partial_cmp(&b.relevance_score)
                .unwrap_or(Ordering::Equal)
                .then(a.access_count.cmp(&b.access_count))
                .then(a.published_at.cmp(&b.published_at))
        });

        let headroom = (stats.total - keep_minimum) as usize;
        let take = victims
            .len()
            .min(headroom)
            .min(self.config.cleanup_batch_cap);
        if take == 0 {
            return Ok(RetentionResult::skipped(RetentionSkipReason::MinimumNotMet));
        }

        let urls: Vec<String> = victims[..take].iter().map(|a| a.url.clone()).collect();
        let archived = self.store.archive(&urls).await?;
        info!("🧹 cleanup archived {} outdated articles", archived);
        Ok(RetentionResult::archived(archived))
    }

    /// Trims an oversized corpus back toward the target recency shape.
    /// Partitions active articles into three age buckets, keeps the
    /// highest-relevance, most recent top-N per bucket, archives the rest.
    pub async fn prune_to_distribution(
        &self,
        target_total: u64,
        target_pct_3_days: f64,
        target_pct_week: f64,
    ) -> Result<RetentionResult> {
        let articles = self.store.active_articles().await?;
        let total = articles.len() as u64;
        if total <= target_total {
            return Ok(RetentionResult::skipped(RetentionSkipReason::AtOrUnderTarget));
        }

        let now = Utc::now();
        let mut fresh = Vec::new();
        let mut mid = Vec::new();
        let mut old = Vec::new();
        for article in articles {
            let age = now - article.published_at;
            if age <= Duration::days(3) {
                fresh.push(article);
            } else if age <= Duration::days(7) {
                mid.push(article);
            } else {
                old.push(article);
            }
        }

        let keep_fresh = (target_total as f64 * target_pct_3_days / 100.0).round() as usize;
        let keep_week = (target_total as f64 * target_pct_week / 100.0).round() as usize;
        let keep_mid = keep_week.saturating_sub(keep_fresh);
        let keep_old = (target_total as usize).saturating_sub(keep_week);

        let mut doomed = Vec::new();
        for (bucket, keep) in [(fresh, keep_fresh), (mid, keep_mid), (old, keep_old)] {
            doomed.extend(bucket_overflow(bucket, keep));
        }
        if doomed.is_empty() {
            return Ok(RetentionResult::skipped(RetentionSkipReason::AtOrUnderTarget));
        }

        let archived = self.store.archive(&doomed).await?;
        info!("✂️ pruning archived {} excess articles", archived);
        Ok(RetentionResult::archived(archived))
    }
}

/// Sorts a bucket by relevance desc then recency desc and returns the
/// URLs past the keep line.
fn bucket_overflow(mut bucket: Vec<Article>, keep: usize) -> Vec<String> {
    bucket.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(Ordering::Equal)
            .then(b.published_at.cmp(&a.published_at))
    });
    bucket.drain(..bucket.len().min(keep));
    bucket.into_iter().map(|a| a.url).collect()
}
