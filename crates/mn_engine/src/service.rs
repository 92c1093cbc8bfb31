use chrono::{Duration, Utc};
use mn_core::{
    Article, ArticleFilters, ArticleStore, CacheConfig, CacheStats, RefreshLog, RefreshLogStore,
    RefreshStats, RefreshTrigger, Result, RunStatus,
};
use mn_providers::NewsSource;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

use crate::distribution::DistributionAnalyzer;
use crate::orchestrator::{RefreshOrchestrator, RefreshOutcome};

const DEFAULT_READ_LIMIT: usize = 50;

/// Entry point collaborators hold. One instance per process, constructed
/// with its stores and source chain and passed by reference; all mutable
/// scheduling state lives on the orchestrator it owns.
pub struct NewsCache {
    articles: Arc<dyn ArticleStore>,
    logs: Arc<dyn RefreshLogStore>,
    orchestrator: RefreshOrchestrator,
}

impl NewsCache {
    pub fn new(
        articles: Arc<dyn ArticleStore>,
        logs: Arc<dyn RefreshLogStore>,
        sources: Vec<Arc<dyn NewsSource>>,
        config: CacheConfig,
    ) -> Self {
        let orchestrator =
            RefreshOrchestrator::new(articles.clone(), logs.clone(), sources, config);
        Self {
            articles,
            logs,
            orchestrator,
        }
    }

    pub async fn refresh(&self, triggered_by: RefreshTrigger) -> Result<RefreshOutcome> {
        self.orchestrator.refresh(triggered_by).await
    }

    pub async fn needs_refresh(&self) -> Result<bool> {
        self.orchestrator.needs_refresh().await
    }

    /// Filtered read over the active corpus, relevance desc then recency
    /// desc. Returned articles get their access counters bumped.
    pub async fn get_articles(&self, filters: &ArticleFilters) -> Result<Vec<Article>> {
        let now = Utc::now();
        let mut articles: Vec<Article> = self
            .articles
            .active_articles()
            .await?
            .into_iter()
            .filter(|a| matches_filters(a, filters, now))
            .collect();
        articles.sort_by(rank);
        articles.truncate(filters.limit.unwrap_or(DEFAULT_READ_LIMIT));

        let urls: Vec<String> = articles.iter().map(|a| a.url.clone()).collect();
        self.articles.record_access(&urls).await?;
        Ok(articles)
    }

    /// Same read, keyed by ticker; articles without a ticker fall under
    /// "general".
    pub async fn get_articles_grouped(
        &self,
        filters: &ArticleFilters,
    ) -> Result<BTreeMap<String, Vec<Article>>> {
        let articles = self.get_articles(filters).await?;
        let mut grouped: BTreeMap<String, Vec<Article>> = BTreeMap::new();
        for article in articles {
            let key = article
                .ticker
                .clone()
                .unwrap_or_else(|| "general".to_string());
            grouped.entry(key).or_default().push(article);
        }
        Ok(grouped)
    }

    /// Lazy read path: refreshes first when stale, but a refresh failure
    /// degrades to a best-effort read of the existing corpus rather than
    /// propagating to the reader.
    pub async fn get_articles_with_refresh(
        &self,
        filters: &ArticleFilters,
    ) -> Result<Vec<Article>> {
        if self.needs_refresh().await.unwrap_or(true) {
            if let Err(e) = self.refresh(RefreshTrigger::Auto).await {
                warn!("⚠️ stale-read refresh failed, serving existing corpus: {}", e);
            }
        }
        self.get_articles(filters).await
    }

    pub async fn get_cache_stats(&self) -> Result<CacheStats> {
        let articles = self.articles.active_articles().await?;
        let distribution = DistributionAnalyzer::compute(&articles, Utc::now());

        let mut by_category: BTreeMap<String, u64> = BTreeMap::new();
        let mut by_source: BTreeMap<String, u64> = BTreeMap::new();
        for article in &articles {
            *by_category.entry(article.category.to_string()).or_insert(0) += 1;
            *by_source.entry(article.source.clone()).or_insert(0) += 1;
        }

        Ok(CacheStats {
            active_articles: distribution.total,
            archived_articles: self.articles.count_archived().await?,
            by_category: by_category.into_iter().collect(),
            by_source: by_source.into_iter().collect(),
            distribution,
            refresh_runs: self.logs.count_logs().await?,
            last_refresh: self.orchestrator.last_refresh().await,
        })
    }

    pub async fn get_refresh_history(&self, limit: usize) -> Result<Vec<RefreshLog>> {
        self.logs.recent_logs(limit).await
    }

    pub async fn get_refresh_stats(&self, window_days: i64) -> Result<RefreshStats> {
        let cutoff = Utc::now() - Duration::days(window_days);
        let logs = self.logs.logs_since(cutoff).await?;

        let mut stats = RefreshStats {
            window_days,
            runs: logs.len() as u64,
            completed: 0,
            partial: 0,
            failed: 0,
            articles_added: 0,
            duplicates_skipped: 0,
            avg_duration_ms: None,
        };
        let mut durations = Vec::new();
        for log in &logs {
            match log.status {
                RunStatus::Completed => stats.completed += 1,
                RunStatus::Partial => stats.partial += 1,
                RunStatus::Failed => stats.failed += 1,
                RunStatus::Running => {}
            }
            stats.articles_added += log.totals.added;
            stats.duplicates_skipped += log.totals.duplicates_skipped;
            if let Some(ms) = log.duration_ms {
                durations.push(ms);
            }
        }
        if !durations.is_empty() {
            stats.avg_duration_ms = Some(durations.iter().sum::<i64>() / durations.len() as i64);
        }
        Ok(stats)
    }
}

fn matches_filters(
    article: &Article,
    filters: &ArticleFilters,
    now: chrono::DateTime<Utc>,
) -> bool {
    if let Some(ticker) = &filters.ticker {
        let wanted = ticker.to_uppercase();
        let by_field = article.ticker.as_deref() == Some(wanted.as_str());
        let by_tag = article.tags.contains(&ticker.to_lowercase());
        if !by_field && !by_tag {
            return false;
        }
    }
    if let Some(category) = filters.category {
        if article.category != category {
            return false;
        }
    }
    if let Some(days) = filters.days_old {
        if now - article.published_at > Duration::days(days) {
            return false;
        }
    }
    if let Some(min) = filters.min_relevance {
        if article.relevance_score < min {
            return false;
        }
    }
    true
}

fn rank(a: &Article, b: &Article) -> Ordering {
    b.relevance_score
        .partial_cmp(&a.relevance_score)
        .unwrap_or(Ordering::Equal)
        .then(b.published_at.cmp(&a.published_at))
}
