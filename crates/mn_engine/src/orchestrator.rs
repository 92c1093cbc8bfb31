use chrono::{DateTime, Utc};
use mn_core::{
    ArticleStore, CacheConfig, DistributionStats, Error, RefreshLog, RefreshLogStore,
    RefreshTrigger, Result, RunStatus,
};
use mn_core::storage::InsertOutcome;
use mn_providers::NewsSource;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::dedup::Deduplicator;
use crate::distribution::DistributionAnalyzer;
use crate::retention::{RetentionManager, RetentionResult, RetentionSkipReason};

#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub success: bool,
    pub status: RunStatus,
    pub distribution: DistributionStats,
    pub log_id: Uuid,
}

/// Drives one refresh run: sources in order, dedup, persist, retention,
/// audit log. One instance owns the run-in-progress guard and the
/// last-refresh / last-cleanup timestamps; construct it once and share it
/// by `Arc`.
pub struct RefreshOrchestrator {
    articles: Arc<dyn ArticleStore>,
    logs: Arc<dyn RefreshLogStore>,
    sources: Vec<Arc<dyn NewsSource>>,
    config: CacheConfig,
    dedup: Deduplicator,
    retention: RetentionManager,
    running: AtomicBool,
    last_refresh: RwLock<Option<DateTime<Utc>>>,
    last_cleanup: RwLock<Option<DateTime<Utc>>>,
}

/// Clears the run-in-progress flag on every exit path, including
/// cancellation.
struct RunFlagGuard<'a>(&'a AtomicBool);

impl Drop for RunFlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owns the in-flight log and guarantees it reaches a terminal status.
/// On the normal path the orchestrator defuses it and finalizes inline;
/// if the refresh future is cancelled mid-run, Drop finalizes the log as
/// failed/cancelled on the runtime instead of abandoning it as Running.
struct LogFinalizer {
    logs: Arc<dyn RefreshLogStore>,
    log: Option<RefreshLog>,
}

impl LogFinalizer {
    fn defuse(&mut self) -> Option<RefreshLog> {
        self.log.take()
    }
}

impl Drop for LogFinalizer {
    fn drop(&mut self) {
        if let Some(mut log) = self.log.take() {
            log.status = RunStatus::Failed;
            log.errors.push("cancelled".to_string());
            let finished = Utc::now();
            log.finished_at = Some(finished);
            log.duration_ms = Some((finished - log.started_at).num_milliseconds());
            let logs = self.logs.clone();
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    if let Err(e) = logs.update_log(log).await {
                        error!("💥 failed to finalize cancelled refresh log: {}", e);
                    }
                });
            }
        }
    }
}

impl RefreshOrchestrator {
    pub fn new(
        articles: Arc<dyn ArticleStore>,
        logs: Arc<dyn RefreshLogStore>,
        sources: Vec<Arc<dyn NewsSource>>,
        config: CacheConfig,
    ) -> Self {
        let dedup = Deduplicator::new(articles.clone());
        let retention = RetentionManager::new(articles.clone(), config.clone());
        Self {
            articles,
            logs,
            sources,
            config,
            dedup,
            retention,
            running: AtomicBool::new(false),
            last_refresh: RwLock::new(None),
            last_cleanup: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub async fn last_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_refresh.read().await
    }

    /// Stale-read check consulted by the scheduler and the lazy read path.
    /// True when no successful refresh has happened, the refresh interval
    /// has elapsed, or the active corpus has drifted under the recency
    /// floors.
    pub async fn needs_refresh(&self) -> Result<bool> {
        let last = *self.last_refresh.read().await;
        let Some(last) = last else {
            return Ok(true);
        };
        let elapsed = (Utc::now() - last).to_std().unwrap_or_default();
        if elapsed >= self.config.refresh_interval {
            return Ok(true);
        }
        let stats = DistributionAnalyzer::stats(self.articles.as_ref()).await?;
        Ok(stats.pct_within_3_days < self.config.floor_pct_3_days
            || stats.pct_within_week < self.config.floor_pct_week)
    }

    /// Runs one refresh to a terminal status. Returns
    /// `Error::RefreshInProgress` if another run holds the guard; raises
    /// on unrecoverable setup failure after attaching it to the log.
    pub async fn refresh(&self, triggered_by: RefreshTrigger) -> Result<RefreshOutcome> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::RefreshInProgress);
        }
        let _flag = RunFlagGuard(&self.running);

        let started = Utc::now();
        info!("🔄 refresh run starting (trigger: {})", triggered_by);
        let log = RefreshLog::begin(triggered_by, started);
        let log_id = log.id;
        self.logs.insert_log(log.clone()).await?;

        let mut finalizer = LogFinalizer {
            logs: self.logs.clone(),
            log: Some(log),
        };
        let run_result = match finalizer.log.as_mut() {
            Some(log) => self.run(log).await,
            None => Err(Error::Storage("refresh log lost before run".to_string())),
        };

        let Some(mut log) = finalizer.defuse() else {
            return Err(Error::Storage("refresh log lost during run".to_string()));
        };
        let finished = Utc::now();
        log.finished_at = Some(finished);
        log.duration_ms = Some((finished - started).num_milliseconds());

        let had_errors =
            !log.errors.is_empty() || log.sources.iter().any(|s| s.error.is_some());
        log.status = match &run_result {
            Ok(_) if !had_errors => RunStatus::Completed,
            Ok(_) => RunStatus::Partial,
            Err(e) => {
                log.errors.push(e.to_string());
                RunStatus::Failed
            }
        };
        let status = log.status;
        self.logs.update_log(log).await?;

        match run_result {
            Ok(distribution) => {
                *self.last_refresh.write().await = Some(finished);
                info!(
                    "✅ refresh run {} finished: {:?}, {} active articles",
                    log_id, status, distribution.total
                );
                Ok(RefreshOutcome {
                    success: true,
                    status,
                    distribution,
                    log_id,
                })
            }
            Err(e) => {
                error!("💥 refresh run {} failed: {}", log_id, e);
                Err(e)
            }
        }
    }

    /// Body of one run. Provider and per-article failures are recovered
    /// here; only whole-run failures bubble out.
    async fn run(&self, log: &mut RefreshLog) -> Result<DistributionStats> {
        log.distribution_before =
            Some(DistributionAnalyzer::stats(self.articles.as_ref()).await?);

        let mut seen = self.dedup.seed_urls().await?;
        let target = self.config.min_articles as usize;

        // Strategy chain: real providers in order, synthetic generator
        // last. Stop as soon as the candidate target is met.
        let mut candidates = Vec::new();
        for source in &self.sources {
            if candidates.len() >= target {
                break;
            }
            if !source.is_configured() {
                continue;
            }
            let remaining = target - candidates.len();
            let fetched = source.fetch(&mut seen, remaining).await;
            info!(
                "📰 source '{}' contributed {} candidates over {} sub-queries",
                source.name(),
                fetched.candidates.len(),
                fetched.stats.len()
            );
            candidates.extend(fetched.candidates);
            log.sources.extend(fetched.stats);
        }

        for stat in &log.sources {
            log.totals.found += stat.found;
            log.totals.duplicates_skipped += stat.duplicates;
        }

        for candidate in candidates {
            if !candidate.is_valid() {
                log.totals.invalid_skipped += 1;
                continue;
            }
            // URL dedup already happened against the run snapshot as the
            // adapters accepted candidates; this is the content-hash stage.
            if self.dedup.is_known_story(&candidate).await? {
                log.totals.duplicates_skipped += 1;
                continue;
            }
            let url = candidate.url.clone();
            match self.articles.insert(candidate.into_article(Utc::now())).await {
                Ok(InsertOutcome::Inserted(_)) => log.totals.added += 1,
                // Insert re-verified against the store and lost the race.
                Ok(InsertOutcome::Duplicate(_)) => log.totals.duplicates_skipped += 1,
                Err(e) => {
                    warn!("⚠️ skipping article '{}': {}", url, e);
                    log.errors.push(format!("insert {}: {}", url, e));
                }
            }
        }

        self.run_retention(log).await?;

        let after = DistributionAnalyzer::stats(self.articles.as_ref()).await?;
        log.distribution_after = Some(after.clone());
        Ok(after)
    }

    async fn run_retention(&self, log: &mut RefreshLog) -> Result<()> {
        let result = self.cleanup_now().await?;
        self.note_retention("cleanup", &result, log);

        let active = self.articles.count_active().await?;
        if active > self.config.max_articles {
            let result = self
                .retention
                .prune_to_distribution(
                    self.config.max_articles,
                    self.config.target_pct_3_days,
                    self.config.target_pct_week,
                )
                .await?;
            self.note_retention("pruning", &result, log);
        }
        Ok(())
    }

    /// Cleanup, rate-limited to once per `config.cleanup_interval`. The
    /// interval is tracked on this instance, independently of the refresh
    /// interval.
    pub async fn cleanup_now(&self) -> Result<RetentionResult> {
        {
            let last = *self.last_cleanup.read().await;
            if let Some(last) = last {
                let elapsed = (Utc::now() - last).to_std().unwrap_or_default();
                if elapsed < self.config.cleanup_interval {
                    return Ok(RetentionResult::skipped(
                        RetentionSkipReason::IntervalNotElapsed,
                    ));
                }
            }
        }
        *self.last_cleanup.write().await = Some(Utc::now());
        self.retention.cleanup_outdated(self.config.min_articles).await
    }

    fn note_retention(&self, what: &str, result: &RetentionResult, log: &mut RefreshLog) {
        log.totals.archived += result.archived;
        if let Some(reason) = result.reason {
            info!("🛡️ {} declined: {:?}", what, reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mn_core::types::NormalizedArticle;
    use mn_core::{Category, SourceStat};
    use mn_providers::FetchResult;
    use mn_storage::MemoryStore;
    use std::collections::{BTreeSet, HashSet};
    use std::time::Duration as StdDuration;

    fn candidate(url: &str, title: &str) -> NormalizedArticle {
        NormalizedArticle {
            title: title.to_string(),
            url: url.to_string(),
            source: "wire".to_string(),
            published_at: Utc::now(),
            summary: "s".to_string(),
            full_text: None,
            ticker: None,
            category: Category::Markets,
            tags: BTreeSet::new(),
            relevance_score: 0.7,
            sentiment: 0.0,
        }
    }

    /// Deterministic stand-in for a provider adapter: each batch is one
    /// sub-query, either a canned article list or a canned failure.
    struct ScriptedSource {
        name: String,
        configured: bool,
        batches: Vec<std::result::Result<Vec<NormalizedArticle>, String>>,
    }

    #[async_trait]
    impl NewsSource for ScriptedSource {
        fn name(&self) -> &str {
            &self.name
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn fetch(&self, seen: &mut HashSet<String>, target: usize) -> FetchResult {
            let mut result = FetchResult::default();
            for (i, batch) in self.batches.iter().enumerate() {
                if result.candidates.len() >= target {
                    break;
                }
                let label = format!("{}:{}", self.name, i);
                match batch {
                    Err(msg) => result.push_stat(SourceStat::failed(label, msg.clone())),
                    Ok(items) => {
                        let mut stat = SourceStat {
                            source: label,
                            found: items.len() as u64,
                            added: 0,
                            duplicates: 0,
                            error: None,
                        };
                        for item in items {
                            if seen.contains(&item.url) {
                                stat.duplicates += 1;
                                continue;
                            }
                            seen.insert(item.url.clone());
                            stat.added += 1;
                            result.candidates.push(item.clone());
                        }
                        result.push_stat(stat);
                    }
                }
            }
            result
        }
    }

    struct SlowSource;

    #[async_trait]
    impl NewsSource for SlowSource {
        fn name(&self) -> &str {
            "slow"
        }

        fn is_configured(&self) -> bool {
            true
        }

        async fn fetch(&self, _seen: &mut HashSet<String>, _target: usize) -> FetchResult {
            tokio::time::sleep(StdDuration::from_millis(250)).await;
            FetchResult::default()
        }
    }

    /// Fails every article read, which takes down the run at the
    /// distribution_before step.
    struct BrokenStore;

    #[async_trait]
    impl ArticleStore for BrokenStore {
        async fn insert(&self, _article: mn_core::Article) -> Result<InsertOutcome> {
            Err(Error::Storage("store offline".to_string()))
        }
        async fn find_by_url(&self, _url: &str) -> Result<Option<mn_core::Article>> {
            Err(Error::Storage("store offline".to_string()))
        }
        async fn find_by_content_hash(&self, _hash: &str) -> Result<Option<mn_core::Article>> {
            Err(Error::Storage("store offline".to_string()))
        }
        async fn active_articles(&self) -> Result<Vec<mn_core::Article>> {
            Err(Error::Storage("store offline".to_string()))
        }
        async fn count_active(&self) -> Result<u64> {
            Err(Error::Storage("store offline".to_string()))
        }
        async fn count_archived(&self) -> Result<u64> {
            Err(Error::Storage("store offline".to_string()))
        }
        async fn archive(&self, _urls: &[String]) -> Result<u64> {
            Err(Error::Storage("store offline".to_string()))
        }
        async fn record_access(&self, _urls: &[String]) -> Result<()> {
            Err(Error::Storage("store offline".to_string()))
        }
    }

    fn small_config() -> CacheConfig {
        CacheConfig {
            min_articles: 10,
            max_articles: 20,
            ..CacheConfig::default()
        }
    }

    fn orchestrator(
        store: Arc<MemoryStore>,
        sources: Vec<Arc<dyn NewsSource>>,
        config: CacheConfig,
    ) -> RefreshOrchestrator {
        RefreshOrchestrator::new(store.clone(), store, sources, config)
    }

    #[tokio::test]
    async fn scenario_one_provider_with_known_urls_completes() {
        let store = Arc::new(MemoryStore::new());
        // Two urls already active in the corpus.
        for url in ["http://x/1", "http://x/2"] {
            store
                .insert(candidate(url, &format!("seeded {}", url)).into_article(Utc::now()))
                .await
                .unwrap();
        }
        let provider_x = Arc::new(ScriptedSource {
            name: "x".to_string(),
            configured: true,
            batches: vec![Ok(vec![
                candidate("http://x/1", "known one"),
                candidate("http://x/2", "known two"),
                candidate("http://x/3", "novel three"),
                candidate("http://x/4", "novel four"),
                candidate("http://x/5", "novel five"),
            ])],
        });
        let provider_y = Arc::new(ScriptedSource {
            name: "y".to_string(),
            configured: false,
            batches: vec![Ok(vec![candidate("http://y/1", "never fetched")])],
        });

        let orch = orchestrator(store.clone(), vec![provider_x, provider_y], small_config());
        let outcome = orch.refresh(RefreshTrigger::Manual).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.status, RunStatus::Completed);

        let log = store.recent_logs(1).await.unwrap().pop().unwrap();
        assert_eq!(log.status, RunStatus::Completed);
        assert_eq!(log.totals.added, 3);
        assert_eq!(log.totals.duplicates_skipped, 2);
        assert_eq!(log.totals.found, 5);
        // Unconfigured provider contributed no stats at all.
        assert_eq!(log.sources.len(), 1);
        assert_eq!(store.count_active().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn scenario_failed_sub_query_degrades_to_partial() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(ScriptedSource {
            name: "x".to_string(),
            configured: true,
            batches: vec![
                Err("request timed out after 10s".to_string()),
                Ok(vec![
                    candidate("http://x/1", "one"),
                    candidate("http://x/2", "two"),
                    candidate("http://x/3", "three"),
                    candidate("http://x/4", "four"),
                ]),
            ],
        });
        let orch = orchestrator(store.clone(), vec![provider], small_config());
        let outcome = orch.refresh(RefreshTrigger::Scheduled).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.status, RunStatus::Partial);

        let log = store.recent_logs(1).await.unwrap().pop().unwrap();
        assert_eq!(log.status, RunStatus::Partial);
        assert_eq!(log.sources.len(), 2);
        assert!(log.sources[0].error.is_some());
        assert_eq!(log.sources[0].found, 0);
        assert!(log.sources[1].error.is_none());
        assert_eq!(log.sources[1].added, 4);
        assert_eq!(log.totals.added, 4);
    }

    #[tokio::test]
    async fn repeated_url_across_runs_counts_as_duplicate() {
        let store = Arc::new(MemoryStore::new());
        let make_provider = || {
            Arc::new(ScriptedSource {
                name: "x".to_string(),
                configured: true,
                batches: vec![Ok(vec![candidate("http://x/1", "same story")])],
            })
        };
        let orch = orchestrator(store.clone(), vec![make_provider()], small_config());
        orch.refresh(RefreshTrigger::Manual).await.unwrap();
        orch.refresh(RefreshTrigger::Manual).await.unwrap();

        assert_eq!(store.count_active().await.unwrap(), 1);
        let log = store.recent_logs(1).await.unwrap().pop().unwrap();
        assert_eq!(log.totals.added, 0);
        assert_eq!(log.totals.duplicates_skipped, 1);
    }

    #[tokio::test]
    async fn same_story_under_different_url_is_hash_duplicate() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(ScriptedSource {
            name: "x".to_string(),
            configured: true,
            batches: vec![Ok(vec![
                candidate("http://x/a", "Fed cuts rates"),
                candidate("http://mirror/a", "Fed cuts rates"),
            ])],
        });
        let orch = orchestrator(store.clone(), vec![provider], small_config());
        let outcome = orch.refresh(RefreshTrigger::Manual).await.unwrap();
        assert_eq!(outcome.status, RunStatus::Completed);

        let log = store.recent_logs(1).await.unwrap().pop().unwrap();
        assert_eq!(log.totals.added, 1);
        // URL check passed but the store's content-hash re-check caught it.
        assert_eq!(log.totals.duplicates_skipped, 1);
        assert_eq!(store.count_active().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn invalid_candidates_never_reach_the_store() {
        let store = Arc::new(MemoryStore::new());
        let mut no_summary = candidate("http://x/2", "two");
        no_summary.summary = String::new();
        let provider = Arc::new(ScriptedSource {
            name: "x".to_string(),
            configured: true,
            batches: vec![Ok(vec![candidate("http://x/1", "one"), no_summary])],
        });
        let orch = orchestrator(store.clone(), vec![provider], small_config());
        orch.refresh(RefreshTrigger::Manual).await.unwrap();

        let log = store.recent_logs(1).await.unwrap().pop().unwrap();
        assert_eq!(log.totals.added, 1);
        assert_eq!(log.totals.invalid_skipped, 1);
        assert_eq!(log.totals.duplicates_skipped, 0);
    }

    #[tokio::test]
    async fn mock_only_run_builds_a_compliant_corpus() {
        let store = Arc::new(MemoryStore::new());
        let config = CacheConfig {
            min_articles: 500,
            max_articles: 1000,
            ..CacheConfig::default()
        };
        let orch = orchestrator(
            store.clone(),
            vec![Arc::new(mn_providers::MockSource::new())],
            config,
        );
        let outcome = orch.refresh(RefreshTrigger::Auto).await.unwrap();
        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.distribution.total, 500);
        // Generator buckets (45/35/20) sit well above the floors; these
        // loose bounds hold with overwhelming probability at n=500.
        assert!(outcome.distribution.pct_within_3_days > 35.0);
        assert!(outcome.distribution.pct_within_week > 70.0);
    }

    #[tokio::test]
    async fn needs_refresh_transitions() {
        // Lenient floors keep the small random corpus out of the way;
        // floor behavior itself is covered by the drifted-corpus test.
        let lenient = CacheConfig {
            min_articles: 50,
            max_articles: 100,
            floor_pct_3_days: 5.0,
            floor_pct_week: 20.0,
            ..CacheConfig::default()
        };
        let store = Arc::new(MemoryStore::new());
        let orch = orchestrator(
            store.clone(),
            vec![Arc::new(mn_providers::MockSource::new())],
            lenient.clone(),
        );
        // Freshly constructed: no prior refresh.
        assert!(orch.needs_refresh().await.unwrap());
        orch.refresh(RefreshTrigger::Manual).await.unwrap();
        assert!(!orch.needs_refresh().await.unwrap());

        // Interval elapse flips it back even with a healthy corpus.
        let orch = orchestrator(
            store.clone(),
            vec![Arc::new(mn_providers::MockSource::new())],
            CacheConfig {
                refresh_interval: StdDuration::ZERO,
                ..lenient
            },
        );
        orch.refresh(RefreshTrigger::Manual).await.unwrap();
        assert!(orch.needs_refresh().await.unwrap());
    }

    #[tokio::test]
    async fn needs_refresh_fires_on_recency_drift() {
        let store = Arc::new(MemoryStore::new());
        // Corpus entirely older than a week.
        for n in 0..20 {
            let mut c = candidate(&format!("http://old/{}", n), &format!("stale {}", n));
            c.published_at = Utc::now() - chrono::Duration::days(30);
            store.insert(c.into_article(Utc::now())).await.unwrap();
        }
        let orch = orchestrator(store.clone(), vec![], small_config());
        orch.refresh(RefreshTrigger::Manual).await.unwrap();
        // Interval has not elapsed, but both floors are breached.
        assert!(orch.needs_refresh().await.unwrap());
    }

    #[tokio::test]
    async fn whole_run_failure_finalizes_the_log() {
        let logs = Arc::new(MemoryStore::new());
        let orch = RefreshOrchestrator::new(
            Arc::new(BrokenStore),
            logs.clone(),
            vec![],
            small_config(),
        );
        let err = orch.refresh(RefreshTrigger::Manual).await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));

        let log = logs.recent_logs(1).await.unwrap().pop().unwrap();
        assert_eq!(log.status, RunStatus::Failed);
        assert!(log.finished_at.is_some());
        assert!(log.errors.iter().any(|e| e.contains("store offline")));
        // A failed run does not count as a successful refresh.
        assert!(orch.last_refresh().await.is_none());
    }

    #[tokio::test]
    async fn overlapping_refresh_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let orch = Arc::new(orchestrator(
            store.clone(),
            vec![Arc::new(SlowSource)],
            small_config(),
        ));
        let first = {
            let orch = orch.clone();
            tokio::spawn(async move { orch.refresh(RefreshTrigger::Scheduled).await })
        };
        tokio::time::sleep(StdDuration::from_millis(50)).await;
        let second = orch.refresh(RefreshTrigger::Manual).await;
        assert!(matches!(second, Err(Error::RefreshInProgress)));
        // And only one log was ever created.
        first.await.unwrap().unwrap();
        assert_eq!(store.count_logs().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn cancelled_run_still_finalizes_the_log() {
        let store = Arc::new(MemoryStore::new());
        let orch = Arc::new(orchestrator(
            store.clone(),
            vec![Arc::new(SlowSource)],
            small_config(),
        ));
        let handle = {
            let orch = orch.clone();
            tokio::spawn(async move { orch.refresh(RefreshTrigger::Scheduled).await })
        };
        tokio::time::sleep(StdDuration::from_millis(50)).await;
        handle.abort();
        // Give the drop-spawned finalization a moment to land.
        tokio::time::sleep(StdDuration::from_millis(50)).await;

        let log = store.recent_logs(1).await.unwrap().pop().unwrap();
        assert_eq!(log.status, RunStatus::Failed);
        assert!(log.errors.iter().any(|e| e == "cancelled"));
        assert!(log.finished_at.is_some());
        // The guard was released; a new run can start.
        assert!(orch.refresh(RefreshTrigger::Manual).await.is_ok());
    }

    #[tokio::test]
    async fn pruning_trims_an_oversized_corpus() {
        let store = Arc::new(MemoryStore::new());
        let config = CacheConfig {
            min_articles: 50,
            max_articles: 60,
            ..CacheConfig::default()
        };
        let orch = orchestrator(
            store.clone(),
            vec![Arc::new(mn_providers::MockSource::new())],
            config,
        );
        orch.refresh(RefreshTrigger::Manual).await.unwrap();
        assert_eq!(store.count_active().await.unwrap(), 50);

        // Second run tops up with 50 more, overflowing max_articles.
        orch.refresh(RefreshTrigger::Manual).await.unwrap();
        // Per-bucket keeps can undershoot when the random age draw leaves
        // a bucket light, so the bound is an inequality.
        let active = store.count_active().await.unwrap();
        assert!(active <= 60, "active {} after prune", active);
        let log = store.recent_logs(1).await.unwrap().pop().unwrap();
        assert!(log.totals.archived >= 40);
        // Pruning archives, never deletes.
        assert_eq!(store.count_archived().await.unwrap(), log.totals.archived);
    }
}
