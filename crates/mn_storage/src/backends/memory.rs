use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mn_core::storage::{DuplicateKind, InsertOutcome};
use mn_core::{Article, ArticleStatus, ArticleStore, Error, RefreshLog, RefreshLogStore, Result};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    articles: Vec<Article>,
    logs: Vec<RefreshLog>,
}

impl Inner {
    fn active(&self) -> impl Iterator<Item = &Article> {
        self.articles.iter().filter(|a| a.is_active())
    }
}

/// In-memory backend. The single write lock makes insert's duplicate
/// re-check atomic with the append, which is what gives the engine its
/// idempotent-insert guarantee.
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn insert(&self, article: Article) -> Result<InsertOutcome> {
        let mut inner = self.inner.write().await;
        if inner.active().any(|a| a.url == article.url) {
            return Ok(InsertOutcome::Duplicate(DuplicateKind::Url));
        }
        if inner.active().any(|a| a.content_hash == article.content_hash) {
            return Ok(InsertOutcome::Duplicate(DuplicateKind::ContentHash));
        }
        let id = article.id;
        inner.articles.push(article);
        Ok(InsertOutcome::Inserted(id))
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<Article>> {
        let inner = self.inner.read().await;
        let found = inner.active().find(|a| a.url == url).cloned();
        Ok(found)
    }

    async fn find_by_content_hash(&self, hash: &str) -> Result<Option<Article>> {
        let inner = self.inner.read().await;
        let found = inner.active().find(|a| a.content_hash == hash).cloned();
        Ok(found)
    }

    async fn active_articles(&self) -> Result<Vec<Article>> {
        let inner = self.inner.read().await;
        Ok(inner.active().cloned().collect())
    }

    async fn count_active(&self) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(inner.active().count() as u64)
    }

    async fn count_archived(&self) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(inner.articles.iter().filter(|a| !a.is_active()).count() as u64)
    }

    async fn archive(&self, urls: &[String]) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let mut flipped = 0;
        for article in inner.articles.iter_mut() {
            if article.is_active() && urls.iter().any(|u| u == &article.url) {
                article.status = ArticleStatus::Archived;
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    async fn record_access(&self, urls: &[String]) -> Result<()> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        for article in inner.articles.iter_mut() {
            if urls.iter().any(|u| u == &article.url) {
                article.access_count += 1;
                article.last_accessed_at = Some(now);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RefreshLogStore for MemoryStore {
    async fn insert_log(&self, log: RefreshLog) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.logs.push(log);
        Ok(())
    }

    async fn update_log(&self, log: RefreshLog) -> Result<()> {
        let mut inner = self.inner.write().await;
        match inner.logs.iter_mut().find(|l| l.id == log.id) {
            Some(existing) => {
                *existing = log;
                Ok(())
            }
            None => Err(Error::Storage(format!("unknown refresh log: {}", log.id))),
        }
    }

    async fn recent_logs(&self, limit: usize) -> Result<Vec<RefreshLog>> {
        let inner = self.inner.read().await;
        let mut logs = inner.logs.clone();
        logs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        logs.truncate(limit);
        Ok(logs)
    }

    async fn logs_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<RefreshLog>> {
        let inner = self.inner.read().await;
        Ok(inner
            .logs
            .iter()
            .filter(|l| l.started_at >= cutoff)
            .cloned()
            .collect())
    }

    async fn count_logs(&self) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(inner.logs.len() as u64)
    }
}
