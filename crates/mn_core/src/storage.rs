use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::{Article, RefreshLog};
use crate::Result;

/// Why an insert attempt did not produce a new active row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKind {
    Url,
    ContentHash,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(Uuid),
    Duplicate(DuplicateKind),
}

/// Persistence collaborator for articles. Implementations must make
/// `insert` idempotent per active URL: the store re-checks URL and content
/// hash among active rows under its own lock, so a racing duplicate insert
/// resolves to `Duplicate`, never a second active row.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn insert(&self, article: Article) -> Result<InsertOutcome>;

    /// Active rows only; archived articles never block re-acceptance.
    async fn find_by_url(&self, url: &str) -> Result<Option<Article>>;

    /// Active rows only.
    async fn find_by_content_hash(&self, hash: &str) -> Result<Option<Article>>;

    async fn active_articles(&self) -> Result<Vec<Article>>;

    async fn count_active(&self) -> Result<u64>;

    async fn count_archived(&self) -> Result<u64>;

    /// Bulk soft-delete: flips status to Archived. Returns the number of
    /// rows actually flipped.
    async fn archive(&self, urls: &[String]) -> Result<u64>;

    /// Read-path bookkeeping: access_count += 1, last_accessed_at = now.
    async fn record_access(&self, urls: &[String]) -> Result<()>;
}

/// Persistence collaborator for refresh audit logs. Logs are retained
/// indefinitely; this trait has no delete.
#[async_trait]
pub trait RefreshLogStore: Send + Sync {
    async fn insert_log(&self, log: RefreshLog) -> Result<()>;

    /// In-place replacement by id. Errors if the id is unknown.
    async fn update_log(&self, log: RefreshLog) -> Result<()>;

    /// Most recent first.
    async fn recent_logs(&self, limit: usize) -> Result<Vec<RefreshLog>>;

    async fn logs_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<RefreshLog>>;

    async fn count_logs(&self) -> Result<u64>;
}
