use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Soft-delete status flag. Archived articles stay in the store forever;
/// the engine never removes rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Active,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Markets,
    Earnings,
    Economy,
    Crypto,
    Commodities,
    General,
}

impl Default for Category {
    fn default() -> Self {
        Self::General
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Category::Markets => "markets",
            Category::Earnings => "earnings",
            Category::Economy => "economy",
            Category::Crypto => "crypto",
            Category::Commodities => "commodities",
            Category::General => "general",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "markets" | "business" => Ok(Category::Markets),
            "earnings" => Ok(Category::Earnings),
            "economy" => Ok(Category::Economy),
            "crypto" | "cryptocurrency" => Ok(Category::Crypto),
            "commodities" => Ok(Category::Commodities),
            "general" | "top" | "world" => Ok(Category::General),
            other => Err(format!("unknown category: {}", other)),
        }
    }
}

/// Secondary identity key: catches the same story re-published under a
/// different URL path by the same outlet.
pub fn content_hash(title: &str, source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.trim().to_lowercase().as_bytes());
    hasher.update(b"|");
    hasher.update(source.trim().to_lowercase().as_bytes());
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub source: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub summary: String,
    pub full_text: Option<String>,
    pub ticker: Option<String>,
    pub category: Category,
    pub sentiment: f64,
    pub relevance_score: f64,
    pub tags: BTreeSet<String>,
    pub content_hash: String,
    pub status: ArticleStatus,
    pub access_count: u64,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub scraped_at: DateTime<Utc>,
}

impl Article {
    pub fn is_active(&self) -> bool {
        self.status == ArticleStatus::Active
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.published_at
    }
}

/// Provider-agnostic candidate produced by an adapter, before dedup and
/// persistence. Carries only what adapters can reliably normalize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedArticle {
    pub title: String,
    pub url: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub summary: String,
    pub full_text: Option<String>,
    pub ticker: Option<String>,
    pub category: Category,
    pub tags: BTreeSet<String>,
    pub relevance_score: f64,
    pub sentiment: f64,
}

impl NormalizedArticle {
    /// Required fields per the ingestion contract. Candidates failing this
    /// are counted as invalid and never reach the deduplicator.
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty()
            && !self.url.trim().is_empty()
            && !self.source.trim().is_empty()
            && !self.summary.trim().is_empty()
    }

    pub fn into_article(self, now: DateTime<Utc>) -> Article {
        let hash = content_hash(&self.title, &self.source);
        Article {
            id: Uuid::new_v4(),
            title: self.title,
            source: self.source,
            url: self.url,
            published_at: self.published_at,
            summary: self.summary,
            full_text: self.full_text,
            ticker: self.ticker,
            category: self.category,
            sentiment: self.sentiment.clamp(-1.0, 1.0),
            relevance_score: self.relevance_score.clamp(0.0, 1.0),
            tags: self.tags,
            content_hash: hash,
            status: ArticleStatus::Active,
            access_count: 0,
            last_accessed_at: None,
            scraped_at: now,
        }
    }
}

/// Recency statistics over the active corpus. Every consumer of recency
/// percentages goes through this struct rather than re-counting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionStats {
    pub total: u64,
    pub within_3_days: u64,
    pub within_week: u64,
    pub pct_within_3_days: f64,
    pub pct_within_week: f64,
    pub oldest: Option<DateTime<Utc>>,
}

impl DistributionStats {
    pub fn empty() -> Self {
        Self {
            total: 0,
            within_3_days: 0,
            within_week: 0,
            pct_within_3_days: 0.0,
            pct_within_week: 0.0,
            oldest: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshTrigger {
    Auto,
    Manual,
    Scheduled,
}

impl std::fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshTrigger::Auto => f.write_str("auto"),
            RefreshTrigger::Manual => f.write_str("manual"),
            RefreshTrigger::Scheduled => f.write_str("scheduled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Partial,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

/// Per-sub-query outcome. `source` carries the sub-query label, e.g.
/// "newsdata:earnings" — one adapter produces several of these per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceStat {
    pub source: String,
    pub found: u64,
    pub added: u64,
    pub duplicates: u64,
    pub error: Option<String>,
}

impl SourceStat {
    pub fn failed(source: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            found: 0,
            added: 0,
            duplicates: 0,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunTotals {
    pub found: u64,
    pub added: u64,
    pub duplicates_skipped: u64,
    pub invalid_skipped: u64,
    pub archived: u64,
}

/// Durable audit record of one refresh run. Created with status Running,
/// always finalized to a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshLog {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub sources: Vec<SourceStat>,
    pub totals: RunTotals,
    pub distribution_before: Option<DistributionStats>,
    pub distribution_after: Option<DistributionStats>,
    pub status: RunStatus,
    pub errors: Vec<String>,
    pub triggered_by: RefreshTrigger,
}

impl RefreshLog {
    pub fn begin(triggered_by: RefreshTrigger, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at,
            finished_at: None,
            duration_ms: None,
            sources: Vec::new(),
            totals: RunTotals::default(),
            distribution_before: None,
            distribution_after: None,
            status: RunStatus::Running,
            errors: Vec::new(),
            triggered_by,
        }
    }
}

/// Read-path filters for `get_articles`.
#[derive(Debug, Clone, Default)]
pub struct ArticleFilters {
    pub ticker: Option<String>,
    pub category: Option<Category>,
    pub days_old: Option<i64>,
    pub min_relevance: Option<f64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub active_articles: u64,
    pub archived_articles: u64,
    pub by_category: Vec<(String, u64)>,
    pub by_source: Vec<(String, u64)>,
    pub distribution: DistributionStats,
    pub refresh_runs: u64,
    pub last_refresh: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshStats {
    pub window_days: i64,
    pub runs: u64,
    pub completed: u64,
    pub partial: u64,
    pub failed: u64,
    pub articles_added: u64,
    pub duplicates_skipped: u64,
    pub avg_duration_ms: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn candidate() -> NormalizedArticle {
        NormalizedArticle {
            title: "Fed holds rates steady".to_string(),
            url: "https://example.com/fed-rates".to_string(),
            source: "example".to_string(),
            published_at: Utc::now(),
            summary: "The Fed left its target range unchanged.".to_string(),
            full_text: None,
            ticker: None,
            category: Category::Economy,
            tags: BTreeSet::new(),
            relevance_score: 0.8,
            sentiment: 0.1,
        }
    }

    #[test]
    fn content_hash_normalizes_case_and_whitespace() {
        let a = content_hash("  Fed Holds Rates ", "Reuters");
        let b = content_hash("fed holds rates", "reuters");
        assert_eq!(a, b);
        assert_ne!(a, content_hash("fed holds rates", "bloomberg"));
    }

    #[test]
    fn validation_rejects_missing_required_fields() {
        assert!(candidate().is_valid());
        let mut c = candidate();
        c.title = "   ".to_string();
        assert!(!c.is_valid());
        let mut c = candidate();
        c.url = String::new();
        assert!(!c.is_valid());
        let mut c = candidate();
        c.summary = String::new();
        assert!(!c.is_valid());
    }

    #[test]
    fn into_article_clamps_scores_and_sets_hash() {
        let mut c = candidate();
        c.relevance_score = 1.7;
        c.sentiment = -3.0;
        let article = c.into_article(Utc::now());
        assert_eq!(article.relevance_score, 1.0);
        assert_eq!(article.sentiment, -1.0);
        assert_eq!(
            article.content_hash,
            content_hash("Fed holds rates steady", "example")
        );
        assert_eq!(article.status, ArticleStatus::Active);
        assert_eq!(article.access_count, 0);
    }
}
