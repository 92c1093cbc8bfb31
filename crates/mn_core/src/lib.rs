pub mod config;
pub mod error;
pub mod storage;
pub mod types;

pub use config::{CacheConfig, ProviderSettings};
pub use error::Error;
pub use storage::{ArticleStore, DuplicateKind, InsertOutcome, RefreshLogStore};
pub use types::{
    content_hash, Article, ArticleFilters, ArticleStatus, CacheStats, Category,
    DistributionStats, NormalizedArticle, RefreshLog, RefreshStats, RefreshTrigger, RunStatus,
    RunTotals, SourceStat,
};

pub type Result<T> = std::result::Result<T, Error>;
