pub mod dedup;
pub mod distribution;
pub mod orchestrator;
pub mod retention;
pub mod service;

pub use dedup::Deduplicator;
pub use distribution::DistributionAnalyzer;
pub use orchestrator::{RefreshOrchestrator, RefreshOutcome};
pub use retention::{RetentionManager, RetentionResult, RetentionSkipReason};
pub use service::NewsCache;
