use std::time::Duration;

/// Corpus and scheduling knobs for the cache engine. Constructed once by
/// the caller and injected; there is no global configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Minimum active corpus size the engine tries to maintain. Also the
    /// candidate target a refresh run fills toward.
    pub min_articles: u64,
    /// Active corpus size above which pruning kicks in.
    pub max_articles: u64,
    /// Elapsed time after which a read is considered stale.
    pub refresh_interval: Duration,
    /// Cleanup runs at most once per this interval, tracked separately
    /// from the refresh interval.
    pub cleanup_interval: Duration,
    /// Recency floors consulted by `needs_refresh`.
    pub floor_pct_3_days: f64,
    pub floor_pct_week: f64,
    /// Recency targets used by pruning bucket sizing.
    pub target_pct_3_days: f64,
    pub target_pct_week: f64,
    /// Articles older than this are cleanup candidates.
    pub max_age_days: i64,
    /// Cap on archivals per cleanup invocation.
    pub cleanup_batch_cap: usize,
    /// Bounded timeout for every upstream HTTP call.
    pub http_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            min_articles: 750,
            max_articles: 1500,
            refresh_interval: Duration::from_secs(60 * 60),
            cleanup_interval: Duration::from_secs(6 * 60 * 60),
            floor_pct_3_days: 40.0,
            floor_pct_week: 75.0,
            target_pct_3_days: 45.0,
            target_pct_week: 80.0,
            max_age_days: 90,
            cleanup_batch_cap: 100,
            http_timeout: Duration::from_secs(10),
        }
    }
}

/// Per-provider settings. A `None` api_key means the provider is simply
/// not configured; adapters return empty without a network call.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub query_terms: Vec<String>,
    pub categories: Vec<String>,
    pub locales: Vec<String>,
    pub page_size: usize,
    /// Upper bound on sub-queries issued per run.
    pub max_requests: usize,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            query_terms: vec![
                "stock market".to_string(),
                "earnings".to_string(),
                "federal reserve".to_string(),
            ],
            categories: vec!["business".to_string()],
            locales: vec!["us".to_string()],
            page_size: 10,
            max_requests: 12,
        }
    }
}

impl ProviderSettings {
    pub fn with_api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().map_or(false, |k| !k.is_empty())
    }
}
