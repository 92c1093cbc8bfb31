use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mn_core::{Category, NormalizedArticle, ProviderSettings, Result, SourceStat};
use serde::Deserialize;
use std::collections::{BTreeSet, HashSet};
use std::time::Duration;
use tracing::{debug, warn};

use crate::source::{FetchResult, NewsSource};

const DEFAULT_BASE_URL: &str = "https://gnews.io";

/// Adapter for a gnews.io-style search endpoint. Issues one sub-query per
/// (locale, query term) pair, capped by `settings.max_requests`.
pub struct GnewsSource {
    settings: ProviderSettings,
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    articles: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    url: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    source: Option<SearchItemSource>,
}

#[derive(Debug, Deserialize)]
struct SearchItemSource {
    name: Option<String>,
}

impl GnewsSource {
    pub fn new(settings: ProviderSettings, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            settings,
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the adapter at a different host. Used by tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn sub_queries(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for locale in &self.settings.locales {
            for term in &self.settings.query_terms {
                pairs.push((locale.clone(), term.clone()));
            }
        }
        pairs.truncate(self.settings.max_requests);
        pairs
    }

    async fn run_sub_query(&self, locale: &str, term: &str) -> Result<Vec<SearchItem>> {
        let api_key = self.settings.api_key.as_deref().unwrap_or_default();
        let url = format!("{}/api/v4/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", term),
                ("country", locale),
                ("lang", "en"),
                ("max", &self.settings.page_size.to_string()),
                ("apikey", api_key),
            ])
            .send()
            .await?
            .error_for_status()?;
        let body: SearchResponse = response.json().await?;
        Ok(body.articles)
    }

    fn normalize(item: SearchItem, term: &str) -> Option<NormalizedArticle> {
        let url = item.url?;
        if url.trim().is_empty() {
            return None;
        }
        let published_at = item
            .published_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);
        let mut tags = BTreeSet::new();
        for word in term.split_whitespace() {
            tags.insert(word.to_lowercase());
        }
        Some(NormalizedArticle {
            title: item.title.unwrap_or_default(),
            url,
            source: item
                .source
                .and_then(|s| s.name)
                .unwrap_or_else(|| "gnews".to_string()),
            published_at,
            summary: item.description.unwrap_or_default(),
            full_text: item.content,
            ticker: None,
            category: Category::Markets,
            tags,
            relevance_score: 0.6,
            sentiment: 0.0,
        })
    }
}

#[async_trait]
impl NewsSource for GnewsSource {
    fn name(&self) -> &str {
        "gnews"
    }

    fn is_configured(&self) -> bool {
        self.settings.is_configured()
    }

    async fn fetch(&self, seen: &mut HashSet<String>, target: usize) -> FetchResult {
        let mut result = FetchResult::default();
        if !self.is_configured() {
            debug!("📭 gnews: no API key configured, skipping");
            return result;
        }

        for (locale, term) in self.sub_queries() {
            if result.candidates.len() >= target {
                debug!("🛑 gnews: candidate target reached, stopping early");
                break;
            }
            let label = format!("gnews:{}:{}", locale, term);
            match self.run_sub_query(&locale, &term).await {
                Ok(items) => {
                    let mut stat = SourceStat {
                        source: label,
                        found: items.len() as u64,
                        added: 0,
                        duplicates: 0,
                        error: None,
                    };
                    for item in items {
                        let Some(candidate) = Self::normalize(item, &term) else {
                            continue;
                        };
                        if seen.contains(&candidate.url) {
                            stat.duplicates += 1;
                            continue;
                        }
                        seen.insert(candidate.url.clone());
                        stat.added += 1;
                        result.candidates.push(candidate);
                    }
                    result.push_stat(stat);
                }
                Err(e) => {
                    warn!("⚠️ gnews sub-query '{}' failed: {}", term, e);
                    result.push_stat(SourceStat::failed(label, e.to_string()));
                }
            }
        }
        result
    }
}
