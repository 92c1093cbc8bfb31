use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use mn_core::{Category, NormalizedArticle, ProviderSettings, Result, SourceStat};
use serde::Deserialize;
use std::collections::{BTreeSet, HashSet};
use std::time::Duration;
use tracing::{debug, warn};

use crate::source::{FetchResult, NewsSource};

const DEFAULT_BASE_URL: &str = "https://newsdata.io";

/// Adapter for a newsdata.io-style "latest news" endpoint. Issues one
/// sub-query per (query term, category) pair, capped by
/// `settings.max_requests`.
pub struct NewsDataSource {
    settings: ProviderSettings,
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    status: String,
    #[serde(default)]
    results: Vec<LatestItem>,
}

#[derive(Debug, Deserialize)]
struct LatestItem {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    source_id: Option<String>,
    #[serde(default)]
    category: Vec<String>,
    #[serde(default)]
    keywords: Option<Vec<String>>,
}

impl NewsDataSource {
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
        for category in &self.settings.categories {
            for term in &self.settings.query_terms {
                pairs.push((term.clone(), category.clone()));
            }
        }
        pairs.truncate(self.settings.max_requests);
        pairs
    }

    async fn run_sub_query(&self, term: &str, category: &str) -> Result<Vec<LatestItem>> {
        let api_key = self.settings.api_key.as_deref().unwrap_or_default();
        let url = format!("{}/api/1/latest", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("apikey", api_key),
                ("q", term),
                ("category", category),
                ("language", "en"),
                ("size", &self.settings.page_size.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;
        let body: LatestResponse = response.json().await?;
        if body.status != "success" {
            return Err(mn_core::Error::Provider(format!(
                "newsdata returned status {}",
                body.status
            )));
        }
        Ok(body.results)
    }

    fn normalize(item: LatestItem, fallback_category: &str) -> Option<NormalizedArticle> {
        let url = item.link?;
        if url.trim().is_empty() {
            return None;
        }
        let published_at = item
            .pub_date
            .as_deref()
            .and_then(parse_pub_date)
            .unwrap_or_else(Utc::now);
        let category = item
            .category
            .first()
            .map(String::as_str)
            .unwrap_or(fallback_category)
            .parse()
            .unwrap_or(Category::General);
        let tags: BTreeSet<String> = item
            .keywords
            .unwrap_or_default()
            .into_iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Some(NormalizedArticle {
            title: item.title.unwrap_or_default(),
            url,
            source: item.source_id.unwrap_or_else(|| "newsdata".to_string()),
            published_at,
            summary: item.description.unwrap_or_default(),
            full_text: None,
            ticker: None,
            category,
            tags,
            relevance_score: 0.6,
            sentiment: 0.0,
        })
    }
}

/// newsdata timestamps come as "2026-08-27 10:15:00" (UTC, no offset);
/// tolerate RFC 3339 as well.
fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl NewsSource for NewsDataSource {
    fn name(&self) -> &str {
        "newsdata"
    }

    fn is_configured(&self) -> bool {
        self.settings.is_configured()
    }

    async fn fetch(&self, seen: &mut HashSet<String>, target: usize) -> FetchResult {
        let mut result = FetchResult::default();
        if !self.is_configured() {
            debug!("📭 newsdata: no API key configured, skipping");
            return result;
        }

        for (term, category) in self.sub_queries() {
            if result.candidates.len() >= target {
                debug!("🛑 newsdata: candidate target reached, stopping early");
                break;
            }
            let label = format!("newsdata:{}:{}", category, term);
            match self.run_sub_query(&term, &category).await {
                Ok(items) => {
                    let mut stat = SourceStat {
                        source: label,
                        found: items.len() as u64,
                        added: 0,
                        duplicates: 0,
                        error: None,
                    };
                    for item in items {
                        let Some(candidate) = Self::normalize(item, &category) else {
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
                    warn!("⚠️ newsdata sub-query '{}' failed: {}", term, e);
                    result.push_stat(SourceStat::failed(label, e.to_string()));
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pub_date_parses_both_formats() {
        assert!(parse_pub_date("2026-08-25 09:30:00").is_some());
        assert!(parse_pub_date("2026-08-25T09:30:00Z").is_some());
        assert!(parse_pub_date("yesterday").is_none());
    }

    #[test]
    fn normalize_drops_items_without_url() {
        let item = LatestItem {
            title: Some("No link".to_string()),
            link: None,
            description: Some("desc".to_string()),
            pub_date: None,
            source_id: None,
            category: vec![],
            keywords: None,
        };
        assert!(NewsDataSource::normalize(item, "business").is_none());
    }

    #[test]
    fn normalize_maps_category_and_tags() {
        let item = LatestItem {
            title: Some("Oil climbs".to_string()),
            link: Some("https://example.com/oil".to_string()),
            description: Some("Crude futures rose.".to_string()),
            pub_date: Some("2026-08-25 09:30:00".to_string()),
            source_id: Some("example-wire".to_string()),
            category: vec!["business".to_string()],
            keywords: Some(vec!["Oil".to_string(), " futures ".to_string()]),
        };
        let candidate = NewsDataSource::normalize(item, "top").unwrap();
        assert_eq!(candidate.category, Category::Markets);
        assert_eq!(candidate.source, "example-wire");
        assert!(candidate.tags.contains("oil"));
        assert!(candidate.tags.contains("futures"));
    }

    #[tokio::test]
    async fn unconfigured_source_returns_empty_without_network() {
        let source =
            NewsDataSource::new(ProviderSettings::default(), Duration::from_secs(1)).unwrap();
        let mut seen = HashSet::new();
        let result = source.fetch(&mut seen, 100).await;
        assert!(result.candidates.is_empty());
        assert!(result.stats.is_empty());
    }

    #[test]
    fn sub_queries_capped_by_max_requests() {
        let mut settings = ProviderSettings::with_api_key("k");
        settings.query_terms = (0..10).map(|i| format!("term{}", i)).collect();
        settings.categories = vec!["business".to_string(), "top".to_string()];
        settings.max_requests = 5;
        let source = NewsDataSource::new(settings, Duration::from_secs(1)).unwrap();
        assert_eq!(source.sub_queries().len(), 5);
    }
}
