use mn_core::{content_hash, ArticleStore, NormalizedArticle, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// Two-stage duplicate detection: an in-memory URL snapshot taken at run
/// start (adapters claim accepted URLs against it as they fetch), and a
/// content-hash lookup against the store for candidates that survive the
/// URL stage. Archived rows are excluded from both (the store's find_*
/// methods only see active rows), so a previously archived story can be
/// re-accepted.
///
/// This is advisory: the store's insert re-verifies both keys under its
/// own lock, which is what handles concurrent external mutation.
pub struct Deduplicator {
    store: Arc<dyn ArticleStore>,
}

impl Deduplicator {
    pub fn new(store: Arc<dyn ArticleStore>) -> Self {
        Self { store }
    }

    /// URL snapshot of the active corpus, taken once per refresh run.
    pub async fn seed_urls(&self) -> Result<HashSet<String>> {
        let articles = self.store.active_articles().await?;
        Ok(articles.into_iter().map(|a| a.url).collect())
    }

    /// Content-hash stage: catches the same (title, source) story arriving
    /// under a different URL.
    pub async fn is_known_story(&self, candidate: &NormalizedArticle) -> Result<bool> {
        let hash = content_hash(&candidate.title, &candidate.source);
        Ok(self.store.find_by_content_hash(&hash).await?.is_some())
    }
}
