use async_trait::async_trait;
use mn_core::{NormalizedArticle, SourceStat};
use std::collections::HashSet;

/// What one adapter produced for a run: accepted candidates plus one stat
/// entry per sub-query issued (including failed ones).
#[derive(Debug, Default)]
pub struct FetchResult {
    pub candidates: Vec<NormalizedArticle>,
    pub stats: Vec<SourceStat>,
}

impl FetchResult {
    pub fn push_stat(&mut self, stat: SourceStat) {
        self.stats.push(stat);
    }
}

/// One article supplier in the refresh chain. Adapters normalize their
/// provider's wire format, dedup against `seen` (claiming accepted URLs
/// immediately so later sub-queries and later providers in the same run
/// see them as taken), and record per-sub-query stats.
///
/// `fetch` is infallible by contract: a sub-query failure becomes a stat
/// entry with `error` set and never aborts sibling sub-queries. An
/// unconfigured adapter returns an empty result without a network call.
#[async_trait]
pub trait NewsSource: Send + Sync {
    fn name(&self) -> &str;

    fn is_configured(&self) -> bool;

    /// `target` is the run's remaining candidate budget; adapters stop
    /// issuing sub-queries once they have accumulated that many. The cap
    /// is an efficiency measure, not a correctness requirement.
    async fn fetch(&self, seen: &mut HashSet<String>, target: usize) -> FetchResult;
}
