//! Search, scrape, cache and rate the references of one feature

use super::scoring::{parse_scores, rank, scoring_request};
use super::{CollectorSettings, LinkOutcome, ReferenceDocument, ReferenceSet, SkipReason};
use crate::feature::{FeatureRecord, LanguageProfile};
use crate::llm::CompletionProvider;
use crate::storage::{cache_key, ContentCache};
use crate::web::{filter_hits, PageScraper, SearchHit, SearchProvider};
use crate::Result;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Produces the reference set for a feature
///
/// Every external call is awaited before the next one starts; search,
/// scrape and scoring backends are all quota bound.
pub struct ReferenceCollector {
    search: Arc<dyn SearchProvider>,
    scraper: Arc<dyn PageScraper>,
    scorer: Arc<dyn CompletionProvider>,
    cache: ContentCache,
    settings: CollectorSettings,
}

impl ReferenceCollector {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        scraper: Arc<dyn PageScraper>,
        scorer: Arc<dyn CompletionProvider>,
        cache: ContentCache,
    ) -> Self {
        Self {
            search,
            scraper,
            scorer,
            cache,
            settings: CollectorSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: CollectorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// Collect references for `feature`
    ///
    /// Authored references are scraped in their given order and never
    /// rated. Otherwise candidates come from search and are rated, filtered
    /// and sorted. Scrape timeouts and navigation failures abort the
    /// collection.
    pub async fn collect(
        &self,
        language: &LanguageProfile,
        feature: &FeatureRecord,
    ) -> Result<ReferenceSet> {
        let seeded = feature.seeded_references();
        let curated = !seeded.is_empty();

        let candidates = if curated {
            tracing::info!(id = %feature.id, count = seeded.len(), "using authored references");
            seeded
                .iter()
                .map(|link| SearchHit::new(&link.title, &link.url))
                .collect()
        } else {
            self.search_candidates(language, feature).await?
        };

        let documents = self.gather(candidates).await?;

        if curated || !self.settings.scoring_enabled || documents.is_empty() {
            return Ok(ReferenceSet { documents, curated });
        }

        let scores = self.score(feature.subject(), &documents).await;
        let documents = rank(documents, &scores, self.settings.score_threshold);

        Ok(ReferenceSet {
            documents,
            curated: false,
        })
    }

    /// One `site:` query per preferred domain, then one unrestricted query
    async fn search_candidates(
        &self,
        language: &LanguageProfile,
        feature: &FeatureRecord,
    ) -> Result<Vec<SearchHit>> {
        let query = feature.search_query(language);

        let mut queries: Vec<String> = language
            .documents
            .iter()
            .filter(|domain| !domain.trim().is_empty())
            .map(|domain| format!("site:{} {}", domain.trim(), query))
            .collect();
        queries.push(query);

        let mut candidates = Vec::new();
        for query in &queries {
            tracing::info!(query = %query, "search");
            let hits = self.search.search(query).await?;
            candidates.extend(filter_hits(
                hits,
                &self.settings.excludes,
                &language.ignores,
                self.settings.results_per_query,
            ));
        }

        Ok(candidates)
    }

    /// Process candidates one at a time, dropping duplicates and empty pages
    async fn gather(&self, candidates: Vec<SearchHit>) -> Result<Vec<ReferenceDocument>> {
        let mut seen = HashSet::new();
        let mut documents = Vec::new();

        for hit in candidates {
            let outcome = if seen.insert(hit.url.clone()) {
                self.process_link(&hit).await?
            } else {
                LinkOutcome::Skipped(SkipReason::Duplicate)
            };

            match outcome {
                LinkOutcome::Collected(document) => documents.push(document),
                LinkOutcome::Skipped(reason) => {
                    tracing::debug!(url = %hit.url, %reason, "link skipped");
                }
            }
        }

        Ok(documents)
    }

    /// Fetch one link through the cache
    pub async fn process_link(&self, hit: &SearchHit) -> Result<LinkOutcome> {
        tracing::info!(id = %cache_key(&hit.url), title = %hit.title, url = %hit.url, "scrape");

        if let Some(cached) = self.cache.get(&hit.url) {
            if !cached.content.trim().is_empty() {
                tracing::debug!(url = %hit.url, "cache hit");
                return Ok(LinkOutcome::Collected(cached));
            }
        }

        let text = self.scraper.scrape(&hit.url).await?;
        let content = text.trim();
        if content.is_empty() {
            tracing::warn!(url = %hit.url, "scraped page has no content, dropping");
            return Ok(LinkOutcome::Skipped(SkipReason::EmptyContent));
        }

        let document = ReferenceDocument::new(&hit.title, &hit.url, content);
        if let Err(e) = self.cache.put(&document) {
            tracing::warn!(url = %hit.url, error = %e, "failed to cache scraped page");
        }

        Ok(LinkOutcome::Collected(document))
    }

    /// Ask the scorer to rate the leading documents
    ///
    /// Any failure reads as "everything scored 0".
    async fn score(&self, subject: &str, documents: &[ReferenceDocument]) -> HashMap<String, i32> {
        let request = scoring_request(subject, documents, self.settings.score_prefix);

        let raw = match self.scorer.complete(&request).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "relevance scoring failed, treating all scores as 0");
                return HashMap::new();
            }
        };

        match parse_scores(&raw) {
            Some(scores) => {
                for (url, score) in &scores {
                    tracing::info!(url = %url, score, "relevance");
                }
                scores
            }
            None => {
                tracing::warn!(raw = %raw, "unparseable relevance scores, treating all as 0");
                HashMap::new()
            }
        }
    }
}
