//! Evidence Aggregator
//!
//! Turns a refined query into one evidence record per candidate venue by
//! fanning out to place details and web search. Candidates are enriched
//! through a bounded, order-preserving stream so the records always come
//! back in the order place search ranked them.

use futures::stream::{self, StreamExt};
use sdk::collaborators::{PlaceDetailsLookup, PlaceSearch, WebSearch};
use sdk::errors::EngineError;
use sdk::types::{Candidate, EvidenceRecord, MAX_CANDIDATES};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct EvidenceAggregator {
    places: Arc<dyn PlaceSearch>,
    details: Arc<dyn PlaceDetailsLookup>,
    web: Arc<dyn WebSearch>,
    max_candidates: usize,
    concurrency: usize,
}

impl EvidenceAggregator {
    /// Create an aggregator that enriches up to five candidates one at a time
    pub fn new(
        places: Arc<dyn PlaceSearch>,
        details: Arc<dyn PlaceDetailsLookup>,
        web: Arc<dyn WebSearch>,
    ) -> Self {
        Self {
            places,
            details,
            web,
            max_candidates: MAX_CANDIDATES,
            concurrency: 1,
        }
    }

    /// Candidate bound, clamped to `1..=5`
    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates.clamp(1, MAX_CANDIDATES);
        self
    }

    /// Candidates enriched at once, at least 1
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn max_candidates(&self) -> usize {
        self.max_candidates
    }

    /// Gather evidence for a refined query.
    ///
    /// An empty candidate list yields an empty vector. A place search failure
    /// is returned as-is. A candidate whose detail or web lookup fails is
    /// skipped; when every candidate fails, the last failure is returned.
    pub async fn gather(&self, refined_query: &str) -> Result<Vec<EvidenceRecord>, EngineError> {
        let mut candidates = self.places.search_places(refined_query).await?;
        candidates.truncate(self.max_candidates);

        if candidates.is_empty() {
            info!("No candidates for '{}'", refined_query);
            return Ok(Vec::new());
        }

        info!(
            "Enriching {} candidates (concurrency {})",
            candidates.len(),
            self.concurrency
        );

        let outcomes: Vec<(String, Result<EvidenceRecord, EngineError>)> =
            stream::iter(candidates)
                .map(|candidate| async move {
                    let name = candidate.name.clone();
                    (name, self.enrich(candidate).await)
                })
                .buffered(self.concurrency)
                .collect()
                .await;

        let mut records = Vec::with_capacity(outcomes.len());
        let mut last_error = None;

        for (name, outcome) in outcomes {
            match outcome {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Skipping candidate '{}': {}", name, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if records.is_empty() => Err(e),
            _ => Ok(records),
        }
    }

    async fn enrich(&self, candidate: Candidate) -> Result<EvidenceRecord, EngineError> {
        debug!("Enriching candidate '{}' ({})", candidate.name, candidate.id);

        let details = self.details.get_place_details(&candidate.id).await?;
        let web = self.web.search_web(&candidate.name, None).await?;

        Ok(EvidenceRecord::assemble(candidate, details, web))
    }
}
