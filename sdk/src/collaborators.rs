//! Collaborator contracts
//!
//! The agent never talks to a provider directly. It depends on these traits,
//! which the engine satisfies with HTTP adapters and tests satisfy with
//! in-process stubs.

use async_trait::async_trait;

use crate::errors::EngineError;
use crate::types::{Candidate, PlaceDetails, WebSnippet};

/// Free-text venue search
#[async_trait]
pub trait PlaceSearch: Send + Sync {
    /// Returns an ordered, bounded list of candidate venues. May be empty.
    async fn search_places(&self, query: &str) -> Result<Vec<Candidate>, EngineError>;
}

/// Venue detail lookup by provider identifier
#[async_trait]
pub trait PlaceDetailsLookup: Send + Sync {
    /// Returns review excerpts, opening hours and the canonical map link
    async fn get_place_details(&self, id: &str) -> Result<PlaceDetails, EngineError>;
}

/// Web corroboration search
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Searches the web for `subject`, optionally narrowed by extra keywords.
    /// Returns a bounded list of hits.
    async fn search_web(
        &self,
        subject: &str,
        keywords: Option<&[String]>,
    ) -> Result<Vec<WebSnippet>, EngineError>;
}

/// Joins a subject and optional keywords into a single search string
pub fn compose_search_text(subject: &str, keywords: Option<&[String]>) -> String {
    let mut text = subject.trim().to_string();
    if let Some(keywords) = keywords {
        for keyword in keywords.iter().map(|k| k.trim()).filter(|k| !k.is_empty()) {
            text.push(' ');
            text.push_str(keyword);
        }
    }
    text
}
