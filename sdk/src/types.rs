//! Venue and evidence types exchanged between the agent and its collaborators

use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound on candidates carried into evidence gathering per search turn
pub const MAX_CANDIDATES: usize = 5;

/// Upper bound on review excerpts kept per venue
pub const MAX_REVIEW_EXCERPTS: usize = 5;

/// Upper bound on web excerpts kept per venue
pub const MAX_WEB_EXCERPTS: usize = 2;

/// Text shown in place of opening hours when the provider has none
pub const HOURS_UNAVAILABLE: &str = "未提供";

/// A venue returned by place search, before enrichment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    /// Provider identifier used for detail lookups
    pub id: String,

    /// Display name
    pub name: String,

    /// Average rating, when the provider reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,

    /// Formatted street address
    pub address: String,
}

impl Candidate {
    /// Create a new candidate
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        rating: Option<f64>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rating,
            address: address.into(),
        }
    }
}

/// Opening hours as reported by the place provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "kind", content = "lines", rename_all = "snake_case")]
pub enum OpeningHours {
    /// One line per weekday, e.g. "星期一: 10:00 – 22:00"
    Listed(Vec<String>),

    /// Provider did not report hours
    #[default]
    Unavailable,
}

impl OpeningHours {
    /// Build from provider lines; an empty list means unavailable
    pub fn from_lines(lines: Vec<String>) -> Self {
        let lines: Vec<String> = lines
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();

        if lines.is_empty() {
            Self::Unavailable
        } else {
            Self::Listed(lines)
        }
    }
}

impl fmt::Display for OpeningHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listed(lines) => write!(f, "{}", lines.join("; ")),
            Self::Unavailable => write!(f, "{}", HOURS_UNAVAILABLE),
        }
    }
}

/// Structured details for one venue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PlaceDetails {
    /// Name as reported by the details endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Review texts, most useful first
    pub reviews: Vec<String>,

    /// Opening hours
    pub opening_hours: OpeningHours,

    /// Canonical map link
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_url: Option<String>,
}

/// A single web search hit used as corroboration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebSnippet {
    pub title: String,
    pub link: String,
    pub excerpt: String,
}

impl WebSnippet {
    /// Create a new web snippet
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        excerpt: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            excerpt: excerpt.into(),
        }
    }
}

/// A candidate enriched with reviews, hours, a map link and web corroboration.
///
/// Review and web excerpts are capped at [`MAX_REVIEW_EXCERPTS`] and
/// [`MAX_WEB_EXCERPTS`] so the synthesis prompt stays bounded. Only
/// [`EvidenceRecord::assemble`] constructs one.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EvidenceRecord {
    pub candidate: Candidate,
    reviews: Vec<String>,
    pub opening_hours: OpeningHours,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_url: Option<String>,
    web_excerpts: Vec<String>,
}

impl EvidenceRecord {
    /// Assemble a record from a candidate, its details and its web hits
    pub fn assemble(candidate: Candidate, details: PlaceDetails, web: Vec<WebSnippet>) -> Self {
        let reviews = details
            .reviews
            .into_iter()
            .filter(|r| !r.trim().is_empty())
            .take(MAX_REVIEW_EXCERPTS)
            .collect();

        let web_excerpts = web
            .into_iter()
            .map(|w| w.excerpt)
            .filter(|e| !e.trim().is_empty())
            .take(MAX_WEB_EXCERPTS)
            .collect();

        Self {
            candidate,
            reviews,
            opening_hours: details.opening_hours,
            map_url: details.map_url,
            web_excerpts,
        }
    }

    pub fn reviews(&self) -> &[String] {
        &self.reviews
    }

    pub fn web_excerpts(&self) -> &[String] {
        &self.web_excerpts
    }
}
