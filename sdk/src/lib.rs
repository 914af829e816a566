//! Cafe Finder SDK
//!
//! Shared library providing the collaborator traits, venue types and error
//! taxonomy used by the engine and by anything that plugs a data source into it.

/// Collaborator traits
pub mod collaborators;

/// Error types and handling
pub mod errors;

/// Venue and evidence types
pub mod types;

// Re-export commonly used types
pub use collaborators::{PlaceDetailsLookup, PlaceSearch, WebSearch};
pub use errors::{CafeErrorExt, EngineError};
pub use types::{Candidate, EvidenceRecord, OpeningHours, PlaceDetails, WebSnippet};
