//! Error types and handling
//!
//! This module provides the error types shared by the agent and its
//! collaborators. All errors implement the `CafeErrorExt` trait which provides
//! user-friendly hints.
//!
//! # Security
//!
//! Collaborator error messages may carry provider responses. Callers are
//! expected to scrub credentials before constructing these variants; the
//! hints returned by `user_hint` never contain request data.

use thiserror::Error;

/// Trait for error extensions
///
/// Provides additional context for errors shown to end users.
pub trait CafeErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and does not contain
    /// secrets, URLs or raw provider responses.
    fn user_hint(&self) -> &str;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration and credentials
/// - **Input**: Utterances the agent refuses to route
/// - **Collaborators**: Place search, place details and web search failures
/// - **Generation**: Text-generation backend failures
///
/// # Examples
///
/// ```
/// use sdk::errors::{CafeErrorExt, EngineError};
///
/// let error = EngineError::PlaceSearch("OVER_QUERY_LIMIT".to_string());
/// assert_eq!(error.user_hint(), "Map search is unavailable right now. Try again later");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing secret: {0}")]
    MissingSecret(String),

    // Keyring errors
    #[error("Keyring error: {0}")]
    KeyringError(String),

    // Input errors
    #[error("Utterance cannot be empty")]
    EmptyUtterance,

    // Collaborator errors
    #[error("Place search failed: {0}")]
    PlaceSearch(String),

    #[error("Place details lookup failed: {0}")]
    PlaceDetails(String),

    #[error("Web search failed: {0}")]
    WebSearch(String),

    // Generation errors
    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),
}

impl CafeErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            // Configuration errors
            Self::Config(_) => "Check your config.toml file for errors",
            Self::MissingSecret(_) => {
                "A required API key is missing. Set it with 'cafe secret set <key>'"
            }
            Self::KeyringError(_) => "Failed to access secure storage. Check system keychain",

            // Input errors
            Self::EmptyUtterance => "Please type a question about cafés",

            // Collaborator errors
            Self::PlaceSearch(_) => "Map search is unavailable right now. Try again later",
            Self::PlaceDetails(_) => "Could not load café details. Try again later",
            Self::WebSearch(_) => "Web search is unavailable right now. Try again later",

            // Generation errors
            Self::LLMProvider(_) => "Language model unavailable. Check the backend and API key",

            // Network errors
            Self::Network(_) => "Network operation failed. Check your connection",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = EngineError::PlaceSearch("REQUEST_DENIED".to_string());
        assert_eq!(error.to_string(), "Place search failed: REQUEST_DENIED");

        assert_eq!(
            EngineError::EmptyUtterance.to_string(),
            "Utterance cannot be empty"
        );
    }

    #[test]
    fn test_user_hints_do_not_echo_details() {
        let error = EngineError::WebSearch("https://search.local/?q=secret".to_string());
        assert!(!error.user_hint().contains("search.local"));
    }
}
