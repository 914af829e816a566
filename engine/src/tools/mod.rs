//! HTTP adapters for the agent's collaborators
//!
//! Each adapter implements one or more of the `sdk::collaborators` traits
//! against a real provider. Transport and provider errors are scrubbed of
//! credentials before they are wrapped in an `EngineError`.

pub mod places;
pub mod web;

pub use places::GooglePlacesTool;
pub use web::WebSearchTool;

use reqwest::Client;
use sdk::errors::EngineError;
use std::time::Duration;

/// Build the HTTP client shared by a collaborator adapter
pub(crate) fn build_client(timeout_secs: u64) -> Result<Client, EngineError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| EngineError::Network(format!("Failed to create HTTP client: {}", e)))
}
