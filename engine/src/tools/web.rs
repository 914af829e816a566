//! Web corroboration search against a SearXNG-compatible JSON API
//!
//! `GET {base}/search?q=…&format=json&language=…` and keep the first hits'
//! title, link and content excerpt.

use async_trait::async_trait;
use reqwest::Client;
use sdk::collaborators::{compose_search_text, WebSearch};
use sdk::errors::EngineError;
use sdk::types::WebSnippet;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::WebConfig;
use crate::secrets::scrub;

#[derive(Debug, Clone)]
pub struct WebSearchTool {
    base_url: String,
    language: String,
    max_results: usize,
    client: Client,
}

impl WebSearchTool {
    pub fn new(config: &WebConfig) -> Result<Self, EngineError> {
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            language: config.language.clone(),
            max_results: config.max_results,
            client: super::build_client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl WebSearch for WebSearchTool {
    async fn search_web(
        &self,
        subject: &str,
        keywords: Option<&[String]>,
    ) -> Result<Vec<WebSnippet>, EngineError> {
        let query = compose_search_text(subject, keywords);
        if query.is_empty() {
            debug!("Skipping web search for blank subject");
            return Ok(Vec::new());
        }

        let url = format!("{}/search", self.base_url);
        let start = std::time::Instant::now();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query.as_str()),
                ("format", "json"),
                ("language", self.language.as_str()),
            ])
            .send()
            .await
            .map_err(|e| EngineError::WebSearch(scrub(&e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::WebSearch(format!(
                "HTTP {}: {}",
                status,
                scrub(&body)
            )));
        }

        let body: SearchResponse = response.json().await.map_err(|e| {
            EngineError::WebSearch(format!("Malformed response: {}", scrub(&e.to_string())))
        })?;

        let snippets: Vec<WebSnippet> = body
            .results
            .into_iter()
            .take(self.max_results)
            .map(|r| WebSnippet::new(r.title, r.url, r.content))
            .collect();

        info!(
            "Web search '{}' returned {} hits in {:?}",
            query,
            snippets.len(),
            start.elapsed()
        );
        Ok(snippets)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}
