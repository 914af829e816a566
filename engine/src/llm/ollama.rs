//! Ollama Generation Provider
//!
//! Implements the LLMProvider trait against Ollama's `/api/generate`
//! endpoint. The server may be local (no credential) or a hosted instance
//! behind a bearer token.
//!
//! The system instruction and the user prompt are folded into a single
//! prompt of the form `System: …\nUser: …`, and the request disables
//! streaming so the whole reply arrives in the `response` field.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{LLMError, LLMProvider, Result};
use crate::config::LLMConfig;
use crate::secrets::{self, SecretString};

/// Ollama provider configuration
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    /// Base URL for Ollama API (typically http://localhost:11434)
    base_url: String,

    /// Model name to use (e.g., "gpt-oss:120b")
    model: String,

    /// Sampling options sent with every request
    options: GenerateOptions,

    /// Optional bearer credential
    api_key: Option<SecretString>,

    /// HTTP client for API requests
    client: Client,
}

impl OllamaProvider {
    /// Create a new Ollama provider from configuration
    ///
    /// # Errors
    /// Returns `LLMError::Transport` if the HTTP client cannot be built
    pub fn new(config: &LLMConfig, api_key: Option<SecretString>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LLMError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            options: GenerateOptions {
                temperature: config.temperature,
                num_predict: config.num_predict,
                top_p: config.top_p,
            },
            api_key,
            client,
        })
    }

    /// Fold the system instruction into the prompt
    fn compose_prompt(system_instruction: &str, prompt: &str) -> String {
        format!("System: {}\nUser: {}", system_instruction, prompt)
    }

    fn map_send_error(&self, e: reqwest::Error) -> LLMError {
        if e.is_timeout() {
            LLMError::Timeout
        } else if e.is_connect() {
            LLMError::Transport(format!(
                "Cannot connect to Ollama at {}. Is Ollama running?",
                self.base_url
            ))
        } else {
            LLMError::Transport(secrets::scrub(&e.to_string()))
        }
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, prompt: &str, system_instruction: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: Self::compose_prompt(system_instruction, prompt),
            stream: false,
            options: &self.options,
        };

        tracing::debug!(
            "Ollama request: model={}, prompt_chars={}",
            self.model,
            request.prompt.chars().count()
        );

        let url = format!("{}/api/generate", self.base_url);
        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.unsecure());
        }

        let start = std::time::Instant::now();
        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;

        tracing::info!(
            "Ollama response received in {:.1}s",
            start.elapsed().as_secs_f64()
        );

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LLMError::Backend {
                status: status.as_u16(),
                body: secrets::scrub(&body),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.map_send_error(e))?;

        parse_generate_response(&body)
    }

    async fn check_health(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        let mut builder = self.client.get(&url);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.unsecure());
        }

        match builder.send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("Ollama health check failed: {}", secrets::scrub(&e.to_string()));
                false
            }
        }
    }
}

/// Pull the generated text out of a `/api/generate` response body
fn parse_generate_response(body: &str) -> Result<String> {
    let parsed: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| LLMError::ParseError(format!("{}: {}", e, secrets::scrub(body))))?;

    parsed
        .response
        .ok_or_else(|| LLMError::ParseError(secrets::scrub(body)))
}

/// Ollama `/api/generate` request format
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: &'a GenerateOptions,
}

/// Sampling options
#[derive(Debug, Clone, Serialize)]
struct GenerateOptions {
    temperature: f64,
    num_predict: u32,
    top_p: f64,
}

/// Ollama `/api/generate` response format
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}
