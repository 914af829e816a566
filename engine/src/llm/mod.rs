//! Text Generation Layer
//!
//! This module provides the interface to the text-generation backend. The
//! `LLMProvider` trait is the seam the agent depends on; `OllamaProvider` is
//! the production implementation and tests substitute scripted providers.
//!
//! `GenerationClient` wraps a provider for the call sites that must always
//! produce user-visible text: backend failures become descriptive strings
//! instead of errors. The intent router calls the provider through
//! `GenerationClient::generate` so it can tell failures apart and fall back
//! to CHAT.

use async_trait::async_trait;
use sdk::errors::EngineError;
use std::sync::Arc;

use crate::secrets;

pub mod ollama;

pub use ollama::OllamaProvider;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during generation
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    /// Connection refused, DNS failure, reset, or any other transport problem
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timeout")]
    Timeout,

    /// The backend answered with a non-success status
    #[error("Backend error ({status}): {body}")]
    Backend { status: u16, body: String },

    /// The response body did not carry generated text
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<LLMError> for EngineError {
    fn from(error: LLMError) -> Self {
        EngineError::LLMProvider(secrets::scrub(&error.to_string()))
    }
}

/// Generation backend trait that all providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "ollama")
    fn name(&self) -> &str;

    /// Generate text for one prompt under one system instruction
    ///
    /// # Returns
    /// * `Ok(String)` - The generated text, verbatim
    /// * `Err(LLMError)` - If the request fails
    async fn generate(&self, prompt: &str, system_instruction: &str) -> Result<String>;

    /// Check if the provider is currently healthy and available
    /// Default implementation returns true.
    async fn check_health(&self) -> bool {
        true
    }
}

/// Provider wrapper used by the agent
///
/// Holds the default system instruction applied when a call does not bring
/// its own.
#[derive(Clone)]
pub struct GenerationClient {
    provider: Arc<dyn LLMProvider>,
    default_system: String,
}

impl GenerationClient {
    pub fn new(provider: Arc<dyn LLMProvider>, default_system: impl Into<String>) -> Self {
        Self {
            provider,
            default_system: default_system.into(),
        }
    }

    /// Health of the wrapped provider
    pub async fn check_health(&self) -> bool {
        self.provider.check_health().await
    }

    /// Generate text, surfacing backend failures as errors.
    pub async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        let system = system.unwrap_or(&self.default_system);

        tracing::debug!(
            provider = self.provider.name(),
            prompt_chars = prompt.chars().count(),
            "Generation request"
        );

        self.provider.generate(prompt, system).await
    }

    /// Generate text that is always presentable.
    ///
    /// Failures are logged and converted into a description of what went
    /// wrong, so callers never see an error from this path.
    pub async fn chat(&self, prompt: &str, system: Option<&str>) -> String {
        match self.generate(prompt, system).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Generation failed: {}", secrets::scrub(&e.to_string()));
                describe_failure(&e)
            }
        }
    }
}

/// Render a generation failure as user-visible text.
pub fn describe_failure(error: &LLMError) -> String {
    match error {
        LLMError::Backend { status, body } => {
            format!("API 錯誤：狀態碼 {}, 訊息：{}", status, secrets::scrub(body))
        }
        LLMError::Transport(message) => {
            format!("連線發生異常：{}", secrets::scrub(message))
        }
        LLMError::Timeout => "連線發生異常：請求逾時".to_string(),
        LLMError::ParseError(message) => {
            format!("找不到 'response' 欄位，回傳內容：{}", secrets::scrub(message))
        }
    }
}

/// Locate the JSON object in a model reply.
///
/// Handles, in order:
/// 1. Raw JSON: the whole reply is an object
/// 2. Fenced JSON (with or without trailing text): ` ```json\n{...}\n``` `
/// 3. JSON embedded in prose: the first balanced `{...}` span
pub fn find_json_object(content: &str) -> Option<&str> {
    let trimmed = content.trim();

    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Some(trimmed);
    }

    if let Some(inner) = extract_fenced_json(trimmed) {
        let inner = inner.trim();
        if inner.starts_with('{') {
            return extract_balanced_json(inner).or(Some(inner));
        }
    }

    let pos = trimmed.find('{')?;
    extract_balanced_json(&trimmed[pos..])
}

/// Extract the body of the first markdown code fence in the text.
///
/// Works even when there is trailing prose after the closing ```.
/// Returns `None` if no fenced block is found.
fn extract_fenced_json(content: &str) -> Option<&str> {
    let fence_start = content.find("```")?;
    let after_opening = &content[fence_start + 3..];

    // Skip the language tag line (e.g. "json\n")
    let body_start_rel = after_opening.find('\n')? + 1;
    let body_start = fence_start + 3 + body_start_rel;

    let closing = content[body_start..].find("```")?;
    let body_end = body_start + closing;

    if body_start >= body_end {
        return None;
    }

    Some(&content[body_start..body_end])
}

/// Extract a balanced JSON object starting at position 0 of `s`.
///
/// Counts `{` / `}` depth, respecting string literals, to find the
/// matching close brace.
fn extract_balanced_json(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct EchoProvider {
        systems: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LLMProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, prompt: &str, system_instruction: &str) -> Result<String> {
            self.systems
                .lock()
                .unwrap()
                .push(system_instruction.to_string());
            Ok(prompt.to_string())
        }
    }

    struct FailingProvider(fn() -> LLMError);

    #[async_trait]
    impl LLMProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn generate(&self, _prompt: &str, _system: &str) -> Result<String> {
            Err((self.0)())
        }
    }

    #[tokio::test]
    async fn test_chat_uses_default_system_when_none_given() {
        let provider = Arc::new(EchoProvider {
            systems: Mutex::new(Vec::new()),
        });
        let client = GenerationClient::new(provider.clone(), "default persona");

        assert_eq!(client.chat("hello", None).await, "hello");
        assert_eq!(client.chat("hello", Some("custom")).await, "hello");

        let systems = provider.systems.lock().unwrap();
        assert_eq!(*systems, vec!["default persona", "custom"]);
    }

    #[tokio::test]
    async fn test_chat_describes_backend_failure() {
        let client = GenerationClient::new(
            Arc::new(FailingProvider(|| LLMError::Backend {
                status: 500,
                body: "model exploded".to_string(),
            })),
            "sys",
        );

        let text = client.chat("hi", None).await;
        assert_eq!(text, "API 錯誤：狀態碼 500, 訊息：model exploded");
    }

    #[tokio::test]
    async fn test_chat_describes_transport_failure() {
        let client = GenerationClient::new(
            Arc::new(FailingProvider(|| {
                LLMError::Transport("connection refused".to_string())
            })),
            "sys",
        );

        let text = client.chat("hi", None).await;
        assert!(text.starts_with("連線發生異常："));
        assert!(text.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_generate_surfaces_errors() {
        let client = GenerationClient::new(Arc::new(FailingProvider(|| LLMError::Timeout)), "sys");
        assert!(matches!(
            client.generate("hi", None).await,
            Err(LLMError::Timeout)
        ));
    }

    #[test]
    fn test_conversion_to_engine_error() {
        let error: EngineError = LLMError::Backend {
            status: 401,
            body: "unauthorized".to_string(),
        }
        .into();
        assert!(matches!(error, EngineError::LLMProvider(msg) if msg.contains("401")));
    }

    #[test]
    fn test_describe_failure_scrubs_secrets() {
        let error = LLMError::Transport(
            "error sending request: Bearer abcdefghijklmnopqrstuvwxyz".to_string(),
        );
        let text = describe_failure(&error);
        assert!(!text.contains("abcdefghijklmnopqrstuvwxyz"));
    }

    #[test]
    fn test_find_json_object_raw() {
        let content = r#"{"intent": "CHAT"}"#;
        assert_eq!(find_json_object(content), Some(content));
    }

    #[test]
    fn test_find_json_object_fenced() {
        let content = "```json\n{\"intent\": \"SEARCH\"}\n```\nHope this helps";
        assert_eq!(find_json_object(content), Some("{\"intent\": \"SEARCH\"}"));
    }

    #[test]
    fn test_find_json_object_bare_fence() {
        let content = "```\n{\"intent\": \"FOLLOW_UP\"}\n```";
        assert_eq!(find_json_object(content), Some("{\"intent\": \"FOLLOW_UP\"}"));
    }

    #[test]
    fn test_find_json_object_in_prose() {
        let content = r#"Sure! {"intent": "SEARCH", "search_query": "台南 {咖啡}"} done"#;
        assert_eq!(
            find_json_object(content),
            Some(r#"{"intent": "SEARCH", "search_query": "台南 {咖啡}"}"#)
        );
    }

    #[test]
    fn test_find_json_object_none() {
        assert_eq!(find_json_object("I think this is a greeting"), None);
        assert_eq!(find_json_object("{ unterminated"), None);
    }
}
