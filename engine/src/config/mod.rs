//! Configuration management
//!
//! This module handles loading, validation, and management of the Cafe Finder
//! configuration. Configuration is stored in TOML format at
//! ~/.cafe-finder/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level
//! - **llm**: Text-generation backend (Ollama) settings
//! - **places**: Place search provider settings and candidate bounds
//! - **web**: Web corroboration search settings
//! - **agent**: Fan-out concurrency and follow-up grounding depth
//!
//! Every section and field has a default, so an empty file is a valid
//! configuration. Credentials never live here; see [`crate::secrets`].
//!
//! # Examples
//!
//! ```no_run
//! use cafe_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration from default location
//! let config = Config::load_or_create()?;
//!
//! println!("Model: {}", config.llm.model);
//! println!("Candidates per search: {}", config.places.max_candidates);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use sdk::types::{MAX_CANDIDATES, MAX_REVIEW_EXCERPTS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Text-generation backend
    #[serde(default)]
    pub llm: LLMConfig,

    /// Place search provider
    #[serde(default)]
    pub places: PlacesConfig,

    /// Web corroboration search
    #[serde(default)]
    pub web: WebConfig,

    /// Agent behaviour
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Ollama generation backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Base URL for the Ollama API
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,

    /// Sampling temperature (0.0-2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Maximum tokens to generate
    #[serde(default = "default_num_predict")]
    pub num_predict: u32,

    /// Nucleus sampling (0.0-1.0)
    #[serde(default = "default_top_p")]
    pub top_p: f64,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// System instruction used when a call does not supply its own
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    // Note: API key stored in env/OS keychain, not in config
}

/// Google Places configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacesConfig {
    /// Base URL for the Places API
    #[serde(default = "default_places_base_url")]
    pub base_url: String,

    /// Result language
    #[serde(default = "default_language")]
    pub language: String,

    /// Place type filter
    #[serde(default = "default_place_type")]
    pub place_type: String,

    /// Candidates carried into evidence gathering (1-5)
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    /// Reviews kept per venue (1-5)
    #[serde(default = "default_max_reviews")]
    pub max_reviews: usize,

    /// Request timeout in seconds
    #[serde(default = "default_collaborator_timeout")]
    pub timeout_secs: u64,
}

/// Web search configuration (SearXNG-compatible JSON API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Base URL of the search instance
    #[serde(default = "default_web_base_url")]
    pub base_url: String,

    /// Result language
    #[serde(default = "default_language")]
    pub language: String,

    /// Hits requested per search
    #[serde(default = "default_web_max_results")]
    pub max_results: usize,

    /// Request timeout in seconds
    #[serde(default = "default_collaborator_timeout")]
    pub timeout_secs: u64,
}

/// Agent behaviour configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Candidates enriched at once during a search turn (1 = sequential)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Past turns shown to the model when answering a follow-up
    #[serde(default = "default_follow_up_turns")]
    pub follow_up_turns: usize,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "gpt-oss:120b".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_num_predict() -> u32 {
    4096
}

fn default_top_p() -> f64 {
    0.9
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_system_prompt() -> String {
    "你是一個專業的咖啡廳探店小助手。".to_string()
}

fn default_places_base_url() -> String {
    "https://maps.googleapis.com".to_string()
}

fn default_language() -> String {
    "zh-TW".to_string()
}

fn default_place_type() -> String {
    "cafe".to_string()
}

fn default_max_candidates() -> usize {
    MAX_CANDIDATES
}

fn default_max_reviews() -> usize {
    MAX_REVIEW_EXCERPTS
}

fn default_collaborator_timeout() -> u64 {
    30
}

fn default_web_base_url() -> String {
    "http://localhost:8888".to_string()
}

fn default_web_max_results() -> usize {
    5
}

fn default_concurrency() -> usize {
    1
}

fn default_follow_up_turns() -> usize {
    1
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
            temperature: default_temperature(),
            num_predict: default_num_predict(),
            top_p: default_top_p(),
            timeout_secs: default_llm_timeout(),
            system_prompt: default_system_prompt(),
        }
    }
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            base_url: default_places_base_url(),
            language: default_language(),
            place_type: default_place_type(),
            max_candidates: default_max_candidates(),
            max_reviews: default_max_reviews(),
            timeout_secs: default_collaborator_timeout(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            base_url: default_web_base_url(),
            language: default_language(),
            max_results: default_web_max_results(),
            timeout_secs: default_collaborator_timeout(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            follow_up_turns: default_follow_up_turns(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.cafe-finder/config.toml)
    ///
    /// If the configuration file doesn't exist, writes a default configuration
    /// there first.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or written
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Self::default();
        config.validate_and_process()?;

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Wrote default configuration to {}", path.display());

        Ok(config)
    }

    /// Get the default configuration file path (~/.cafe-finder/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".cafe-finder").join("config.toml"))
    }

    /// Validate and normalize configuration
    ///
    /// Trims trailing slashes from base URLs so adapters can append paths.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` describing the first invalid field.
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        // Validate log level
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        // Validate generation backend
        if self.llm.model.trim().is_empty() {
            return Err(EngineError::Config("llm.model must not be empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(EngineError::Config(
                "llm.temperature must be between 0.0 and 2.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.llm.top_p) {
            return Err(EngineError::Config(
                "llm.top_p must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.llm.num_predict == 0 {
            return Err(EngineError::Config(
                "llm.num_predict must be greater than 0".to_string(),
            ));
        }

        // Validate bounds
        if !(1..=MAX_CANDIDATES).contains(&self.places.max_candidates) {
            return Err(EngineError::Config(format!(
                "places.max_candidates must be between 1 and {}",
                MAX_CANDIDATES
            )));
        }
        if !(1..=MAX_REVIEW_EXCERPTS).contains(&self.places.max_reviews) {
            return Err(EngineError::Config(format!(
                "places.max_reviews must be between 1 and {}",
                MAX_REVIEW_EXCERPTS
            )));
        }
        if self.web.max_results == 0 {
            return Err(EngineError::Config(
                "web.max_results must be greater than 0".to_string(),
            ));
        }
        if self.agent.concurrency == 0 {
            return Err(EngineError::Config(
                "agent.concurrency must be at least 1".to_string(),
            ));
        }
        if self.agent.follow_up_turns == 0 {
            return Err(EngineError::Config(
                "agent.follow_up_turns must be at least 1".to_string(),
            ));
        }

        // Validate timeouts
        for (name, secs) in [
            ("llm.timeout_secs", self.llm.timeout_secs),
            ("places.timeout_secs", self.places.timeout_secs),
            ("web.timeout_secs", self.web.timeout_secs),
        ] {
            if secs == 0 {
                return Err(EngineError::Config(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }

        // Normalize and validate URLs
        self.llm.base_url = normalize_base_url("llm.base_url", &self.llm.base_url)?;
        self.places.base_url = normalize_base_url("places.base_url", &self.places.base_url)?;
        self.web.base_url = normalize_base_url("web.base_url", &self.web.base_url)?;

        Ok(())
    }
}

/// Trim whitespace and trailing slashes; require an http(s) scheme
fn normalize_base_url(field: &str, url: &str) -> Result<String, EngineError> {
    let trimmed = url.trim().trim_end_matches('/');

    if trimmed.is_empty() {
        return Err(EngineError::Config(format!("{} must not be empty", field)));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(EngineError::Config(format!(
            "{} must start with http:// or https://",
            field
        )));
    }

    Ok(trimmed.to_string())
}
