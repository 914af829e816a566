pub mod cache;
pub mod string;

pub use cache::SecretCache;
pub use string::SecretString;

use keyring::Entry;
use regex::Regex;
use sdk::errors::EngineError;
use std::io::{self, Write};
use std::sync::OnceLock;

/// Keychain service namespace for all Cafe Finder credentials
pub const SERVICE_NAME: &str = "cafe-finder";

/// Credential for the Ollama endpoint (optional; local servers need none)
pub const OLLAMA_API_KEY: &str = "ollama_api_key";

/// Credential for the Google Places API (required)
pub const GOOGLE_MAPS_API_KEY: &str = "google_maps_api_key";

/// SecretManager resolves credentials from the environment and the OS keychain.
///
/// Lookup order for a key such as `google_maps_api_key`:
/// 1. The environment variable with the upper-cased name (`GOOGLE_MAPS_API_KEY`)
/// 2. The OS keychain entry under the service name
///    - macOS: Keychain
///    - Windows: Credential Manager
///    - Linux: Secret Service (libsecret)
///
/// Lookups never prompt. Interactive entry only happens through
/// [`SecretManager::prompt_for_secret`], which `cafe secret set` calls.
///
/// The SecretManager also provides secret scrubbing functionality to remove
/// sensitive data from log output and error messages.
pub struct SecretManager {
    service_name: String,
}

/// Credential patterns paired with their replacement text, compiled once.
static SECRET_PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();

/// Patterns cover:
/// - Google API keys: AIza[0-9A-Za-z-_]{35}
/// - Bearer tokens: Bearer\s+[^\s]{20,}
/// - `key=` query parameters, as used by the Places API
fn get_secret_patterns() -> &'static Vec<(Regex, &'static str)> {
    SECRET_PATTERNS.get_or_init(|| {
        [
            (r"AIza[0-9A-Za-z\-_]{35}", "[REDACTED]"),
            (r"Bearer\s+[^\s]{20,}", "[REDACTED]"),
            (r"\bkey=[^&\s]+", "key=[REDACTED]"),
        ]
        .into_iter()
        .filter_map(|(pattern, replacement)| match Regex::new(pattern) {
            Ok(regex) => Some((regex, replacement)),
            Err(e) => {
                tracing::error!("Invalid secret pattern {}: {}", pattern, e);
                None
            }
        })
        .collect()
    })
}

/// Scrubs secrets from text by replacing them with `[REDACTED]`.
///
/// Use this on every provider response or transport error before it lands
/// in a log line, an error value, or the terminal.
///
/// # Examples
/// ```
/// use cafe_engine::secrets::scrub;
///
/// let scrubbed = scrub("GET /maps/api/place/textsearch/json?query=x&key=abc123");
/// assert_eq!(scrubbed, "GET /maps/api/place/textsearch/json?query=x&key=[REDACTED]");
/// ```
pub fn scrub(text: &str) -> String {
    let mut result = text.to_string();

    for (pattern, replacement) in get_secret_patterns() {
        result = pattern.replace_all(&result, *replacement).to_string();
    }

    result
}

impl SecretManager {
    /// Manager for credentials stored under `service_name` in the keychain.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Environment variable consulted before the keychain for `key`
    pub fn env_var_name(key: &str) -> String {
        key.to_ascii_uppercase()
    }

    /// Looks up a secret without prompting.
    ///
    /// Returns `Ok(None)` when neither the environment nor the keychain has
    /// a non-empty value.
    ///
    /// # Errors
    /// Returns `EngineError::KeyringError` if keychain access itself fails
    pub fn lookup(&self, key: &str) -> Result<Option<String>, EngineError> {
        if let Ok(value) = std::env::var(Self::env_var_name(key)) {
            if !value.trim().is_empty() {
                tracing::debug!("Resolved secret '{}' from environment", key);
                return Ok(Some(value.trim().to_string()));
            }
        }

        let entry = Entry::new(&self.service_name, key).map_err(|e| {
            EngineError::KeyringError(format!("Failed to create keyring entry: {}", e))
        })?;

        match entry.get_password() {
            Ok(secret) if !secret.is_empty() => {
                tracing::debug!("Retrieved secret '{}' from keychain", key);
                Ok(Some(secret))
            }
            Ok(_) | Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(EngineError::KeyringError(format!(
                "Failed to retrieve secret '{}': {}",
                key, e
            ))),
        }
    }

    /// Retrieves a secret that must be present.
    ///
    /// # Errors
    /// Returns `EngineError::MissingSecret` naming the key when it is absent,
    /// or `EngineError::KeyringError` if keychain access fails
    pub fn get_secret(&self, key: &str) -> Result<String, EngineError> {
        self.lookup(key)?
            .ok_or_else(|| EngineError::MissingSecret(key.to_string()))
    }

    /// Writes `value` to the keychain under `key`, replacing any previous value.
    ///
    /// # Errors
    /// `EngineError::KeyringError` when the platform store rejects the write
    pub fn set_secret(&self, key: &str, value: &str) -> Result<(), EngineError> {
        let entry = Entry::new(&self.service_name, key).map_err(|e| {
            EngineError::KeyringError(format!("Failed to create keyring entry: {}", e))
        })?;

        entry.set_password(value).map_err(|e| {
            EngineError::KeyringError(format!("Failed to store secret '{}': {}", key, e))
        })?;

        tracing::info!("Stored secret '{}' in keychain", key);
        Ok(())
    }

    /// Removes `key` from the keychain. Environment variables are untouched.
    ///
    /// # Errors
    /// `EngineError::KeyringError` when the entry is absent or the store fails
    pub fn delete_secret(&self, key: &str) -> Result<(), EngineError> {
        let entry = Entry::new(&self.service_name, key).map_err(|e| {
            EngineError::KeyringError(format!("Failed to create keyring entry: {}", e))
        })?;

        entry.delete_password().map_err(|e| {
            EngineError::KeyringError(format!("Failed to delete secret '{}': {}", key, e))
        })?;

        tracing::info!("Deleted secret '{}' from keychain", key);
        Ok(())
    }

    /// Checks whether a secret resolves from either source.
    pub fn has_secret(&self, key: &str) -> bool {
        matches!(self.lookup(key), Ok(Some(_)))
    }

    /// Reads one line from stdin after printing a prompt on stderr.
    ///
    /// # Errors
    /// Returns `EngineError::KeyringError` if I/O fails or the input is empty
    pub fn prompt_for_secret(&self, key: &str) -> Result<String, EngineError> {
        eprint!("Enter value for '{}': ", key);
        io::stderr()
            .flush()
            .map_err(|e| EngineError::KeyringError(format!("Failed to flush stderr: {}", e)))?;

        let mut input = String::new();
        io::stdin()
            .read_line(&mut input)
            .map_err(|e| EngineError::KeyringError(format!("Failed to read input: {}", e)))?;

        let secret = input.trim().to_string();

        if secret.is_empty() {
            return Err(EngineError::KeyringError(
                "Secret cannot be empty".to_string(),
            ));
        }

        Ok(secret)
    }
}
