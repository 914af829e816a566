use crate::secrets::string::SecretString;
use crate::secrets::SecretManager;
use sdk::errors::EngineError;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// An in-memory cache for resolved credentials.
///
/// Avoids hitting the OS keychain for every request once a value is known.
/// Absent credentials are not cached so a later `cafe secret set` is picked up.
#[derive(Clone)]
pub struct SecretCache {
    manager: Arc<SecretManager>,
    cache: Arc<RwLock<HashMap<String, SecretString>>>,
}

impl SecretCache {
    /// Cache in front of `manager`
    pub fn new(manager: Arc<SecretManager>) -> Self {
        Self {
            manager,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Retrieves a credential that may be absent.
    pub fn get_optional(&self, key: &str) -> Result<Option<SecretString>, EngineError> {
        {
            let cached = self.cache.read().unwrap_or_else(|p| p.into_inner());
            if let Some(secret) = cached.get(key) {
                return Ok(Some(secret.clone()));
            }
        }

        let Some(raw_secret) = self.manager.lookup(key)? else {
            return Ok(None);
        };
        let secret = SecretString::new(raw_secret);
        self.cache
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(key.to_string(), secret.clone());

        Ok(Some(secret))
    }

    /// Retrieves a credential that must be present.
    ///
    /// # Errors
    /// Returns `EngineError::MissingSecret` naming the key when it is absent
    pub fn get_secret(&self, key: &str) -> Result<SecretString, EngineError> {
        self.get_optional(key)?
            .ok_or_else(|| EngineError::MissingSecret(key.to_string()))
    }
}
