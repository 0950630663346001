use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::secretstore::SecretStore;

/// In-process secret store for local development and tests.
pub struct InMemorySecretStore {
    secrets: Mutex<HashMap<String, String>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self {
            secrets: Mutex::new(HashMap::new()),
        }
    }

    /// Pre-populate a secret value. Test helper.
    pub fn seed(&self, name: impl Into<String>, value: impl Into<String>) {
        self.guard().insert(name.into(), value.into());
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.secrets.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for InMemorySecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for InMemorySecretStore {
    fn read(&self, name: &str) -> Result<String> {
        self.guard()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::SecretNotFound {
                name: name.to_string(),
            })
    }

    fn write(&self, name: &str, value: &str) -> Result<()> {
        self.guard().insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
