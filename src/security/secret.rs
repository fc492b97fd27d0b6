//! Signing key retrieval.
//!
//! Every signing or capability-hash operation asks the provider again; nothing
//! is cached here. Implementations talk to external services, so callers must
//! not hold a lock while awaiting them.

use async_trait::async_trait;
use secrecy::SecretString;
use std::{fs, path::Path};
use tracing::error;

use super::Error;

#[async_trait]
pub trait SecretProvider: Send + Sync {
    /// Fetch the PEM encoded private signing key.
    ///
    /// # Errors
    /// Returns [`Error::SecretUnavailable`] if the backing service fails or
    /// returns something that is not a string secret.
    async fn fetch_signing_key(&self) -> Result<SecretString, Error>;
}

/// Key material loaded once from a local PEM file.
#[derive(Clone)]
pub struct StaticSecretProvider {
    key: SecretString,
}

impl StaticSecretProvider {
    #[must_use]
    pub fn new(key: SecretString) -> Self {
        Self { key }
    }

    /// # Errors
    /// Returns [`Error::SecretUnavailable`] if the file cannot be read.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let pem = fs::read_to_string(path.as_ref()).map_err(|e| {
            error!(
                "Failed to read signing key {}: {}",
                path.as_ref().display(),
                e
            );
            Error::SecretUnavailable
        })?;
        Ok(Self::new(SecretString::from(pem)))
    }
}

impl std::fmt::Debug for StaticSecretProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticSecretProvider")
            .field("key", &"***")
            .finish()
    }
}

#[async_trait]
impl SecretProvider for StaticSecretProvider {
    async fn fetch_signing_key(&self) -> Result<SecretString, Error> {
        Ok(self.key.clone())
    }
}
