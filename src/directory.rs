//! User directory consumed by the user listing route.
//!
//! Only the non-sensitive identity fields are exposed; passwords and other
//! account data never enter this crate.

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::{fs, path::Path};
use tracing::debug;

use crate::security::Identity;

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// # Errors
    /// Returns an error if the backing store cannot be read.
    async fn list_all(&self) -> Result<Vec<Identity>>;
}

#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    users: RwLock<Vec<Identity>>,
}

impl InMemoryDirectory {
    #[must_use]
    pub fn new(users: Vec<Identity>) -> Self {
        Self {
            users: RwLock::new(users),
        }
    }

    /// Load a JSON array of identities.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a list of identities.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read users file: {}", path.display()))?;
        let users: Vec<Identity> = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid users file: {}", path.display()))?;
        debug!("Loaded {} users from {}", users.len(), path.display());
        Ok(Self::new(users))
    }

    /// Insert or replace the user with the same id.
    pub fn upsert(&self, identity: Identity) {
        let mut users = self.users.write();
        match users.iter_mut().find(|user| user.id == identity.id) {
            Some(user) => *user = identity,
            None => users.push(identity),
        }
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn list_all(&self) -> Result<Vec<Identity>> {
        Ok(self.users.read().clone())
    }
}
