use crate::{
    cli::globals::GlobalArgs,
    security::{Error, SecretProvider},
    vault,
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info_span, instrument, Instrument};

pub const DEFAULT_SECRET_TIMEOUT: Duration = Duration::from_secs(5);

/// Read one string field of a KV v2 secret.
///
/// # Errors
/// Returns an error if the request fails, Vault answers with a non-success status,
/// or the field is missing or not a string.
#[instrument(skip(client, token))]
pub async fn read_field(
    client: &Client,
    vault_url: &str,
    token: &SecretString,
    kv_mount: &str,
    kv_path: &str,
    field: &str,
) -> Result<SecretString> {
    let path = format!("/v1/{kv_mount}/data/{kv_path}");
    let url = vault::endpoint_url(vault_url, &path)?;

    let span = info_span!("vault.kv.read", http.method = "GET", url = %url);
    let response = client
        .get(&url)
        .header("X-Vault-Token", token.expose_secret())
        .send()
        .instrument(span)
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let json_response: Value = response.json().await.unwrap_or_default();
        return Err(anyhow!(
            "{} - {}, {}",
            url,
            status,
            vault::vault_error_message(&json_response)
        ));
    }

    let json: Value = response.json().await?;
    let value = json
        .get("data")
        .and_then(|data| data.get("data"))
        .and_then(|data| data.get(field))
        .with_context(|| format!("{field} missing from vault response"))?;

    value
        .as_str()
        .map(|secret| SecretString::from(secret.to_string()))
        .ok_or_else(|| anyhow!("{field} is not in string format"))
}

/// Fetches the signing key from a Vault KV v2 secret on every call.
pub struct VaultSecretProvider {
    client: Client,
    globals: GlobalArgs,
    kv_mount: String,
    kv_path: String,
    field: String,
    timeout: Duration,
}

impl VaultSecretProvider {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        globals: GlobalArgs,
        kv_mount: impl Into<String>,
        kv_path: impl Into<String>,
        field: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            client: vault::client()?,
            globals,
            kv_mount: kv_mount.into(),
            kv_path: kv_path.into(),
            field: field.into(),
            timeout: DEFAULT_SECRET_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for VaultSecretProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSecretProvider")
            .field("globals", &self.globals)
            .field("kv_mount", &self.kv_mount)
            .field("kv_path", &self.kv_path)
            .field("field", &self.field)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SecretProvider for VaultSecretProvider {
    #[instrument(skip(self))]
    async fn fetch_signing_key(&self) -> Result<SecretString, Error> {
        let read = read_field(
            &self.client,
            &self.globals.vault_url,
            &self.globals.vault_token,
            &self.kv_mount,
            &self.kv_path,
            &self.field,
        );

        match timeout(self.timeout, read).await {
            Ok(Ok(secret)) => Ok(secret),
            Ok(Err(e)) => {
                error!("Failed to retrieve the signing key: {}", e);
                Err(Error::SecretUnavailable)
            }
            Err(_) => {
                error!(
                    "Timed out retrieving the signing key after {}ms",
                    self.timeout.as_millis()
                );
                Err(Error::SecretUnavailable)
            }
        }
    }
}
