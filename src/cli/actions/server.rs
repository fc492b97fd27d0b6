use crate::{
    api,
    cli::globals::GlobalArgs,
    directory::{InMemoryDirectory, UserDirectory},
    security::{AuthState, SecretProvider, SessionRegistry, StaticSecretProvider, TokenService},
    vault,
};
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;
use std::{fs, sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    File {
        path: String,
    },
    Vault {
        url: String,
        role_id: String,
        secret_id: Option<String>,
        wrapped_token: Option<String>,
        kv_mount: String,
        kv_path: String,
        kv_field: String,
    },
}

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub public_key_path: String,
    pub key_source: KeySource,
    pub secret_timeout: Duration,
    pub users_file: Option<String>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the keys cannot be loaded, Vault login fails, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let public_key = fs::read_to_string(&args.public_key_path)
        .with_context(|| format!("Failed to read public key: {}", args.public_key_path))?;

    // Renew vault token, gracefully shutdown if failed
    let (tx, rx) = mpsc::unbounded_channel();

    let secrets: Arc<dyn SecretProvider> = match args.key_source {
        KeySource::File { path } => Arc::new(StaticSecretProvider::from_file(&path)?),
        KeySource::Vault {
            url,
            role_id,
            secret_id,
            wrapped_token,
            kv_mount,
            kv_path,
            kv_field,
        } => {
            let mut globals = GlobalArgs::new(url);

            // If vault wrapped token try to unwrap, otherwise use secret-id.
            let secret_id = match (wrapped_token, secret_id) {
                (Some(wrapped), _) => vault::unwrap(&globals.vault_url, &wrapped).await?,
                (None, Some(secret_id)) => secret_id,
                (None, None) => return Err(anyhow!("Vault secret-id is required")),
            };

            let (token, lease_duration) =
                vault::approle_login(&globals.vault_url, &secret_id, &role_id).await?;
            globals.set_token(token);

            debug!("Global args: {:?}", globals);

            vault::renew::try_renew(&globals, lease_duration, tx.clone());

            Arc::new(
                vault::VaultSecretProvider::new(globals, kv_mount, kv_path, kv_field)?
                    .with_timeout(args.secret_timeout),
            )
        }
    };

    // Fail fast instead of refusing every login later.
    let _: SecretString = secrets
        .fetch_signing_key()
        .await
        .context("Signing key is not available")?;

    let tokens = TokenService::from_public_key_pem(&public_key, secrets)
        .context("Invalid public key")?;

    let directory: Arc<dyn UserDirectory> = match &args.users_file {
        Some(path) => Arc::new(InMemoryDirectory::from_json_file(path)?),
        None => Arc::new(InMemoryDirectory::default()),
    };

    let auth = AuthState::new(Arc::new(tokens), Arc::new(SessionRegistry::new()));

    info!("Signing key source ready");

    // `tx` must outlive the server, otherwise `rx` closes at once in file mode.
    let result = api::new(args.port, auth, directory, rx).await;
    drop(tx);

    result
}
