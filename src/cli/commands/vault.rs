use clap::{Arg, ArgGroup, ArgMatches, Command};

pub const ARG_VAULT_URL: &str = "vault-url";
pub const ARG_VAULT_ROLE_ID: &str = "vault-role-id";
pub const ARG_VAULT_SECRET_ID: &str = "vault-secret-id";
pub const ARG_VAULT_WRAPPED_TOKEN: &str = "vault-wrapped-token";
pub const ARG_VAULT_KV_MOUNT: &str = "vault-kv-mount";
pub const ARG_VAULT_KV_PATH: &str = "vault-kv-path";
pub const ARG_VAULT_KV_FIELD: &str = "vault-kv-field";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_VAULT_URL)
                .long(ARG_VAULT_URL)
                .help("Vault AppRole login URL, e.g. https://vault.tld:8200/v1/auth/approle/login")
                .env("SHOPGUARD_VAULT_URL"),
        )
        .arg(
            Arg::new(ARG_VAULT_ROLE_ID)
                .long(ARG_VAULT_ROLE_ID)
                .help("Vault role id")
                .env("SHOPGUARD_VAULT_ROLE_ID"),
        )
        .arg(
            Arg::new(ARG_VAULT_SECRET_ID)
                .long(ARG_VAULT_SECRET_ID)
                .help("Vault secret id (required unless using a wrapped token)")
                .env("SHOPGUARD_VAULT_SECRET_ID")
                .conflicts_with(ARG_VAULT_WRAPPED_TOKEN),
        )
        .arg(
            Arg::new(ARG_VAULT_WRAPPED_TOKEN)
                .long(ARG_VAULT_WRAPPED_TOKEN)
                .help("Vault wrapped token holding the secret id")
                .env("SHOPGUARD_VAULT_WRAPPED_TOKEN"),
        )
        .arg(
            Arg::new(ARG_VAULT_KV_MOUNT)
                .long(ARG_VAULT_KV_MOUNT)
                .help("Vault KV-v2 mount holding the signing key")
                .env("SHOPGUARD_VAULT_KV_MOUNT")
                .default_value("secret/shopguard"),
        )
        .arg(
            Arg::new(ARG_VAULT_KV_PATH)
                .long(ARG_VAULT_KV_PATH)
                .help("Vault KV-v2 secret path holding the signing key")
                .env("SHOPGUARD_VAULT_KV_PATH")
                .default_value("jwt"),
        )
        .arg(
            Arg::new(ARG_VAULT_KV_FIELD)
                .long(ARG_VAULT_KV_FIELD)
                .help("Field of the secret containing the PEM private key")
                .env("SHOPGUARD_VAULT_KV_FIELD")
                .default_value("private_key"),
        )
        .group(
            ArgGroup::new("vault-auth")
                .args([ARG_VAULT_ROLE_ID, ARG_VAULT_SECRET_ID, ARG_VAULT_WRAPPED_TOKEN])
                .multiple(true),
        )
}

#[derive(Debug)]
pub struct Options {
    pub url: Option<String>,
    pub role_id: Option<String>,
    pub secret_id: Option<String>,
    pub wrapped_token: Option<String>,
    pub kv_mount: String,
    pub kv_path: String,
    pub kv_field: String,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        let get = |id: &str| matches.get_one::<String>(id).cloned();
        Self {
            url: get(ARG_VAULT_URL),
            role_id: get(ARG_VAULT_ROLE_ID),
            secret_id: get(ARG_VAULT_SECRET_ID),
            wrapped_token: get(ARG_VAULT_WRAPPED_TOKEN),
            kv_mount: get(ARG_VAULT_KV_MOUNT).unwrap_or_else(|| "secret/shopguard".to_string()),
            kv_path: get(ARG_VAULT_KV_PATH).unwrap_or_else(|| "jwt".to_string()),
            kv_field: get(ARG_VAULT_KV_FIELD).unwrap_or_else(|| "private_key".to_string()),
        }
    }
}
