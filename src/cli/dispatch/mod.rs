//! Map validated CLI arguments to the server action.

use crate::cli::actions::{
    server::{Args, KeySource},
    Action,
};
use crate::cli::commands::{keys, vault, ARG_USERS_FILE};
use anyhow::{anyhow, Context, Result};

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

    crate::cli::commands::validate(matches).map_err(|e| anyhow!(e))?;

    let key_opts = keys::Options::parse(matches)?;
    let vault_opts = vault::Options::parse(matches);

    let key_source = match (key_opts.signing_key_path, vault_opts.url) {
        (Some(path), None) => KeySource::File { path },
        (None, Some(url)) => KeySource::Vault {
            url,
            role_id: vault_opts
                .role_id
                .context("missing required argument: --vault-role-id")?,
            secret_id: vault_opts.secret_id,
            wrapped_token: vault_opts.wrapped_token,
            kv_mount: vault_opts.kv_mount,
            kv_path: vault_opts.kv_path,
            kv_field: vault_opts.kv_field,
        },
        _ => {
            return Err(anyhow!(
                "exactly one of --signing-key-path or --vault-url is required"
            ))
        }
    };

    Ok(Action::Server(Args {
        port,
        public_key_path: key_opts.public_key_path,
        key_source,
        secret_timeout: key_opts.secret_timeout,
        users_file: matches.get_one::<String>(ARG_USERS_FILE).cloned(),
    }))
}
