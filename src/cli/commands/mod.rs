pub mod keys;
pub mod logging;
pub mod vault;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ArgGroup, ColorChoice, Command,
};

use self::keys::ARG_SIGNING_KEY_PATH;
use self::vault::{ARG_VAULT_ROLE_ID, ARG_VAULT_SECRET_ID, ARG_VAULT_URL, ARG_VAULT_WRAPPED_TOKEN};

pub const ARG_USERS_FILE: &str = "users-file";

/// Check the Vault login arguments when Vault is the key source.
///
/// # Errors
/// Returns an error string if `vault-url` is set but role id or secret id are missing.
pub fn validate(matches: &clap::ArgMatches) -> Result<(), String> {
    if !matches.contains_id(ARG_VAULT_URL) {
        return Ok(());
    }

    if !matches.contains_id(ARG_VAULT_ROLE_ID) {
        return Err(format!(
            "Missing required argument: --{ARG_VAULT_ROLE_ID} (required with --{ARG_VAULT_URL})"
        ));
    }
    if !matches.contains_id(ARG_VAULT_SECRET_ID) && !matches.contains_id(ARG_VAULT_WRAPPED_TOKEN) {
        return Err(format!(
            "Missing required argument: --{ARG_VAULT_SECRET_ID} or --{ARG_VAULT_WRAPPED_TOKEN} (required with --{ARG_VAULT_URL})"
        ));
    }
    Ok(())
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("shopguard")
        .about("Session and access security for web shops")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("SHOPGUARD_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_USERS_FILE)
                .long(ARG_USERS_FILE)
                .help("JSON file with the users listed by /rest/user/authentication-details")
                .env("SHOPGUARD_USERS_FILE"),
        );

    let command = keys::with_args(command);
    let command = vault::with_args(command);
    logging::with_args(command).group(
        ArgGroup::new("key-source")
            .args([ARG_SIGNING_KEY_PATH, ARG_VAULT_URL])
            .required(true)
            .multiple(false),
    )
}
