use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use std::time::Duration;

pub const ARG_SIGNING_KEY_PATH: &str = "signing-key-path";
pub const ARG_PUBLIC_KEY_PATH: &str = "public-key-path";
pub const ARG_SECRET_TIMEOUT: &str = "secret-timeout";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SIGNING_KEY_PATH)
                .long(ARG_SIGNING_KEY_PATH)
                .help("PEM private signing key on disk, instead of reading it from Vault")
                .env("SHOPGUARD_SIGNING_KEY_PATH"),
        )
        .arg(
            Arg::new(ARG_PUBLIC_KEY_PATH)
                .long(ARG_PUBLIC_KEY_PATH)
                .help("PEM public key used to verify credentials")
                .env("SHOPGUARD_PUBLIC_KEY_PATH")
                .required(true),
        )
        .arg(
            Arg::new(ARG_SECRET_TIMEOUT)
                .long(ARG_SECRET_TIMEOUT)
                .help("Seconds to wait for the signing key before giving up")
                .env("SHOPGUARD_SECRET_TIMEOUT")
                .default_value("5")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub signing_key_path: Option<String>,
    pub public_key_path: String,
    pub secret_timeout: Duration,
}

impl Options {
    /// # Errors
    /// Returns an error if the public key path is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        Ok(Self {
            signing_key_path: matches.get_one::<String>(ARG_SIGNING_KEY_PATH).cloned(),
            public_key_path: matches
                .get_one::<String>(ARG_PUBLIC_KEY_PATH)
                .cloned()
                .context("missing required argument: --public-key-path")?,
            secret_timeout: Duration::from_secs(
                matches
                    .get_one::<u64>(ARG_SECRET_TIMEOUT)
                    .copied()
                    .unwrap_or(5),
            ),
        })
    }
}
