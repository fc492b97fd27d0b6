//! # Shopguard
//!
//! Session and access security for a web shop backend.
//!
//! ## Credentials
//!
//! Credentials are RS256 signed JWTs carrying a snapshot of the user (`id`,
//! `email`, `role`, optional deluxe capability) and a fixed six hour lifetime.
//! The private signing key is fetched from Vault (KV v2) or a local PEM file on
//! every signing operation; the public key is loaded once at startup.
//!
//! ## Sessions
//!
//! Verified credentials are cached in a process wide [`security::SessionRegistry`].
//! Each user id points at its most recent credential, while older credentials of
//! the same user stay resolvable.
//!
//! ## Authorization
//!
//! Gates never explain a denial: callers get a fixed `401`/`403` body whatever
//! the underlying reason.

pub mod api;
pub mod cli;
pub mod directory;
pub mod security;
pub mod vault;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
