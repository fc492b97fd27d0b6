//! Credential, session and input security primitives.
//!
//! [`TokenService`] issues and verifies RS256 credentials, [`SessionRegistry`]
//! caches resolved credentials, and [`gates`] turns both into role decisions and
//! axum middleware. [`coupon`], [`sanitize`] and [`redirect`] are standalone
//! helpers used by route handlers.

pub mod coupon;
pub mod gates;
pub mod redirect;
pub mod request;
pub mod sanitize;

mod error;
mod identity;
mod registry;
mod secret;
mod token;

pub use self::error::Error;
pub use self::gates::{AuthState, Decision, DenialKind};
pub use self::identity::{Claims, Identity, Role, Session};
pub use self::registry::SessionRegistry;
pub use self::secret::{SecretProvider, StaticSecretProvider};
pub use self::token::{TokenService, TOKEN_TTL_SECONDS};
