//! Identity snapshots, token claims and registry sessions.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Deluxe,
    Accounting,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Deluxe => "deluxe",
            Self::Accounting => "accounting",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Copy of a directory user as embedded in a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    pub id: u64,
    pub email: String,
    pub role: Role,
    /// Deluxe capability value, only present on deluxe-tier credentials.
    #[serde(
        rename = "deluxeToken",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub deluxe_token: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn new(id: u64, email: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            email: email.into(),
            role,
            deluxe_token: None,
        }
    }

    #[must_use]
    pub fn with_deluxe_token(mut self, token: impl Into<String>) -> Self {
        self.deluxe_token = Some(token.into());
        self
    }
}

/// Credential payload. Decoding it never proves authenticity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub status: String,
    pub data: Identity,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid: Option<u64>,
}

/// Registry entry for a resolved token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: Identity,
    pub issued_at: i64,
    pub expires_at: i64,
    pub basket_id: Option<u64>,
}

impl From<Claims> for Session {
    fn from(claims: Claims) -> Self {
        Self {
            identity: claims.data,
            issued_at: claims.iat,
            expires_at: claims.exp,
            basket_id: claims.bid,
        }
    }
}
