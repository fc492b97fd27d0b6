use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("signing secret unavailable")]
    SecretUnavailable,
    #[error("invalid token")]
    InvalidToken,
    #[error("unauthorized")]
    Unauthorized,
    #[error("sanitizer did not reach a fixpoint within {0} rounds")]
    SanitizationFailure(usize),
    #[error("failed to parse RSA key")]
    KeyParse,
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
}
