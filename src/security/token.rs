//! RS256 credentials carrying an identity snapshot.
//!
//! Tokens are compact JWTs (`header.claims.signature`). Signing uses the private
//! key fetched from the [`SecretProvider`] at issue time; verification uses the
//! public key parsed once at startup.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, error, instrument};

use super::{Claims, Error, Identity, Role, SecretProvider};

/// Lifetime of every issued credential.
pub const TOKEN_TTL_SECONDS: i64 = 6 * 60 * 60;

const ALG: &str = "RS256";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct TokenHeader {
    alg: String,
    typ: String,
}

impl TokenHeader {
    fn rs256() -> Self {
        Self {
            alg: ALG.to_string(),
            typ: "JWT".to_string(),
        }
    }
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, Error> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, Error> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| Error::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn split_token(token: &str) -> Result<(&str, &str, &str), Error> {
    let mut parts = token.split('.');
    let header = parts.next().ok_or(Error::TokenFormat)?;
    let claims = parts.next().ok_or(Error::TokenFormat)?;
    let signature = parts.next().ok_or(Error::TokenFormat)?;
    if parts.next().is_some() {
        return Err(Error::TokenFormat);
    }
    Ok((header, claims, signature))
}

fn decode_private_key(pem: &str) -> Result<RsaPrivateKey, Error> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|_| Error::KeyParse)
}

fn decode_public_key(pem: &str) -> Result<RsaPublicKey, Error> {
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|_| Error::KeyParse)
}

fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

pub struct TokenService {
    verifying_key: VerifyingKey<Sha256>,
    secrets: Arc<dyn SecretProvider>,
}

impl TokenService {
    #[must_use]
    pub fn new(public_key: RsaPublicKey, secrets: Arc<dyn SecretProvider>) -> Self {
        Self {
            verifying_key: VerifyingKey::<Sha256>::new(public_key),
            secrets,
        }
    }

    /// Build the service from a PEM public key (SPKI or PKCS#1).
    ///
    /// # Errors
    /// Returns [`Error::KeyParse`] if the PEM cannot be parsed.
    pub fn from_public_key_pem(pem: &str, secrets: Arc<dyn SecretProvider>) -> Result<Self, Error> {
        Ok(Self::new(decode_public_key(pem)?, secrets))
    }

    /// Issue a signed credential for `identity`, valid for six hours.
    ///
    /// # Errors
    /// Returns [`Error::SecretUnavailable`] if the signing key cannot be fetched
    /// or parsed; no credential is produced in that case.
    pub async fn issue(&self, identity: &Identity) -> Result<String, Error> {
        self.issue_at(identity, None, now_unix()).await
    }

    /// Like [`TokenService::issue`], binding the credential to a basket.
    ///
    /// # Errors
    /// Returns [`Error::SecretUnavailable`] if the signing key cannot be fetched or parsed.
    pub async fn issue_for_basket(
        &self,
        identity: &Identity,
        basket_id: u64,
    ) -> Result<String, Error> {
        self.issue_at(identity, Some(basket_id), now_unix()).await
    }

    #[instrument(skip(self, identity), fields(user_id = identity.id))]
    pub(crate) async fn issue_at(
        &self,
        identity: &Identity,
        basket_id: Option<u64>,
        now: i64,
    ) -> Result<String, Error> {
        let claims = Claims {
            status: "success".to_string(),
            data: identity.clone(),
            iat: now,
            exp: now + TOKEN_TTL_SECONDS,
            bid: basket_id,
        };

        let header_b64 = b64e_json(&TokenHeader::rs256())?;
        let claims_b64 = b64e_json(&claims)?;
        let signing_input = format!("{header_b64}.{claims_b64}");

        let pem = self.secrets.fetch_signing_key().await?;
        let private_key = decode_private_key(pem.expose_secret()).map_err(|_| {
            error!("Signing key is not a valid RSA private key");
            Error::SecretUnavailable
        })?;
        let signing_key = SigningKey::<Sha256>::new(private_key);
        let signature: Signature = signing_key.sign(signing_input.as_bytes());
        let signature_b64 = Base64UrlUnpadded::encode_string(&signature.to_vec());

        debug!("issued credential");

        Ok(format!("{signing_input}.{signature_b64}"))
    }

    /// Check the signature and validity window of `token`.
    ///
    /// Never fails: empty, malformed, forged or expired tokens all yield `false`.
    #[must_use]
    pub fn verify(&self, token: &str) -> bool {
        self.verify_at(token, now_unix())
    }

    pub(crate) fn verify_at(&self, token: &str, now: i64) -> bool {
        if token.is_empty() {
            return false;
        }
        match self.check(token, now) {
            Ok(()) => true,
            Err(e) => {
                debug!("token rejected: {}", e);
                false
            }
        }
    }

    fn check(&self, token: &str, now: i64) -> Result<(), Error> {
        let (header_b64, claims_b64, sig_b64) = split_token(token)?;

        let header: TokenHeader = b64d_json(header_b64)?;
        if header.alg != ALG {
            return Err(Error::UnsupportedAlg(header.alg));
        }

        let signing_input = format!("{header_b64}.{claims_b64}");
        let signature_bytes = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| Error::Base64)?;
        let signature =
            Signature::try_from(signature_bytes.as_slice()).map_err(|_| Error::InvalidToken)?;
        self.verifying_key
            .verify(signing_input.as_bytes(), &signature)
            .map_err(|_| Error::InvalidToken)?;

        let claims: Claims = b64d_json(claims_b64)?;
        if claims.exp <= now {
            return Err(Error::InvalidToken);
        }

        Ok(())
    }

    /// Extract the claims of `token` without checking the signature.
    ///
    /// Only trust the result for a token that [`TokenService::verify`] accepted.
    #[must_use]
    pub fn decode(token: &str) -> Option<Claims> {
        let (_, claims_b64, _) = split_token(token).ok()?;
        b64d_json(claims_b64).ok()
    }

    /// Verify then decode in one step.
    #[must_use]
    pub fn verified_claims(&self, token: &str) -> Option<Claims> {
        if self.verify(token) {
            Self::decode(token)
        } else {
            None
        }
    }

    /// Keyed hash over `email` and the deluxe role, keyed with the current signing key.
    ///
    /// # Errors
    /// Returns [`Error::SecretUnavailable`] if the signing key cannot be fetched.
    pub async fn deluxe_capability(&self, email: &str) -> Result<String, Error> {
        let key = self.secrets.fetch_signing_key().await?;
        let mut mac = Hmac::<Sha256>::new_from_slice(key.expose_secret().as_bytes())
            .map_err(|_| Error::SecretUnavailable)?;
        mac.update(email.as_bytes());
        mac.update(Role::Deluxe.as_str().as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService").finish_non_exhaustive()
    }
}
