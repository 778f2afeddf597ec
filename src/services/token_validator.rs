//! src/services/token_validator.rs
//!
//! TokenValidator — single-pass bearer token validation against the
//! issuer's published key set. No retries; each step has its own error so
//! logs stay useful while the HTTP boundary answers with one fixed message.
//!
//! Steps: sentinel rejection → unverified header/payload decode → JWKS
//! fetch → key scan by `kid` → verification key from the JWK's RSA
//! components → signature + audience + expiry verification.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Strings the frontend is known to send when it has no token at all.
const EMPTY_TOKEN_SENTINELS: [&str; 4] = ["", "null", "None", "Null"];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("no access token provided")]
    Missing,
    #[error("token decoding failed: {0}")]
    Decode(String),
    #[error("signing key list unavailable: {0}")]
    KeysUnavailable(#[from] reqwest::Error),
    #[error("token header has no key id")]
    MissingKeyId,
    #[error("no signing key matches key id `{0}`")]
    KeyNotFound(String),
    #[error("building the verification key failed: {0}")]
    KeyMaterial(jsonwebtoken::errors::Error),
    #[error("token has no audience claim and no expected audience is configured")]
    MissingAudience,
    #[error("token verification failed: {0}")]
    Verification(jsonwebtoken::errors::Error),
}

/// One published signing key. Only the fields the scan and key build need.
#[derive(Debug, Clone, Deserialize)]
pub struct SigningKey {
    pub kid: String,
    /// RSA modulus, base64url.
    pub n: String,
    /// RSA public exponent, base64url.
    pub e: String,
}

#[derive(Debug, Deserialize)]
pub struct KeySet {
    pub keys: Vec<SigningKey>,
}

/// Claims read from the payload before any verification, to learn the
/// audience the token itself claims.
#[derive(Debug, Deserialize)]
struct UnverifiedClaims {
    aud: Option<String>,
}

/// Claims deserialized during the verified decode.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct VerifiedClaims {
    aud: String,
    exp: u64,
}

/// Validates bearer tokens against the issuer's JWKS endpoint.
///
/// When `expected_audience` is set the audience claim is verified against
/// it. When unset, the token's own claimed audience is used, which keeps
/// behavioral parity with the system this replaces but verifies nothing
/// beyond the claim's presence.
#[derive(Clone)]
pub struct TokenValidator {
    http: reqwest::Client,
    jwks_url: String,
    expected_audience: Option<String>,
}

impl TokenValidator {
    pub fn new(
        jwks_url: String,
        expected_audience: Option<String>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            jwks_url,
            expected_audience,
        })
    }

    /// Run the full validation pass. Ok(()) means signature, audience and
    /// expiry all checked out.
    pub async fn validate(&self, token: &str) -> Result<(), TokenError> {
        if is_empty_token(token) {
            return Err(TokenError::Missing);
        }

        let header = decode_header(token).map_err(|e| TokenError::Decode(e.to_string()))?;
        let kid = header.kid.clone().ok_or(TokenError::MissingKeyId)?;
        let claimed = unverified_claims(token)?;

        let key_set = self
            .http
            .get(&self.jwks_url)
            .send()
            .await?
            .error_for_status()?
            .json::<KeySet>()
            .await?;

        let key = select_key(&key_set, &kid).ok_or_else(|| TokenError::KeyNotFound(kid))?;
        let decoding_key =
            DecodingKey::from_rsa_components(&key.n, &key.e).map_err(TokenError::KeyMaterial)?;

        let audience = match (&self.expected_audience, claimed.aud) {
            (Some(expected), _) => expected.clone(),
            (None, Some(claimed)) => claimed,
            (None, None) => return Err(TokenError::MissingAudience),
        };

        let mut validation = Validation::new(header.alg);
        validation.set_audience(&[audience]);

        decode::<VerifiedClaims>(token, &decoding_key, &validation)
            .map_err(TokenError::Verification)?;

        Ok(())
    }
}

fn is_empty_token(token: &str) -> bool {
    EMPTY_TOKEN_SENTINELS.contains(&token)
}

/// Decode the payload segment without verifying anything, to read the
/// claimed audience.
fn unverified_claims(token: &str) -> Result<UnverifiedClaims, TokenError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| TokenError::Decode("token is not a three-part JWT".into()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| TokenError::Decode(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| TokenError::Decode(e.to_string()))
}

/// Scan the key set for the token's `kid`. The whole list is walked and the
/// last matching entry wins, preserving how the issuer's occasional
/// duplicate kids have always been resolved here.
fn select_key<'a>(key_set: &'a KeySet, kid: &str) -> Option<&'a SigningKey> {
    let mut found = None;
    for key in &key_set.keys {
        if key.kid == kid {
            found = Some(key);
        }
    }
    found
}
