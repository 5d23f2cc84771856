//! Signed session tokens (HS256 JWT).
//!
//! Pure encode/decode, no I/O. Decoding separates `Expired` from every other
//! failure because the verifier refreshes on the former and denies on the rest.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::{Identity, TokenClaims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token is not valid yet")]
    NotYetValid,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl TokenError {
    pub fn kind(&self) -> TokenErrorKind {
        match self {
            TokenError::Expired => TokenErrorKind::Expired,
            TokenError::InvalidSignature => TokenErrorKind::InvalidSignature,
            TokenError::NotYetValid => TokenErrorKind::NotYetValid,
            TokenError::Malformed(_) => TokenErrorKind::Malformed,
            TokenError::Signing(_) => TokenErrorKind::Signing,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::ImmatureSignature => TokenError::NotYetValid,
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

/// Named failure kind, as surfaced in authorization causes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TokenErrorKind {
    Expired,
    InvalidSignature,
    NotYetValid,
    Malformed,
    Signing,
}

impl TokenErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            TokenErrorKind::Expired => "TokenExpired",
            TokenErrorKind::InvalidSignature => "InvalidSignature",
            TokenErrorKind::NotYetValid => "TokenNotYetValid",
            TokenErrorKind::Malformed => "MalformedToken",
            TokenErrorKind::Signing => "TokenSigningFailed",
        }
    }
}

impl core::fmt::Display for TokenErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// HS256 codec bound to one signing secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign `identity` with a window starting now.
    pub fn encode(&self, identity: &Identity, ttl: Duration) -> Result<String, TokenError> {
        self.encode_at(identity, Utc::now(), ttl)
    }

    /// Sign `identity` with an explicit issue time. A negative `ttl` yields an
    /// already-expired token.
    pub fn encode_at(
        &self,
        identity: &Identity,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let claims = TokenClaims {
            identity: identity.clone(),
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn decode(&self, raw: &str) -> Result<TokenClaims, TokenError> {
        let data = jsonwebtoken::decode::<TokenClaims>(raw, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }
}

impl core::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &Algorithm::HS256)
            .finish_non_exhaustive()
    }
}
