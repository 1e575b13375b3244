//! Session token minting and verification.
//!
//! # Purpose
//! Defines the session claims and the HS256 issuer/verifier pair used for
//! marketplace logins.
//!
//! # Key invariants
//! - The algorithm is pinned to HS256 on both sides.
//! - `iss`, `aud`, `exp` and `role` are always validated; `jti` is unique per
//!   issued token so a single session can be revoked.
//! - The shared secret is injected at construction and never read from a
//!   global.
//!
//! # Security model
//! Verification failures are reported with enough detail for server-side
//! logs; callers must collapse them into one uniform rejection before
//! answering clients.
use crate::{AuthzError, AuthzResult, Principal, Role};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const DEFAULT_ISSUER: &str = "duka-auth";
pub const DEFAULT_AUDIENCE: &str = "duka-marketplace";

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub iss: String,
    pub aud: String,
    /// Identity id of the user or admin.
    pub sub: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl SessionClaims {
    pub fn role(&self) -> AuthzResult<Role> {
        self.role
            .parse()
            .map_err(|_| AuthzError::UnknownRole(self.role.clone()))
    }
}

/// A freshly minted token plus the metadata callers persist or return.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub jti: String,
    pub expires_at: i64,
}

pub struct TokenIssuer {
    issuer: String,
    audience: String,
    ttl: Duration,
    encoding_key: Option<EncodingKey>,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self::with_claims(secret, ttl, DEFAULT_ISSUER, DEFAULT_AUDIENCE)
    }

    pub fn with_claims(
        secret: &[u8],
        ttl: Duration,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        let encoding_key = (!secret.is_empty()).then(|| EncodingKey::from_secret(secret));
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            ttl,
            encoding_key,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint a token for `principal` valid for the configured ttl from now.
    pub fn issue(&self, principal: &Principal) -> AuthzResult<IssuedToken> {
        self.issue_at(principal, now_epoch_seconds())
    }

    /// Mint a token as if the current time were `now` (epoch seconds).
    pub fn issue_at(&self, principal: &Principal, now: i64) -> AuthzResult<IssuedToken> {
        let key = self
            .encoding_key
            .as_ref()
            .ok_or(AuthzError::MissingSigningKey)?;
        let expires_at = i64::try_from(self.ttl.as_secs())
            .ok()
            .and_then(|ttl| now.checked_add(ttl))
            .ok_or(AuthzError::TtlOutOfRange(self.ttl.as_secs()))?;
        let claims = SessionClaims {
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            sub: principal.id.clone(),
            role: principal.role.as_str().to_string(),
            iat: now,
            exp: expires_at,
            jti: uuid::Uuid::new_v4().to_string(),
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, key)
            .map_err(AuthzError::Signing)?;
        Ok(IssuedToken {
            token,
            jti: claims.jti,
            expires_at,
        })
    }
}

pub struct TokenVerifier {
    issuer: String,
    audience: String,
    leeway: u64,
    decoding_key: Option<DecodingKey>,
}

impl TokenVerifier {
    pub fn new(secret: &[u8], leeway: u64) -> Self {
        Self::with_claims(secret, leeway, DEFAULT_ISSUER, DEFAULT_AUDIENCE)
    }

    pub fn with_claims(
        secret: &[u8],
        leeway: u64,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        let decoding_key = (!secret.is_empty()).then(|| DecodingKey::from_secret(secret));
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            leeway,
            decoding_key,
        }
    }

    /// Check signature, issuer, audience, expiry and role of `token`.
    pub fn verify(&self, token: &str) -> AuthzResult<SessionClaims> {
        let key = self
            .decoding_key
            .as_ref()
            .ok_or(AuthzError::MissingSigningKey)?;
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = self.leeway;
        let decoded = jsonwebtoken::decode::<SessionClaims>(token, key, &validation).map_err(
            |err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthzError::Expired,
                _ => AuthzError::Jwt(err),
            },
        )?;
        decoded.claims.role()?;
        Ok(decoded.claims)
    }
}

pub fn now_epoch_seconds() -> i64 {
    // Clamp to zero if the clock is before the epoch.
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs() as i64
}
