//! Session authentication: bearer token to resolved identity.
//!
//! # Purpose
//! Runs the per-request state machine
//! `Unauthenticated -> TokenPresent -> TokenVerified -> IdentityResolved`.
//! The resulting [`Session`] is what the middleware attaches to the request.
//!
//! # Key invariants
//! - Every client-caused failure is an [`AuthRejection`] whose stage is only
//!   used for logs and metrics; callers answer with one uniform 401.
//! - Verification is never retried.
//! - Revoked `jti`s are rejected even while the token is otherwise valid.
use crate::model::Identity;
use crate::store::{CredentialStore, MarketplaceStore, SessionStore, StoreError};
use axum::http::HeaderMap;
use axum::http::header::HeaderName;
use duka_authz::{AuthzError, Role, SessionClaims, TokenVerifier};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Session {
    pub identity: Identity,
    pub claims: SessionClaims,
}

#[derive(Debug, Error)]
pub enum AuthRejection {
    #[error("no session token presented")]
    MissingToken,
    #[error("authorization header is malformed")]
    MalformedHeader,
    #[error("token rejected: {0}")]
    InvalidToken(AuthzError),
    #[error("session has been revoked")]
    Revoked,
    #[error("token subject no longer exists")]
    UnknownIdentity,
    #[error("token verifier misconfigured: {0}")]
    Verifier(AuthzError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthRejection {
    /// Stage label for logs and `duka_auth_rejections_total`.
    pub fn stage(&self) -> &'static str {
        match self {
            AuthRejection::MissingToken | AuthRejection::MalformedHeader => "extract",
            AuthRejection::InvalidToken(AuthzError::Expired) => "expired",
            AuthRejection::InvalidToken(_) => "verify",
            AuthRejection::Revoked => "revoked",
            AuthRejection::UnknownIdentity => "resolve",
            AuthRejection::Verifier(_) | AuthRejection::Store(_) => "internal",
        }
    }

    /// False when the failure is on our side and should surface as a 500.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AuthRejection::Verifier(_) | AuthRejection::Store(_))
    }
}

pub struct SessionAuthenticator {
    verifier: Arc<TokenVerifier>,
    header_name: HeaderName,
    scheme: String,
}

impl SessionAuthenticator {
    pub fn new(verifier: Arc<TokenVerifier>, header_name: HeaderName, scheme: &str) -> Self {
        Self {
            verifier,
            header_name,
            scheme: scheme.trim().to_string(),
        }
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.header_name
    }

    /// Scheme advertised as `token_type` in login responses.
    pub fn scheme(&self) -> &str {
        if self.scheme.is_empty() {
            "Token"
        } else {
            &self.scheme
        }
    }

    /// Pull the raw token out of the configured header.
    pub fn extract_token<'a>(&self, headers: &'a HeaderMap) -> Result<&'a str, AuthRejection> {
        let value = headers
            .get(&self.header_name)
            .ok_or(AuthRejection::MissingToken)?;
        let value = value
            .to_str()
            .map_err(|_| AuthRejection::MalformedHeader)?
            .trim();
        let token = if self.scheme.is_empty() {
            value
        } else {
            let (scheme, rest) = value
                .split_once(' ')
                .ok_or(AuthRejection::MalformedHeader)?;
            if !scheme.eq_ignore_ascii_case(&self.scheme) {
                return Err(AuthRejection::MalformedHeader);
            }
            rest.trim()
        };
        if token.is_empty() {
            return Err(AuthRejection::MissingToken);
        }
        Ok(token)
    }

    pub async fn authenticate(
        &self,
        headers: &HeaderMap,
        store: &(dyn MarketplaceStore + Send + Sync),
    ) -> Result<Session, AuthRejection> {
        let token = self.extract_token(headers)?;

        let claims = self.verifier.verify(token).map_err(|err| {
            if err.is_token_rejection() {
                AuthRejection::InvalidToken(err)
            } else {
                AuthRejection::Verifier(err)
            }
        })?;

        if store.is_session_revoked(&claims.jti).await? {
            return Err(AuthRejection::Revoked);
        }

        let role = claims.role().map_err(AuthRejection::InvalidToken)?;
        let identity = match role {
            Role::User => store
                .find_user_by_id(&claims.sub)
                .await?
                .map(Identity::User),
            Role::Admin => store
                .find_admin_by_id(&claims.sub)
                .await?
                .map(Identity::Admin),
        }
        .ok_or(AuthRejection::UnknownIdentity)?;

        Ok(Session { identity, claims })
    }
}
