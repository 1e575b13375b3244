//! Marketplace HTTP API module.
//!
//! # Purpose
//! Exposes route handler modules and the helpers they share: policy checks,
//! lifecycle planning, and session issue/teardown.
pub mod adverts;
pub mod admins;
pub mod categories;
pub mod error;
pub mod openapi;
pub mod products;
pub mod system;
pub mod types;
pub mod users;

use crate::api::error::{
    ApiError, api_forbidden, api_image_error, api_internal, api_internal_message,
};
use crate::api::types::SessionResponse;
use crate::app::AppState;
use crate::model::{Identity, IdentityField};
use crate::observability;
use crate::store::{CredentialStore, SessionStore};
use duka_authz::{
    Action, Decision, Lifecycle, SessionClaims, Target, Transition, TransitionPlan, lifecycle,
    now_epoch_seconds,
};

/// Run the policy for `action` and turn a denial into a 403.
pub(crate) fn authorize_or_forbid(
    identity: &Identity,
    action: Action,
    target: &Target,
) -> Result<(), ApiError> {
    match duka_authz::authorize(&identity.principal(), action, target) {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => {
            observability::record_policy_denial(reason);
            tracing::debug!(
                identity = identity.id(),
                action = action.as_str(),
                reason = reason.as_str(),
                "policy denied request"
            );
            Err(api_forbidden(reason.message()))
        }
    }
}

/// Result of planning a lifecycle transition for a named resource.
pub(crate) enum Planned {
    /// Write `next` to the store.
    Apply(Lifecycle),
    /// Already in the target state; carries the message for the reply.
    Unchanged(String),
}

/// Plan `transition` on `state`, mapping blocked transitions to 403.
///
/// `noun` prefixes the user-facing message, e.g. "product is already
/// approved".
pub(crate) fn plan_transition(
    noun: &str,
    state: Lifecycle,
    transition: Transition,
) -> Result<Planned, ApiError> {
    match lifecycle::plan(state, transition) {
        TransitionPlan::Apply => Ok(Planned::Apply(state.apply(transition))),
        TransitionPlan::Unchanged(reason) => Ok(Planned::Unchanged(format!("{noun} {reason}"))),
        TransitionPlan::Blocked(reason) => Err(api_forbidden(&format!("{noun} {reason}"))),
    }
}

/// Issue a token for `identity` and record it as the latest session.
pub(crate) async fn issue_session(
    state: &AppState,
    identity: &Identity,
) -> Result<SessionResponse, ApiError> {
    let principal = identity.principal();
    let issued = state.issuer.issue(&principal).map_err(|err| {
        tracing::error!(error = %err, "failed to issue session token");
        api_internal_message("failed to issue session")
    })?;

    let now = now_epoch_seconds();
    let fields = [
        IdentityField::LastToken(Some(issued.token.clone())),
        IdentityField::LastLogin(now),
    ];
    for field in fields {
        let result = match identity {
            Identity::User(user) => state.store.update_user_field(&user.user_id, field).await,
            Identity::Admin(admin) => state.store.update_admin_field(&admin.admin_id, field).await,
        };
        result.map_err(|err| api_internal("failed to record session", &err))?;
    }

    observability::record_session_issued(principal.role);
    tracing::info!(identity = identity.id(), role = %principal.role, "session issued");
    Ok(SessionResponse {
        token: issued.token,
        token_type: state.sessions.scheme().to_string(),
        expires_at: issued.expires_at,
        identity_id: identity.id().to_string(),
        role: principal.role,
    })
}

/// Revoke the presented token and clear the stored session marker.
pub(crate) async fn end_session(
    state: &AppState,
    identity: &Identity,
    claims: &SessionClaims,
) -> Result<(), ApiError> {
    state
        .store
        .revoke_session(&claims.jti, claims.exp)
        .await
        .map_err(|err| api_internal("failed to revoke session", &err))?;
    let cleared = IdentityField::LastToken(None);
    let result = match identity {
        Identity::User(user) => state.store.update_user_field(&user.user_id, cleared).await,
        Identity::Admin(admin) => state.store.update_admin_field(&admin.admin_id, cleared).await,
    };
    result.map_err(|err| api_internal("failed to clear session", &err))?;
    tracing::info!(identity = identity.id(), jti = %claims.jti, "session revoked");
    Ok(())
}

/// Upload an optional base64 image, returning its key or an empty string.
pub(crate) async fn upload_optional_image(
    state: &AppState,
    folder: &str,
    name: &str,
    data: Option<&str>,
) -> Result<String, ApiError> {
    match data.map(str::trim).filter(|data| !data.is_empty()) {
        Some(data) => state
            .images
            .upload(folder, name, data)
            .await
            .map_err(|err| api_image_error("failed to store image", &err)),
        None => Ok(String::new()),
    }
}

/// Best-effort download used to inline images into detail responses.
pub(crate) async fn download_optional_image(state: &AppState, key: &str) -> Option<String> {
    if key.is_empty() {
        return None;
    }
    match state.images.download(key).await {
        Ok(data) => Some(data),
        Err(err) => {
            tracing::warn!(key, error = %err, "image could not be loaded");
            None
        }
    }
}

/// Remove images uploaded by a request that failed afterwards.
pub(crate) async fn discard_images(state: &AppState, keys: &[String]) {
    for key in keys.iter().filter(|key| !key.is_empty()) {
        if let Err(err) = state.images.delete(key).await {
            tracing::warn!(key = %key, error = %err, "failed to discard image");
        }
    }
}
