//! Axum middleware guarding authenticated routes.
use crate::api::error::{api_internal_message, api_unauthenticated};
use crate::app::AppState;
use crate::auth::session::Session;
use crate::observability;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Authenticate the request and attach the resolved `Identity` and verified
/// `SessionClaims` as request extensions.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let result = state
        .sessions
        .authenticate(request.headers(), state.store.as_ref())
        .await;
    match result {
        Ok(Session { identity, claims }) => {
            request.extensions_mut().insert(identity);
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(rejection) => {
            observability::record_auth_rejection(rejection.stage());
            if rejection.is_client_error() {
                tracing::debug!(stage = rejection.stage(), reason = %rejection, "request not authenticated");
                api_unauthenticated().into_response()
            } else {
                tracing::error!(error = %rejection, "authentication backend failure");
                api_internal_message("authentication unavailable").into_response()
            }
        }
    }
}
