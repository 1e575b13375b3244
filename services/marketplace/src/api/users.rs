//! User account handlers.
//!
//! # Purpose
//! Registration, login/logout, the caller's own profile, and the public
//! seller directory.
//!
//! # Security considerations
//! - Login failures do not reveal whether an email is registered.
//! - Public seller views never include password hashes or session markers.
use crate::api::error::{
    ApiError, api_conflict, api_forbidden, api_internal, api_internal_message,
    api_invalid_credentials, api_validation_error,
};
use crate::api::types::{
    LoginRequest, RegisterUserRequest, Reply, SellerProfile, SessionResponse,
};
use crate::api::{
    discard_images, download_optional_image, end_session, issue_session, upload_optional_image,
};
use crate::app::AppState;
use crate::auth::password::{hash_password, verify_password};
use crate::model::{Identity, PublicSeller, User, UserPatch};
use crate::store::{CredentialStore, StoreError};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use duka_authz::{SessionClaims, now_epoch_seconds};

fn require_user(identity: &Identity) -> Result<&User, ApiError> {
    identity
        .as_user()
        .ok_or_else(|| api_forbidden("this endpoint requires a user session"))
}

#[utoipa::path(
    post,
    path = "/users/register",
    tag = "users",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "User registered and signed in", body = SessionResponse),
        (status = 400, description = "Invalid registration", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn register_user(
    State(state): State<AppState>,
    Json(body): Json<RegisterUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate().map_err(|msg| api_validation_error(&msg))?;

    let password_hash = hash_password(&body.password).map_err(|err| {
        tracing::error!(error = %err, "failed to hash password");
        api_internal_message("failed to register user")
    })?;

    let user_id = uuid::Uuid::new_v4().to_string();
    let user_image =
        upload_optional_image(&state, "users", &user_id, body.user_image.as_deref()).await?;
    let now = now_epoch_seconds();
    let user = User {
        user_id,
        first_name: body.first_name.trim().to_string(),
        middle_name: body.middle_name.trim().to_string(),
        last_name: body.last_name.trim().to_string(),
        email: body.email.trim().to_string(),
        phone: body.phone.trim().to_string(),
        location: body.location.trim().to_string(),
        user_image,
        password_hash,
        is_approved: false,
        last_token: None,
        date_joined: now,
        last_logged_in: now,
        last_interaction: now,
    };

    let user = match state.store.create_user(user.clone()).await {
        Ok(user) => user,
        Err(err) => {
            discard_images(&state, std::slice::from_ref(&user.user_image)).await;
            return Err(match err {
                StoreError::Conflict(_) => api_conflict("email is already registered"),
                err => api_internal("failed to register user", &err),
            });
        }
    };
    tracing::info!(user_id = %user.user_id, "user registered");

    let session = issue_session(&state, &Identity::User(user)).await?;
    Ok((
        StatusCode::CREATED,
        Json(Reply::ok("user registered", session)),
    ))
}

#[utoipa::path(
    post,
    path = "/users/login",
    tag = "users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = SessionResponse),
        (status = 401, description = "Invalid credentials", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn login_user(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Reply<SessionResponse>>, ApiError> {
    body.validate().map_err(|msg| api_validation_error(&msg))?;
    let user = state
        .store
        .find_user_by_email(body.email.trim())
        .await
        .map_err(|err| api_internal("failed to load user", &err))?
        .filter(|user| verify_password(&user.password_hash, &body.password))
        .ok_or_else(api_invalid_credentials)?;

    let session = issue_session(&state, &Identity::User(user)).await?;
    Ok(Json(Reply::ok("login successful", session)))
}

#[utoipa::path(
    post,
    path = "/users/logout",
    tag = "users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Session revoked"),
        (status = 401, description = "Not authenticated", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Not a user session", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn logout_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<Reply<()>>, ApiError> {
    require_user(&identity)?;
    end_session(&state, &identity, &claims).await?;
    Ok(Json(Reply::notice("logged out")))
}

#[utoipa::path(
    get,
    path = "/users/me",
    tag = "users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current user profile", body = User),
        (status = 401, description = "Not authenticated", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_me(
    Extension(identity): Extension<Identity>,
) -> Result<Json<Reply<User>>, ApiError> {
    let user = require_user(&identity)?;
    Ok(Json(Reply::ok("profile loaded", user.clone())))
}

#[utoipa::path(
    patch,
    path = "/users/me",
    tag = "users",
    security(("bearer" = [])),
    request_body = UserPatch,
    responses(
        (status = 200, description = "Profile updated", body = User),
        (status = 400, description = "Nothing to update", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn update_me(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(patch): Json<UserPatch>,
) -> Result<Json<Reply<User>>, ApiError> {
    let user = require_user(&identity)?;
    if patch.is_empty() {
        return Err(api_validation_error("no profile fields provided"));
    }
    let blank = [&patch.first_name, &patch.last_name]
        .into_iter()
        .flatten()
        .any(|value| value.trim().is_empty());
    if blank {
        return Err(api_validation_error("names must not be empty"));
    }
    let updated = state
        .store
        .update_user_profile(&user.user_id, patch)
        .await
        .map_err(|err| api_internal("failed to update profile", &err))?;
    Ok(Json(Reply::ok("profile updated", updated)))
}

#[utoipa::path(
    get,
    path = "/users/sellers",
    tag = "users",
    responses(
        (status = 200, description = "Approved sellers", body = [PublicSeller])
    )
)]
pub(crate) async fn list_sellers(
    State(state): State<AppState>,
) -> Result<Json<Reply<Vec<PublicSeller>>>, ApiError> {
    let sellers = state
        .store
        .list_users()
        .await
        .map_err(|err| api_internal("failed to list sellers", &err))?
        .iter()
        .filter(|user| user.is_approved)
        .map(User::public_view)
        .collect();
    Ok(Json(Reply::ok("sellers loaded", sellers)))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}",
    tag = "users",
    params(
        ("user_id" = String, Path, description = "User identifier")
    ),
    responses(
        (status = 200, description = "Seller profile, or a notice when the user does not exist", body = SellerProfile)
    )
)]
pub(crate) async fn get_seller(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Reply<SellerProfile>>, ApiError> {
    let Some(user) = state
        .store
        .find_user_by_id(&user_id)
        .await
        .map_err(|err| api_internal("failed to load user", &err))?
    else {
        return Ok(Json(Reply::notice("user does not exist")));
    };
    let user_image_data = download_optional_image(&state, &user.user_image).await;
    Ok(Json(Reply::ok(
        "seller loaded",
        SellerProfile {
            seller: user.public_view(),
            user_image_data,
        },
    )))
}
