//! Admin handlers.
//!
//! # Purpose
//! Admin account management plus the moderation endpoints: seller approval
//! and revocation, and product approval.
//!
//! # Key invariants
//! - Every moderation endpoint runs the policy before touching the store.
//! - Approving an already approved resource (or revoking an unapproved one)
//!   answers success with the current resource and writes nothing.
//! - Unknown targets answer a success-shaped notice, not a 404.
use crate::api::error::{
    ApiError, api_conflict, api_forbidden, api_internal, api_internal_message,
    api_invalid_credentials, api_validation_error,
};
use crate::api::types::{LoginRequest, RegisterAdminRequest, Reply, SessionResponse};
use crate::api::{
    Planned, authorize_or_forbid, discard_images, end_session, issue_session, plan_transition,
    upload_optional_image,
};
use crate::app::AppState;
use crate::auth::password::{hash_password, verify_password};
use crate::model::{Admin, AdminPatch, Identity, IdentityField, Product, User};
use crate::store::{CredentialStore, MarketStore, StoreError};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use duka_authz::{Action, SessionClaims, Target, Transition, now_epoch_seconds};

fn require_admin(identity: &Identity) -> Result<&Admin, ApiError> {
    identity
        .as_admin()
        .ok_or_else(|| api_forbidden("this endpoint requires an admin session"))
}

#[utoipa::path(
    post,
    path = "/admins/register",
    tag = "admins",
    security(("bearer" = [])),
    request_body = RegisterAdminRequest,
    responses(
        (status = 201, description = "Admin created", body = Admin),
        (status = 403, description = "Caller is not an admin", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn register_admin(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<RegisterAdminRequest>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate().map_err(|msg| api_validation_error(&msg))?;
    authorize_or_forbid(&identity, Action::RegisterAdmin, &Target::None)?;

    let password_hash = hash_password(&body.password).map_err(|err| {
        tracing::error!(error = %err, "failed to hash password");
        api_internal_message("failed to register admin")
    })?;
    let admin_id = uuid::Uuid::new_v4().to_string();
    let admin_image =
        upload_optional_image(&state, "admins", &admin_id, body.admin_image.as_deref()).await?;
    let now = now_epoch_seconds();
    let admin = Admin {
        admin_id,
        admin_name: body.admin_name.trim().to_string(),
        email: body.email.trim().to_string(),
        cell: body.cell.trim().to_string(),
        admin_image,
        role: body.role.unwrap_or_default(),
        password_hash,
        last_token: None,
        date_added: now,
        last_logged_in: 0,
    };

    match state.store.create_admin(admin.clone()).await {
        Ok(admin) => {
            tracing::info!(admin_id = %admin.admin_id, created_by = identity.id(), "admin registered");
            Ok((StatusCode::CREATED, Json(Reply::ok("admin registered", admin))))
        }
        Err(err) => {
            discard_images(&state, std::slice::from_ref(&admin.admin_image)).await;
            Err(match err {
                StoreError::Conflict(_) => api_conflict("email is already registered"),
                err => api_internal("failed to register admin", &err),
            })
        }
    }
}

#[utoipa::path(
    post,
    path = "/admins/login",
    tag = "admins",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = SessionResponse),
        (status = 401, description = "Invalid credentials", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn login_admin(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Reply<SessionResponse>>, ApiError> {
    body.validate().map_err(|msg| api_validation_error(&msg))?;
    let admin = state
        .store
        .find_admin_by_email(body.email.trim())
        .await
        .map_err(|err| api_internal("failed to load admin", &err))?
        .filter(|admin| verify_password(&admin.password_hash, &body.password))
        .ok_or_else(api_invalid_credentials)?;

    let session = issue_session(&state, &Identity::Admin(admin)).await?;
    Ok(Json(Reply::ok("login successful", session)))
}

#[utoipa::path(
    post,
    path = "/admins/logout",
    tag = "admins",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Session revoked"),
        (status = 401, description = "Not authenticated", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn logout_admin(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<Reply<()>>, ApiError> {
    require_admin(&identity)?;
    end_session(&state, &identity, &claims).await?;
    Ok(Json(Reply::notice("logged out")))
}

#[utoipa::path(
    get,
    path = "/admins/me",
    tag = "admins",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current admin profile", body = Admin)
    )
)]
pub(crate) async fn get_admin_me(
    Extension(identity): Extension<Identity>,
) -> Result<Json<Reply<Admin>>, ApiError> {
    let admin = require_admin(&identity)?;
    Ok(Json(Reply::ok("profile loaded", admin.clone())))
}

#[utoipa::path(
    patch,
    path = "/admins/me",
    tag = "admins",
    security(("bearer" = [])),
    request_body = AdminPatch,
    responses(
        (status = 200, description = "Profile updated", body = Admin),
        (status = 400, description = "Nothing to update", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn update_admin_me(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(patch): Json<AdminPatch>,
) -> Result<Json<Reply<Admin>>, ApiError> {
    let admin = require_admin(&identity)?;
    if patch.admin_name.is_none() && patch.cell.is_none() {
        return Err(api_validation_error("no profile fields provided"));
    }
    if let Some(name) = &patch.admin_name
        && name.trim().is_empty()
    {
        return Err(api_validation_error("admin_name must not be empty"));
    }
    let updated = state
        .store
        .update_admin_profile(&admin.admin_id, patch)
        .await
        .map_err(|err| api_internal("failed to update profile", &err))?;
    Ok(Json(Reply::ok("profile updated", updated)))
}

#[utoipa::path(
    get,
    path = "/admins/sellers",
    tag = "admins",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All users including approval state", body = [User]),
        (status = 403, description = "Caller is not an admin", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_all_sellers(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Reply<Vec<User>>>, ApiError> {
    authorize_or_forbid(&identity, Action::ListAllSellers, &Target::None)?;
    let users = state
        .store
        .list_users()
        .await
        .map_err(|err| api_internal("failed to list sellers", &err))?;
    Ok(Json(Reply::ok("sellers loaded", users)))
}

#[utoipa::path(
    post,
    path = "/admins/users/{user_id}/approve",
    tag = "admins",
    security(("bearer" = [])),
    params(
        ("user_id" = String, Path, description = "User identifier")
    ),
    responses(
        (status = 200, description = "User approved, already approved, or absent", body = User),
        (status = 403, description = "Caller is not an admin", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn approve_user(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Reply<User>>, ApiError> {
    authorize_or_forbid(&identity, Action::ApproveUser, &Target::None)?;
    set_user_approval(&state, &user_id, Transition::Approve).await
}

#[utoipa::path(
    post,
    path = "/admins/users/{user_id}/revoke",
    tag = "admins",
    security(("bearer" = [])),
    params(
        ("user_id" = String, Path, description = "User identifier")
    ),
    responses(
        (status = 200, description = "Approval revoked, already revoked, or absent", body = User),
        (status = 403, description = "Caller is not an admin", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn revoke_user(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Reply<User>>, ApiError> {
    authorize_or_forbid(&identity, Action::RevokeUser, &Target::None)?;
    set_user_approval(&state, &user_id, Transition::Revoke).await
}

async fn set_user_approval(
    state: &AppState,
    user_id: &str,
    transition: Transition,
) -> Result<Json<Reply<User>>, ApiError> {
    let Some(mut user) = state
        .store
        .find_user_by_id(user_id)
        .await
        .map_err(|err| api_internal("failed to load user", &err))?
    else {
        return Ok(Json(Reply::notice("user does not exist")));
    };

    let next = match plan_transition("user", user.lifecycle(), transition)? {
        Planned::Unchanged(message) => return Ok(Json(Reply::ok(message, user))),
        Planned::Apply(next) => next,
    };
    state
        .store
        .update_user_field(user_id, IdentityField::Approved(next.approved))
        .await
        .map_err(|err| api_internal("failed to update user", &err))?;
    user.is_approved = next.approved;
    tracing::info!(user_id, transition = %transition, "user approval changed");

    let message = if next.approved {
        "user approved"
    } else {
        "user approval revoked"
    };
    Ok(Json(Reply::ok(message, user)))
}

#[utoipa::path(
    post,
    path = "/admins/products/{product_id}/approve",
    tag = "admins",
    security(("bearer" = [])),
    params(
        ("product_id" = String, Path, description = "Product identifier")
    ),
    responses(
        (status = 200, description = "Product approved, already approved, or absent", body = Product),
        (status = 403, description = "Caller is not an admin, or the product is deleted", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn approve_product(
    Path(product_id): Path<String>,
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Reply<Product>>, ApiError> {
    authorize_or_forbid(&identity, Action::ApproveProduct, &Target::None)?;
    let Some(product) = state
        .store
        .find_product(&product_id)
        .await
        .map_err(|err| api_internal("failed to load product", &err))?
    else {
        return Ok(Json(Reply::notice("the product does not exist")));
    };

    let next = match plan_transition("product", product.lifecycle(), Transition::Approve)? {
        Planned::Unchanged(message) => return Ok(Json(Reply::ok(message, product))),
        Planned::Apply(next) => next,
    };
    let product = state
        .store
        .set_product_lifecycle(&product_id, next)
        .await
        .map_err(|err| api_internal("failed to approve product", &err))?;
    tracing::info!(product_id = %product.product_id, approved_by = identity.id(), "product approved");
    Ok(Json(Reply::ok("product approved", product)))
}
