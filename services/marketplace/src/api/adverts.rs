//! Advert handlers.
//!
//! Adverts are posted by approved users and managed by their owner. They
//! have no moderation step: an advert is listed while active and not
//! deleted.
use crate::api::error::{ApiError, api_internal, api_validation_error};
use crate::api::types::{CreateAdvertRequest, Reply};
use crate::api::{
    Planned, authorize_or_forbid, discard_images, plan_transition, upload_optional_image,
};
use crate::app::AppState;
use crate::model::{Advert, AdvertPatch, Identity};
use crate::store::MarketStore;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use duka_authz::{Action, Target, Transition, now_epoch_seconds};

const NOT_FOUND: &str = "the advert does not exist";

#[utoipa::path(
    get,
    path = "/adverts",
    tag = "adverts",
    responses(
        (status = 200, description = "Live adverts", body = [Advert])
    )
)]
pub(crate) async fn list_adverts(
    State(state): State<AppState>,
) -> Result<Json<Reply<Vec<Advert>>>, ApiError> {
    let adverts = state
        .store
        .list_adverts()
        .await
        .map_err(|err| api_internal("failed to list adverts", &err))?
        .into_iter()
        .filter(Advert::is_listed)
        .collect();
    Ok(Json(Reply::ok("adverts loaded", adverts)))
}

#[utoipa::path(
    get,
    path = "/adverts/{advert_id}",
    tag = "adverts",
    params(
        ("advert_id" = String, Path, description = "Advert identifier")
    ),
    responses(
        (status = 200, description = "Advert, or a notice when absent", body = Advert)
    )
)]
pub(crate) async fn get_advert(
    Path(advert_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Reply<Advert>>, ApiError> {
    match load_advert(&state, &advert_id).await? {
        Some(advert) if !advert.is_deleted => Ok(Json(Reply::ok("advert loaded", advert))),
        _ => Ok(Json(Reply::notice(NOT_FOUND))),
    }
}

#[utoipa::path(
    post,
    path = "/adverts",
    tag = "adverts",
    security(("bearer" = [])),
    request_body = CreateAdvertRequest,
    responses(
        (status = 201, description = "Advert created", body = Advert),
        (status = 403, description = "Poster is not approved", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_advert(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<CreateAdvertRequest>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate().map_err(|msg| api_validation_error(&msg))?;
    authorize_or_forbid(&identity, Action::CreateAdvert, &Target::None)?;

    let advert_id = uuid::Uuid::new_v4().to_string();
    let image = upload_optional_image(&state, "adverts", &advert_id, body.image.as_deref()).await?;
    let now = now_epoch_seconds();
    let advert = Advert {
        advert_id,
        owner_id: identity.id().to_string(),
        title: body.title.trim().to_string(),
        description: body.description,
        image,
        link: body.link.trim().to_string(),
        date_added: now,
        last_updated: now,
        is_active: true,
        is_deleted: false,
    };
    match state.store.create_advert(advert.clone()).await {
        Ok(advert) => {
            tracing::info!(advert_id = %advert.advert_id, owner = %advert.owner_id, "advert created");
            Ok((StatusCode::CREATED, Json(Reply::ok("advert created", advert))))
        }
        Err(err) => {
            discard_images(&state, std::slice::from_ref(&advert.image)).await;
            Err(api_internal("failed to create advert", &err))
        }
    }
}

#[utoipa::path(
    patch,
    path = "/adverts/{advert_id}",
    tag = "adverts",
    security(("bearer" = [])),
    params(
        ("advert_id" = String, Path, description = "Advert identifier")
    ),
    request_body = AdvertPatch,
    responses(
        (status = 200, description = "Advert updated, or a notice when absent", body = Advert),
        (status = 403, description = "Caller does not own the advert", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn update_advert(
    Path(advert_id): Path<String>,
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(patch): Json<AdvertPatch>,
) -> Result<Json<Reply<Advert>>, ApiError> {
    if patch.title.is_none() && patch.description.is_none() && patch.link.is_none() {
        return Err(api_validation_error("no advert fields provided"));
    }
    if patch.title.as_deref().is_some_and(|title| title.trim().is_empty()) {
        return Err(api_validation_error("title must not be empty"));
    }
    let Some(advert) = load_advert(&state, &advert_id).await? else {
        return Ok(Json(Reply::notice(NOT_FOUND)));
    };
    authorize_or_forbid(&identity, Action::UpdateAdvert, &advert.target())?;
    let advert = state
        .store
        .update_advert(&advert_id, patch)
        .await
        .map_err(|err| api_internal("failed to update advert", &err))?;
    Ok(Json(Reply::ok("advert updated", advert)))
}

#[utoipa::path(
    post,
    path = "/adverts/{advert_id}/activate",
    tag = "adverts",
    security(("bearer" = [])),
    params(
        ("advert_id" = String, Path, description = "Advert identifier")
    ),
    responses(
        (status = 200, description = "Advert active", body = Advert),
        (status = 403, description = "Not the owner, or blocked by the current state", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn activate_advert(
    Path(advert_id): Path<String>,
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Reply<Advert>>, ApiError> {
    change_state(&state, &identity, &advert_id, Transition::Activate).await
}

#[utoipa::path(
    post,
    path = "/adverts/{advert_id}/deactivate",
    tag = "adverts",
    security(("bearer" = [])),
    params(
        ("advert_id" = String, Path, description = "Advert identifier")
    ),
    responses(
        (status = 200, description = "Advert inactive", body = Advert),
        (status = 403, description = "Not the owner, or blocked by the current state", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn deactivate_advert(
    Path(advert_id): Path<String>,
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Reply<Advert>>, ApiError> {
    change_state(&state, &identity, &advert_id, Transition::Deactivate).await
}

#[utoipa::path(
    post,
    path = "/adverts/{advert_id}/delete",
    tag = "adverts",
    security(("bearer" = [])),
    params(
        ("advert_id" = String, Path, description = "Advert identifier")
    ),
    responses(
        (status = 200, description = "Advert soft-deleted", body = Advert),
        (status = 403, description = "Not the owner, or the advert is still active", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_advert(
    Path(advert_id): Path<String>,
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Reply<Advert>>, ApiError> {
    change_state(&state, &identity, &advert_id, Transition::Delete).await
}

#[utoipa::path(
    post,
    path = "/adverts/{advert_id}/restore",
    tag = "adverts",
    security(("bearer" = [])),
    params(
        ("advert_id" = String, Path, description = "Advert identifier")
    ),
    responses(
        (status = 200, description = "Advert restored", body = Advert),
        (status = 403, description = "Caller does not own the advert", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn restore_advert(
    Path(advert_id): Path<String>,
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Reply<Advert>>, ApiError> {
    change_state(&state, &identity, &advert_id, Transition::Restore).await
}

async fn change_state(
    state: &AppState,
    identity: &Identity,
    advert_id: &str,
    transition: Transition,
) -> Result<Json<Reply<Advert>>, ApiError> {
    let Some(advert) = load_advert(state, advert_id).await? else {
        return Ok(Json(Reply::notice(NOT_FOUND)));
    };
    authorize_or_forbid(identity, Action::ChangeAdvertState, &advert.target())?;
    let next = match plan_transition("advert", advert.lifecycle(), transition)? {
        Planned::Unchanged(message) => return Ok(Json(Reply::ok(message, advert))),
        Planned::Apply(next) => next,
    };
    let advert = state
        .store
        .set_advert_lifecycle(advert_id, next)
        .await
        .map_err(|err| api_internal("failed to update advert state", &err))?;
    tracing::info!(advert_id, transition = %transition, "advert state changed");
    Ok(Json(Reply::ok(format!("advert {}", past_tense(transition)), advert)))
}

fn past_tense(transition: Transition) -> &'static str {
    match transition {
        Transition::Activate => "activated",
        Transition::Deactivate => "deactivated",
        Transition::Approve => "approved",
        Transition::Revoke => "revoked",
        Transition::Delete => "deleted",
        Transition::Restore => "restored",
    }
}

async fn load_advert(state: &AppState, advert_id: &str) -> Result<Option<Advert>, ApiError> {
    state
        .store
        .find_advert(advert_id)
        .await
        .map_err(|err| api_internal("failed to load advert", &err))
}
