//! Category handlers.
//!
//! Categories are keyed by name. Deletion is soft and idempotent; creating a
//! category whose name was soft-deleted brings it back.
use crate::api::error::{ApiError, api_conflict, api_internal, api_validation_error};
use crate::api::types::{CreateCategoryRequest, Reply};
use crate::api::{
    Planned, authorize_or_forbid, discard_images, plan_transition, upload_optional_image,
};
use crate::app::AppState;
use crate::model::{Category, Identity};
use crate::store::{MarketStore, StoreError};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use duka_authz::{Action, Target, Transition};

#[utoipa::path(
    get,
    path = "/categories",
    tag = "categories",
    responses(
        (status = 200, description = "Live categories", body = [Category])
    )
)]
pub(crate) async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Reply<Vec<Category>>>, ApiError> {
    let categories = state
        .store
        .list_categories()
        .await
        .map_err(|err| api_internal("failed to list categories", &err))?
        .into_iter()
        .filter(|category| !category.is_deleted)
        .collect();
    Ok(Json(Reply::ok("categories loaded", categories)))
}

#[utoipa::path(
    post,
    path = "/categories",
    tag = "categories",
    security(("bearer" = [])),
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created or restored", body = Category),
        (status = 403, description = "Caller is not an admin", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Category already exists", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_category(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate().map_err(|msg| api_validation_error(&msg))?;
    authorize_or_forbid(&identity, Action::ManageCategory, &Target::None)?;
    let name = body.category_name.trim().to_string();

    let existing = state
        .store
        .find_category(&name)
        .await
        .map_err(|err| api_internal("failed to load category", &err))?;
    match existing {
        Some(category) if !category.is_deleted => {
            return Err(api_conflict("category already exists"));
        }
        Some(mut category) => {
            state
                .store
                .set_category_deleted(&name, false)
                .await
                .map_err(|err| api_internal("failed to restore category", &err))?;
            category.is_deleted = false;
            tracing::info!(category = %name, "category restored");
            return Ok((StatusCode::OK, Json(Reply::ok("category restored", category))));
        }
        None => {}
    }

    let category_id = uuid::Uuid::new_v4().to_string();
    let category_image = upload_optional_image(
        &state,
        "categories",
        &category_id,
        body.category_image.as_deref(),
    )
    .await?;
    let category = Category {
        category_id,
        category_name: name,
        category_image,
        is_deleted: false,
    };
    match state.store.create_category(category.clone()).await {
        Ok(category) => {
            tracing::info!(category = %category.category_name, "category created");
            Ok((
                StatusCode::CREATED,
                Json(Reply::ok("category created", category)),
            ))
        }
        Err(err) => {
            discard_images(&state, std::slice::from_ref(&category.category_image)).await;
            Err(match err {
                StoreError::Conflict(_) => api_conflict("category already exists"),
                err => api_internal("failed to create category", &err),
            })
        }
    }
}

#[utoipa::path(
    delete,
    path = "/categories/{name}",
    tag = "categories",
    security(("bearer" = [])),
    params(
        ("name" = String, Path, description = "Category name")
    ),
    responses(
        (status = 200, description = "Category deleted, already deleted, or absent", body = Category),
        (status = 403, description = "Caller is not an admin", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_category(
    Path(name): Path<String>,
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Reply<Category>>, ApiError> {
    authorize_or_forbid(&identity, Action::ManageCategory, &Target::None)?;
    let Some(mut category) = state
        .store
        .find_category(&name)
        .await
        .map_err(|err| api_internal("failed to load category", &err))?
    else {
        return Ok(Json(Reply::notice("category does not exist")));
    };
    let next = match plan_transition("category", category.lifecycle(), Transition::Delete)? {
        Planned::Unchanged(message) => return Ok(Json(Reply::ok(message, category))),
        Planned::Apply(next) => next,
    };
    state
        .store
        .set_category_deleted(&name, next.deleted)
        .await
        .map_err(|err| api_internal("failed to delete category", &err))?;
    category.is_deleted = next.deleted;
    tracing::info!(category = %name, "category deleted");
    Ok(Json(Reply::ok("category deleted", category)))
}
