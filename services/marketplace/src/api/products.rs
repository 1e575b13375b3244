//! Product handlers.
//!
//! # Purpose
//! Public catalogue reads plus owner-only product management.
//!
//! # Key invariants
//! - New products start active, unapproved and not deleted; only approved,
//!   active, undeleted products are listed publicly.
//! - Deleted products are treated as absent by the public reads.
//! - Lifecycle endpoints are idempotent and never write when the product is
//!   already in the requested state.
use crate::api::error::{ApiError, api_image_error, api_internal, api_validation_error};
use crate::api::types::{
    CreateProductRequest, ProductDetail, Reply, SellerSummary, validate_price,
};
use crate::api::{
    Planned, authorize_or_forbid, discard_images, download_optional_image, plan_transition,
};
use crate::app::AppState;
use crate::model::{Identity, Product, ProductImage, ProductPatch};
use crate::store::{CredentialStore, MarketStore};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use duka_authz::{Action, Target, Transition, now_epoch_seconds};

const NOT_FOUND: &str = "the product does not exist";

#[utoipa::path(
    get,
    path = "/products",
    tag = "products",
    responses(
        (status = 200, description = "Publicly listed products", body = [Product])
    )
)]
pub(crate) async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Reply<Vec<Product>>>, ApiError> {
    let products = state
        .store
        .list_products()
        .await
        .map_err(|err| api_internal("failed to list products", &err))?
        .into_iter()
        .filter(Product::is_listed)
        .collect();
    Ok(Json(Reply::ok("products loaded", products)))
}

#[utoipa::path(
    post,
    path = "/products",
    tag = "products",
    security(("bearer" = [])),
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created, pending approval", body = Product),
        (status = 400, description = "Invalid product", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Seller is not approved", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Product name already taken", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_product(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate().map_err(|msg| api_validation_error(&msg))?;
    authorize_or_forbid(&identity, Action::CreateProduct, &Target::None)?;
    ensure_category(&state, &body.category).await?;

    let product_id = uuid::Uuid::new_v4().to_string();
    let mut uploaded = Vec::with_capacity(body.images.len() + 1);

    let main_image = state
        .images
        .upload("products", &format!("{product_id}-main"), &body.main_image)
        .await
        .map_err(|err| api_image_error("failed to store main image", &err))?;
    uploaded.push(main_image.clone());

    let mut images = Vec::with_capacity(body.images.len());
    for (index, data) in body.images.iter().enumerate() {
        let name = format!("{product_id}-gallery-{index}");
        match state.images.upload("products", &name, data).await {
            Ok(key) => {
                uploaded.push(key.clone());
                images.push(ProductImage {
                    image_id: uuid::Uuid::new_v4().to_string(),
                    product_id: product_id.clone(),
                    image_url: key,
                });
            }
            Err(err) => {
                discard_images(&state, &uploaded).await;
                return Err(api_image_error("failed to store gallery image", &err));
            }
        }
    }

    let now = now_epoch_seconds();
    let product = Product {
        product_id,
        product_name: body.product_name.trim().to_string(),
        product_price: body.product_price.trim().to_string(),
        product_description: body.product_description,
        owner_id: identity.id().to_string(),
        main_image,
        quantity: body.quantity,
        product_type: body.product_type,
        brand: body.brand,
        category: body.category.trim().to_string(),
        sub_category: body.sub_category,
        total_likes: 0,
        total_comments: 0,
        total_bookmarks: 0,
        total_interactions: 0,
        date_added: now,
        last_updated: now,
        is_active: true,
        is_approved: false,
        is_deleted: false,
    };

    match state.store.create_product(product, images).await {
        Ok(product) => {
            tracing::info!(product_id = %product.product_id, owner = %product.owner_id, "product created");
            Ok((
                StatusCode::CREATED,
                Json(Reply::ok("product created, awaiting approval", product)),
            ))
        }
        Err(err) => {
            discard_images(&state, &uploaded).await;
            Err(api_internal("failed to create product", &err))
        }
    }
}

#[utoipa::path(
    get,
    path = "/products/{product_id}",
    tag = "products",
    params(
        ("product_id" = String, Path, description = "Product identifier")
    ),
    responses(
        (status = 200, description = "Product detail, or a notice when absent", body = ProductDetail)
    )
)]
pub(crate) async fn get_product(
    Path(product_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Reply<ProductDetail>>, ApiError> {
    let Some(product) = find_visible(&state, &product_id).await? else {
        return Ok(Json(Reply::notice(NOT_FOUND)));
    };
    let images = gallery_keys(&state, &product_id).await?;
    let main_image_data = download_optional_image(&state, &product.main_image).await;
    let seller = state
        .store
        .find_user_by_id(&product.owner_id)
        .await
        .map_err(|err| api_internal("failed to load seller", &err))?
        .as_ref()
        .map(SellerSummary::from);
    Ok(Json(Reply::ok(
        "product loaded",
        ProductDetail {
            product,
            images,
            main_image_data,
            seller,
        },
    )))
}

#[utoipa::path(
    get,
    path = "/products/{product_id}/images",
    tag = "products",
    params(
        ("product_id" = String, Path, description = "Product identifier")
    ),
    responses(
        (status = 200, description = "Gallery image keys", body = [String])
    )
)]
pub(crate) async fn list_product_images(
    Path(product_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Reply<Vec<String>>>, ApiError> {
    if find_visible(&state, &product_id).await?.is_none() {
        return Ok(Json(Reply::notice(NOT_FOUND)));
    }
    let images = gallery_keys(&state, &product_id).await?;
    Ok(Json(Reply::ok("images loaded", images)))
}

#[utoipa::path(
    patch,
    path = "/products/{product_id}",
    tag = "products",
    security(("bearer" = [])),
    params(
        ("product_id" = String, Path, description = "Product identifier")
    ),
    request_body = ProductPatch,
    responses(
        (status = 200, description = "Product updated, or a notice when absent", body = Product),
        (status = 403, description = "Caller does not own the product", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn update_product(
    Path(product_id): Path<String>,
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(patch): Json<ProductPatch>,
) -> Result<Json<Reply<Product>>, ApiError> {
    validate_patch(&patch).map_err(|msg| api_validation_error(&msg))?;
    let Some(product) = load_product(&state, &product_id).await? else {
        return Ok(Json(Reply::notice(NOT_FOUND)));
    };
    authorize_or_forbid(&identity, Action::UpdateProduct, &product.target())?;
    if let Some(category) = &patch.category {
        ensure_category(&state, category).await?;
    }
    let product = state
        .store
        .update_product(&product_id, patch)
        .await
        .map_err(|err| api_internal("failed to update product", &err))?;
    Ok(Json(Reply::ok("product updated", product)))
}

#[utoipa::path(
    post,
    path = "/products/{product_id}/activate",
    tag = "products",
    security(("bearer" = [])),
    params(
        ("product_id" = String, Path, description = "Product identifier")
    ),
    responses(
        (status = 200, description = "Product active", body = Product),
        (status = 403, description = "Not the owner, or blocked by the current state", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn activate_product(
    Path(product_id): Path<String>,
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Reply<Product>>, ApiError> {
    change_state(&state, &identity, &product_id, Transition::Activate).await
}

#[utoipa::path(
    post,
    path = "/products/{product_id}/deactivate",
    tag = "products",
    security(("bearer" = [])),
    params(
        ("product_id" = String, Path, description = "Product identifier")
    ),
    responses(
        (status = 200, description = "Product inactive", body = Product),
        (status = 403, description = "Not the owner, or blocked by the current state", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn deactivate_product(
    Path(product_id): Path<String>,
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Reply<Product>>, ApiError> {
    change_state(&state, &identity, &product_id, Transition::Deactivate).await
}

#[utoipa::path(
    post,
    path = "/products/{product_id}/delete",
    tag = "products",
    security(("bearer" = [])),
    params(
        ("product_id" = String, Path, description = "Product identifier")
    ),
    responses(
        (status = 200, description = "Product soft-deleted", body = Product),
        (status = 403, description = "Not the owner, or blocked by the current state", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_product(
    Path(product_id): Path<String>,
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Reply<Product>>, ApiError> {
    change_state(&state, &identity, &product_id, Transition::Delete).await
}

#[utoipa::path(
    post,
    path = "/products/{product_id}/restore",
    tag = "products",
    security(("bearer" = [])),
    params(
        ("product_id" = String, Path, description = "Product identifier")
    ),
    responses(
        (status = 200, description = "Product restored", body = Product),
        (status = 403, description = "Not the owner, or blocked by the current state", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn restore_product(
    Path(product_id): Path<String>,
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Reply<Product>>, ApiError> {
    change_state(&state, &identity, &product_id, Transition::Restore).await
}

async fn change_state(
    state: &AppState,
    identity: &Identity,
    product_id: &str,
    transition: Transition,
) -> Result<Json<Reply<Product>>, ApiError> {
    let Some(product) = load_product(state, product_id).await? else {
        return Ok(Json(Reply::notice(NOT_FOUND)));
    };
    authorize_or_forbid(identity, Action::ChangeProductState, &product.target())?;
    let next = match plan_transition("product", product.lifecycle(), transition)? {
        Planned::Unchanged(message) => return Ok(Json(Reply::ok(message, product))),
        Planned::Apply(next) => next,
    };
    let product = state
        .store
        .set_product_lifecycle(product_id, next)
        .await
        .map_err(|err| api_internal("failed to update product state", &err))?;
    tracing::info!(product_id, transition = %transition, "product state changed");
    Ok(Json(Reply::ok(applied_message(transition), product)))
}

fn applied_message(transition: Transition) -> &'static str {
    match transition {
        Transition::Activate => "product activated",
        Transition::Deactivate => "product deactivated",
        Transition::Approve => "product approved",
        Transition::Revoke => "product approval revoked",
        Transition::Delete => "product deleted",
        Transition::Restore => "product restored",
    }
}

async fn load_product(state: &AppState, product_id: &str) -> Result<Option<Product>, ApiError> {
    state
        .store
        .find_product(product_id)
        .await
        .map_err(|err| api_internal("failed to load product", &err))
}

async fn find_visible(state: &AppState, product_id: &str) -> Result<Option<Product>, ApiError> {
    Ok(load_product(state, product_id)
        .await?
        .filter(|product| !product.is_deleted))
}

async fn gallery_keys(state: &AppState, product_id: &str) -> Result<Vec<String>, ApiError> {
    Ok(state
        .store
        .list_product_images(product_id)
        .await
        .map_err(|err| api_internal("failed to list product images", &err))?
        .into_iter()
        .map(|image| image.image_url)
        .collect())
}

async fn ensure_category(state: &AppState, name: &str) -> Result<(), ApiError> {
    let live = state
        .store
        .find_category(name.trim())
        .await
        .map_err(|err| api_internal("failed to load category", &err))?
        .is_some_and(|category| !category.is_deleted);
    if !live {
        return Err(api_validation_error("category does not exist"));
    }
    Ok(())
}

fn validate_patch(patch: &ProductPatch) -> Result<(), String> {
    let text_fields = [
        &patch.product_name,
        &patch.product_price,
        &patch.product_description,
        &patch.product_type,
        &patch.brand,
        &patch.category,
        &patch.sub_category,
    ];
    if text_fields.iter().all(|field| field.is_none()) && patch.quantity.is_none() {
        return Err("no product fields provided".to_string());
    }
    if let Some(name) = &patch.product_name
        && name.trim().is_empty()
    {
        return Err("product_name must not be empty".to_string());
    }
    if let Some(price) = &patch.product_price {
        validate_price(price)?;
    }
    if patch.quantity.is_some_and(|quantity| quantity < 0) {
        return Err("quantity must not be negative".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_validation() {
        assert!(validate_patch(&ProductPatch::default()).is_err());
        let bad_price = ProductPatch {
            product_price: Some("free".into()),
            ..ProductPatch::default()
        };
        assert!(validate_patch(&bad_price).is_err());
        let quantity_only = ProductPatch {
            quantity: Some(4),
            ..ProductPatch::default()
        };
        assert!(validate_patch(&quantity_only).is_ok());
    }
}
