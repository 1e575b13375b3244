//! Marketplace HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
//!
//! # Notes
//! Routes that need a session are grouped on their own router behind
//! [`require_session`]; public routes never run the auth middleware.
use crate::api;
use crate::api::openapi::ApiDoc;
use crate::auth::middleware::require_session;
use crate::auth::session::SessionAuthenticator;
use crate::images::ImageStore;
use crate::observability;
use crate::store::MarketplaceStore;
use axum::Router;
use axum::routing::{get, post};
use duka_authz::TokenIssuer;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub service_name: String,
    pub api_version: String,
    pub store: Arc<dyn MarketplaceStore + Send + Sync>,
    pub images: Arc<dyn ImageStore + Send + Sync>,
    pub issuer: Arc<TokenIssuer>,
    pub sessions: Arc<SessionAuthenticator>,
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let parent = observability::trace_context_from_headers(request.headers());
            let span = tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            );
            span.set_parent(parent);
            span
        });

    let public = Router::new()
        .route("/v1/system/info", get(api::system::system_info))
        .route("/v1/system/health", get(api::system::system_health))
        .route("/users/register", post(api::users::register_user))
        .route("/users/login", post(api::users::login_user))
        .route("/users/sellers", get(api::users::list_sellers))
        .route("/users/:user_id", get(api::users::get_seller))
        .route("/admins/login", post(api::admins::login_admin))
        .route("/categories", get(api::categories::list_categories))
        .route("/products", get(api::products::list_products))
        .route("/products/:product_id", get(api::products::get_product))
        .route(
            "/products/:product_id/images",
            get(api::products::list_product_images),
        )
        .route("/adverts", get(api::adverts::list_adverts))
        .route("/adverts/:advert_id", get(api::adverts::get_advert));

    let protected = Router::new()
        .route("/users/logout", post(api::users::logout_user))
        .route(
            "/users/me",
            get(api::users::get_me).patch(api::users::update_me),
        )
        .route("/admins/register", post(api::admins::register_admin))
        .route("/admins/logout", post(api::admins::logout_admin))
        .route(
            "/admins/me",
            get(api::admins::get_admin_me).patch(api::admins::update_admin_me),
        )
        .route("/admins/sellers", get(api::admins::list_all_sellers))
        .route(
            "/admins/users/:user_id/approve",
            post(api::admins::approve_user),
        )
        .route(
            "/admins/users/:user_id/revoke",
            post(api::admins::revoke_user),
        )
        .route(
            "/admins/products/:product_id/approve",
            post(api::admins::approve_product),
        )
        .route("/categories", post(api::categories::create_category))
        .route(
            "/categories/:name",
            axum::routing::delete(api::categories::delete_category),
        )
        .route("/products", post(api::products::create_product))
        .route(
            "/products/:product_id",
            axum::routing::patch(api::products::update_product),
        )
        .route(
            "/products/:product_id/activate",
            post(api::products::activate_product),
        )
        .route(
            "/products/:product_id/deactivate",
            post(api::products::deactivate_product),
        )
        .route(
            "/products/:product_id/delete",
            post(api::products::delete_product),
        )
        .route(
            "/products/:product_id/restore",
            post(api::products::restore_product),
        )
        .route("/adverts", post(api::adverts::create_advert))
        .route(
            "/adverts/:advert_id",
            axum::routing::patch(api::adverts::update_advert),
        )
        .route(
            "/adverts/:advert_id/activate",
            post(api::adverts::activate_advert),
        )
        .route(
            "/adverts/:advert_id/deactivate",
            post(api::adverts::deactivate_advert),
        )
        .route(
            "/adverts/:advert_id/delete",
            post(api::adverts::delete_advert),
        )
        .route(
            "/adverts/:advert_id/restore",
            post(api::adverts::restore_advert),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    public
        .merge(protected)
        .merge(
            utoipa_swagger_ui::SwaggerUi::new("/docs").url("/v1/openapi.json", ApiDoc::openapi()),
        )
        .layer(trace_layer)
        .with_state(state)
}
