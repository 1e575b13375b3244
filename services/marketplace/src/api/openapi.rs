//! OpenAPI schema aggregation for the marketplace API.
//!
//! # Purpose
//! Collects all routes and schema types into a single OpenAPI document served
//! at `/v1/openapi.json` and rendered by Swagger UI at `/docs`.
use crate::api::types::{
    CreateAdvertRequest, CreateCategoryRequest, CreateProductRequest, ErrorResponse,
    HealthStatus, LoginRequest, ProductDetail, RegisterAdminRequest, RegisterUserRequest,
    SellerProfile, SellerSummary, SessionResponse, SystemInfo,
};
use crate::api::{adverts, admins, categories, products, system, users};
use crate::model::{
    Admin, AdminPatch, AdminRole, Advert, AdvertPatch, Category, Product, ProductImage,
    ProductPatch, PublicSeller, User, UserPatch,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "duka-marketplace",
        version = "v1",
        description = "Duka marketplace HTTP API"
    ),
    paths(
        system::system_info,
        system::system_health,
        users::register_user,
        users::login_user,
        users::logout_user,
        users::get_me,
        users::update_me,
        users::list_sellers,
        users::get_seller,
        admins::register_admin,
        admins::login_admin,
        admins::logout_admin,
        admins::get_admin_me,
        admins::update_admin_me,
        admins::list_all_sellers,
        admins::approve_user,
        admins::revoke_user,
        admins::approve_product,
        categories::list_categories,
        categories::create_category,
        categories::delete_category,
        products::list_products,
        products::create_product,
        products::get_product,
        products::list_product_images,
        products::update_product,
        products::activate_product,
        products::deactivate_product,
        products::delete_product,
        products::restore_product,
        adverts::list_adverts,
        adverts::get_advert,
        adverts::create_advert,
        adverts::update_advert,
        adverts::activate_advert,
        adverts::deactivate_advert,
        adverts::delete_advert,
        adverts::restore_advert
    ),
    components(schemas(
        SystemInfo,
        HealthStatus,
        ErrorResponse,
        RegisterUserRequest,
        LoginRequest,
        SessionResponse,
        RegisterAdminRequest,
        CreateCategoryRequest,
        CreateProductRequest,
        CreateAdvertRequest,
        SellerSummary,
        SellerProfile,
        ProductDetail,
        User,
        UserPatch,
        PublicSeller,
        Admin,
        AdminPatch,
        AdminRole,
        Category,
        Product,
        ProductImage,
        ProductPatch,
        Advert,
        AdvertPatch
    )),
    modifiers(&SessionTokenAuth),
    tags(
        (name = "system", description = "Service metadata and probes"),
        (name = "users", description = "Seller accounts and sessions"),
        (name = "admins", description = "Admin accounts and moderation"),
        (name = "categories", description = "Product categories"),
        (name = "products", description = "Product catalogue"),
        (name = "adverts", description = "Adverts")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` scheme referenced by protected routes.
struct SessionTokenAuth;

impl Modify for SessionTokenAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_protected_and_public_routes() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/users/login"));
        assert!(paths.contains_key("/admins/users/{user_id}/approve"));
        assert!(paths.contains_key("/products/{product_id}/delete"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer"));
        assert!(components.schemas.contains_key("SessionResponse"));
    }
}
