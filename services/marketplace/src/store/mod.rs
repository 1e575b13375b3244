//! Storage contracts for the marketplace.
//!
//! # Purpose
//! Splits persistence into the credential store consumed by the auth layer,
//! the session revocation list, and the catalogue store used by business
//! handlers. [`MarketplaceStore`] combines the three for application state.
//!
//! # Key invariants
//! - Lookups return `Ok(None)` for absent rows; `StoreError::NotFound` is only
//!   raised by updates that target a missing row.
//! - Email uniqueness is enforced per namespace (users, admins) and reported
//!   as `StoreError::Conflict`.
use crate::model::{
    Admin, AdminPatch, Advert, AdvertPatch, Category, IdentityField, Product, ProductImage,
    ProductPatch, User, UserPatch,
};
use async_trait::async_trait;
use duka_authz::Lifecycle;
use thiserror::Error;

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_id(&self, user_id: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn create_user(&self, user: User) -> StoreResult<User>;
    async fn update_user_field(&self, user_id: &str, field: IdentityField) -> StoreResult<()>;
    async fn update_user_profile(&self, user_id: &str, patch: UserPatch) -> StoreResult<User>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;

    async fn find_admin_by_id(&self, admin_id: &str) -> StoreResult<Option<Admin>>;
    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<Admin>>;
    async fn create_admin(&self, admin: Admin) -> StoreResult<Admin>;
    async fn update_admin_field(&self, admin_id: &str, field: IdentityField) -> StoreResult<()>;
    async fn update_admin_profile(&self, admin_id: &str, patch: AdminPatch)
    -> StoreResult<Admin>;
}

/// Revocation list of logged-out session ids.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Record `jti` as revoked until `expires_at` (epoch seconds).
    async fn revoke_session(&self, jti: &str, expires_at: i64) -> StoreResult<()>;
    async fn is_session_revoked(&self, jti: &str) -> StoreResult<bool>;
    /// Drop entries whose token would have expired by `now`.
    async fn purge_expired_sessions(&self, now: i64) -> StoreResult<u64>;
}

#[async_trait]
pub trait MarketStore: Send + Sync {
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
    async fn find_category(&self, name: &str) -> StoreResult<Option<Category>>;
    async fn create_category(&self, category: Category) -> StoreResult<Category>;
    async fn set_category_deleted(&self, name: &str, deleted: bool) -> StoreResult<()>;

    async fn create_product(
        &self,
        product: Product,
        images: Vec<ProductImage>,
    ) -> StoreResult<Product>;
    async fn find_product(&self, product_id: &str) -> StoreResult<Option<Product>>;
    async fn list_products(&self) -> StoreResult<Vec<Product>>;
    async fn update_product(&self, product_id: &str, patch: ProductPatch)
    -> StoreResult<Product>;
    async fn set_product_lifecycle(
        &self,
        product_id: &str,
        state: Lifecycle,
    ) -> StoreResult<Product>;
    async fn list_product_images(&self, product_id: &str) -> StoreResult<Vec<ProductImage>>;

    async fn create_advert(&self, advert: Advert) -> StoreResult<Advert>;
    async fn find_advert(&self, advert_id: &str) -> StoreResult<Option<Advert>>;
    async fn list_adverts(&self) -> StoreResult<Vec<Advert>>;
    async fn update_advert(&self, advert_id: &str, patch: AdvertPatch) -> StoreResult<Advert>;
    async fn set_advert_lifecycle(&self, advert_id: &str, state: Lifecycle)
    -> StoreResult<Advert>;
}

#[async_trait]
pub trait MarketplaceStore: CredentialStore + SessionStore + MarketStore {
    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}
