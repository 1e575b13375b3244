//! In-memory implementation of the marketplace store.
//!
//! # Purpose
//! Implements every store contract with `HashMap`s guarded by
//! `tokio::sync::RwLock`. Used for local development, tests, and deployments
//! that do not need durability.
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - Each method takes the write lock of the map it mutates, so a single
//!   operation is atomic; there is no cross-map transaction.
//!
//! # Mutation counter
//! Every successful write bumps [`InMemoryStore::mutation_count`]. Tests use
//! it to assert that idempotent transitions leave storage untouched.
use super::{
    CredentialStore, MarketStore, MarketplaceStore, SessionStore, StoreError, StoreResult,
};
use crate::model::{
    Admin, AdminPatch, Advert, AdvertPatch, Category, IdentityField, Product, ProductImage,
    ProductPatch, User, UserPatch,
};
use async_trait::async_trait;
use duka_authz::{Lifecycle, now_epoch_seconds};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryStore {
    /// Users keyed by `user_id`.
    users: Arc<RwLock<HashMap<String, User>>>,
    /// Admins keyed by `admin_id`.
    admins: Arc<RwLock<HashMap<String, Admin>>>,
    /// Revoked `jti` to the token's expiry.
    revoked: Arc<RwLock<HashMap<String, i64>>>,
    /// Categories keyed by name.
    categories: Arc<RwLock<HashMap<String, Category>>>,
    products: Arc<RwLock<HashMap<String, Product>>>,
    /// Gallery images keyed by `product_id`.
    product_images: Arc<RwLock<HashMap<String, Vec<ProductImage>>>>,
    adverts: Arc<RwLock<HashMap<String, Advert>>>,
    mutations: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes since construction.
    pub fn mutation_count(&self) -> u64 {
        self.mutations.load(Ordering::SeqCst)
    }

    fn mutated(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn find_user_by_id(&self, user_id: &str) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create_user(&self, user: User) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::Conflict("user email exists".into()));
        }
        if users.contains_key(&user.user_id) {
            return Err(StoreError::Conflict("user exists".into()));
        }
        users.insert(user.user_id.clone(), user.clone());
        self.mutated();
        Ok(user)
    }

    async fn update_user_field(&self, user_id: &str, field: IdentityField) -> StoreResult<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound("user".into()))?;
        match field {
            IdentityField::Approved(value) => user.is_approved = value,
            IdentityField::LastToken(value) => user.last_token = value,
            IdentityField::LastLogin(at) => {
                user.last_logged_in = at;
                user.last_interaction = at;
            }
        }
        self.mutated();
        Ok(())
    }

    async fn update_user_profile(&self, user_id: &str, patch: UserPatch) -> StoreResult<User> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound("user".into()))?;
        user.apply_patch(patch);
        user.last_interaction = now_epoch_seconds();
        self.mutated();
        Ok(user.clone())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| {
            a.date_joined
                .cmp(&b.date_joined)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        Ok(users)
    }

    async fn find_admin_by_id(&self, admin_id: &str) -> StoreResult<Option<Admin>> {
        Ok(self.admins.read().await.get(admin_id).cloned())
    }

    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<Admin>> {
        let admins = self.admins.read().await;
        Ok(admins
            .values()
            .find(|admin| admin.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create_admin(&self, admin: Admin) -> StoreResult<Admin> {
        let mut admins = self.admins.write().await;
        if admins
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(&admin.email))
        {
            return Err(StoreError::Conflict("admin email exists".into()));
        }
        admins.insert(admin.admin_id.clone(), admin.clone());
        self.mutated();
        Ok(admin)
    }

    async fn update_admin_field(&self, admin_id: &str, field: IdentityField) -> StoreResult<()> {
        let mut admins = self.admins.write().await;
        let admin = admins
            .get_mut(admin_id)
            .ok_or_else(|| StoreError::NotFound("admin".into()))?;
        match field {
            IdentityField::Approved(_) => return Ok(()),
            IdentityField::LastToken(value) => admin.last_token = value,
            IdentityField::LastLogin(at) => admin.last_logged_in = at,
        }
        self.mutated();
        Ok(())
    }

    async fn update_admin_profile(
        &self,
        admin_id: &str,
        patch: AdminPatch,
    ) -> StoreResult<Admin> {
        let mut admins = self.admins.write().await;
        let admin = admins
            .get_mut(admin_id)
            .ok_or_else(|| StoreError::NotFound("admin".into()))?;
        admin.apply_patch(patch);
        self.mutated();
        Ok(admin.clone())
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn revoke_session(&self, jti: &str, expires_at: i64) -> StoreResult<()> {
        let mut revoked = self.revoked.write().await;
        let now = now_epoch_seconds();
        revoked.retain(|_, exp| *exp > now);
        revoked.insert(jti.to_string(), expires_at);
        self.mutated();
        Ok(())
    }

    async fn is_session_revoked(&self, jti: &str) -> StoreResult<bool> {
        Ok(self.revoked.read().await.contains_key(jti))
    }

    async fn purge_expired_sessions(&self, now: i64) -> StoreResult<u64> {
        let mut revoked = self.revoked.write().await;
        let before = revoked.len();
        revoked.retain(|_, exp| *exp > now);
        let purged = (before - revoked.len()) as u64;
        if purged > 0 {
            self.mutated();
        }
        Ok(purged)
    }
}

#[async_trait]
impl MarketStore for InMemoryStore {
    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let mut categories: Vec<Category> =
            self.categories.read().await.values().cloned().collect();
        categories.sort_by(|a, b| a.category_name.cmp(&b.category_name));
        Ok(categories)
    }

    async fn find_category(&self, name: &str) -> StoreResult<Option<Category>> {
        Ok(self.categories.read().await.get(name).cloned())
    }

    async fn create_category(&self, category: Category) -> StoreResult<Category> {
        let mut categories = self.categories.write().await;
        if categories.contains_key(&category.category_name) {
            return Err(StoreError::Conflict("category exists".into()));
        }
        categories.insert(category.category_name.clone(), category.clone());
        self.mutated();
        Ok(category)
    }

    async fn set_category_deleted(&self, name: &str, deleted: bool) -> StoreResult<()> {
        let mut categories = self.categories.write().await;
        let category = categories
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound("category".into()))?;
        category.is_deleted = deleted;
        self.mutated();
        Ok(())
    }

    async fn create_product(
        &self,
        product: Product,
        images: Vec<ProductImage>,
    ) -> StoreResult<Product> {
        let mut products = self.products.write().await;
        if products
            .values()
            .any(|existing| existing.product_name == product.product_name)
        {
            return Err(StoreError::Conflict("product name exists".into()));
        }
        products.insert(product.product_id.clone(), product.clone());
        self.product_images
            .write()
            .await
            .insert(product.product_id.clone(), images);
        self.mutated();
        Ok(product)
    }

    async fn find_product(&self, product_id: &str) -> StoreResult<Option<Product>> {
        Ok(self.products.read().await.get(product_id).cloned())
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let mut products: Vec<Product> = self.products.read().await.values().cloned().collect();
        products.sort_by(|a, b| {
            b.date_added
                .cmp(&a.date_added)
                .then_with(|| a.product_id.cmp(&b.product_id))
        });
        Ok(products)
    }

    async fn update_product(
        &self,
        product_id: &str,
        patch: ProductPatch,
    ) -> StoreResult<Product> {
        let mut products = self.products.write().await;
        if let Some(name) = &patch.product_name
            && products
                .values()
                .any(|other| other.product_id != product_id && &other.product_name == name)
        {
            return Err(StoreError::Conflict("product name exists".into()));
        }
        let product = products
            .get_mut(product_id)
            .ok_or_else(|| StoreError::NotFound("product".into()))?;
        product.apply_patch(patch);
        product.last_updated = now_epoch_seconds();
        self.mutated();
        Ok(product.clone())
    }

    async fn set_product_lifecycle(
        &self,
        product_id: &str,
        state: Lifecycle,
    ) -> StoreResult<Product> {
        let mut products = self.products.write().await;
        let product = products
            .get_mut(product_id)
            .ok_or_else(|| StoreError::NotFound("product".into()))?;
        product.set_lifecycle(state);
        product.last_updated = now_epoch_seconds();
        self.mutated();
        Ok(product.clone())
    }

    async fn list_product_images(&self, product_id: &str) -> StoreResult<Vec<ProductImage>> {
        Ok(self
            .product_images
            .read()
            .await
            .get(product_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_advert(&self, advert: Advert) -> StoreResult<Advert> {
        let mut adverts = self.adverts.write().await;
        if adverts.contains_key(&advert.advert_id) {
            return Err(StoreError::Conflict("advert exists".into()));
        }
        adverts.insert(advert.advert_id.clone(), advert.clone());
        self.mutated();
        Ok(advert)
    }

    async fn find_advert(&self, advert_id: &str) -> StoreResult<Option<Advert>> {
        Ok(self.adverts.read().await.get(advert_id).cloned())
    }

    async fn list_adverts(&self) -> StoreResult<Vec<Advert>> {
        let mut adverts: Vec<Advert> = self.adverts.read().await.values().cloned().collect();
        adverts.sort_by(|a, b| {
            b.date_added
                .cmp(&a.date_added)
                .then_with(|| a.advert_id.cmp(&b.advert_id))
        });
        Ok(adverts)
    }

    async fn update_advert(&self, advert_id: &str, patch: AdvertPatch) -> StoreResult<Advert> {
        let mut adverts = self.adverts.write().await;
        let advert = adverts
            .get_mut(advert_id)
            .ok_or_else(|| StoreError::NotFound("advert".into()))?;
        advert.apply_patch(patch);
        advert.last_updated = now_epoch_seconds();
        self.mutated();
        Ok(advert.clone())
    }

    async fn set_advert_lifecycle(
        &self,
        advert_id: &str,
        state: Lifecycle,
    ) -> StoreResult<Advert> {
        let mut adverts = self.adverts.write().await;
        let advert = adverts
            .get_mut(advert_id)
            .ok_or_else(|| StoreError::NotFound("advert".into()))?;
        advert.set_lifecycle(state);
        advert.last_updated = now_epoch_seconds();
        self.mutated();
        Ok(advert.clone())
    }
}

#[async_trait]
impl MarketplaceStore for InMemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, email: &str) -> User {
        User {
            user_id: id.to_string(),
            first_name: "Amani".to_string(),
            middle_name: String::new(),
            last_name: "Otieno".to_string(),
            email: email.to_string(),
            phone: "0700000000".to_string(),
            location: "Nairobi".to_string(),
            user_image: String::new(),
            password_hash: "hash".to_string(),
            is_approved: false,
            last_token: None,
            date_joined: 1,
            last_logged_in: 1,
            last_interaction: 1,
        }
    }

    #[tokio::test]
    async fn duplicate_user_email_conflicts() {
        let store = InMemoryStore::new();
        store
            .create_user(user("u1", "a@example.com"))
            .await
            .expect("first");
        let err = store
            .create_user(user("u2", "A@example.com"))
            .await
            .expect_err("duplicate");
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.mutation_count(), 1);
    }

    #[tokio::test]
    async fn absent_lookups_return_none() {
        let store = InMemoryStore::new();
        assert!(store.find_user_by_id("nope").await.expect("lookup").is_none());
        assert!(
            store
                .find_admin_by_email("nope@example.com")
                .await
                .expect("lookup")
                .is_none()
        );
        let err = store
            .update_user_field("nope", IdentityField::Approved(true))
            .await
            .expect_err("missing");
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn identity_fields_update_in_place() {
        let store = InMemoryStore::new();
        store
            .create_user(user("u1", "a@example.com"))
            .await
            .expect("create");
        store
            .update_user_field("u1", IdentityField::Approved(true))
            .await
            .expect("approve");
        store
            .update_user_field("u1", IdentityField::LastToken(Some("t".into())))
            .await
            .expect("token");
        let stored = store
            .find_user_by_id("u1")
            .await
            .expect("lookup")
            .expect("present");
        assert!(stored.is_approved);
        assert_eq!(stored.last_token.as_deref(), Some("t"));
    }

    #[tokio::test]
    async fn revoked_sessions_expire_from_the_list() {
        let store = InMemoryStore::new();
        let now = now_epoch_seconds();
        store.revoke_session("live", now + 60).await.expect("revoke");
        store.revoke_session("stale", now - 1).await.expect("revoke");
        assert!(store.is_session_revoked("live").await.expect("check"));
        assert_eq!(store.purge_expired_sessions(now).await.expect("purge"), 1);
        assert!(!store.is_session_revoked("stale").await.expect("check"));
        assert!(store.is_session_revoked("live").await.expect("check"));
    }
}
