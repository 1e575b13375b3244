//! Postgres-backed implementation of the marketplace store.
//!
//! # Key invariants
//! - Email uniqueness is enforced by case-insensitive unique indexes; unique
//!   violations (`23505`) surface as [`StoreError::Conflict`].
//! - Profile and catalogue updates read the row `FOR UPDATE`, apply the patch
//!   on the domain type, and write it back in the same transaction.
//! - The revocation list keeps a row per logged-out `jti` until the token's
//!   natural expiry.
//!
//! # Security notes
//! - Database URLs may contain credentials; never log `PostgresConfig::url`.
//! - All SQL is static and parameterized.
//!
//! # Operational notes
//! Migrations run at connect time via `sqlx::migrate!("./migrations")` so
//! handlers can assume the schema exists.
use super::{
    CredentialStore, MarketStore, MarketplaceStore, SessionStore, StoreError, StoreResult,
};
use crate::config::PostgresConfig;
use crate::model::{
    Admin, AdminPatch, AdminRole, Advert, AdvertPatch, Category, IdentityField, Product,
    ProductImage, ProductPatch, User, UserPatch,
};
use anyhow::anyhow;
use async_trait::async_trait;
use duka_authz::{Lifecycle, now_epoch_seconds};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use std::time::Duration;

pub struct PostgresStore {
    pool: PgPool,
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unexpected(err.into())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Unexpected(err.into())
    }
}

#[derive(Debug, Clone, FromRow)]
struct DbUser {
    user_id: String,
    first_name: String,
    middle_name: String,
    last_name: String,
    email: String,
    phone: String,
    location: String,
    user_image: String,
    password_hash: String,
    is_approved: bool,
    last_token: Option<String>,
    date_joined: i64,
    last_logged_in: i64,
    last_interaction: i64,
}

impl From<DbUser> for User {
    fn from(row: DbUser) -> Self {
        User {
            user_id: row.user_id,
            first_name: row.first_name,
            middle_name: row.middle_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            location: row.location,
            user_image: row.user_image,
            password_hash: row.password_hash,
            is_approved: row.is_approved,
            last_token: row.last_token,
            date_joined: row.date_joined,
            last_logged_in: row.last_logged_in,
            last_interaction: row.last_interaction,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct DbAdmin {
    admin_id: String,
    admin_name: String,
    email: String,
    cell: String,
    admin_image: String,
    role: String,
    password_hash: String,
    last_token: Option<String>,
    date_added: i64,
    last_logged_in: i64,
}

fn admin_from_db(row: DbAdmin) -> StoreResult<Admin> {
    let role = AdminRole::from_str(&row.role)
        .map_err(|_| StoreError::Unexpected(anyhow!("unknown admin role: {}", row.role)))?;
    Ok(Admin {
        admin_id: row.admin_id,
        admin_name: row.admin_name,
        email: row.email,
        cell: row.cell,
        admin_image: row.admin_image,
        role,
        password_hash: row.password_hash,
        last_token: row.last_token,
        date_added: row.date_added,
        last_logged_in: row.last_logged_in,
    })
}

#[derive(Debug, Clone, FromRow)]
struct DbCategory {
    category_id: String,
    category_name: String,
    category_image: String,
    is_deleted: bool,
}

impl From<DbCategory> for Category {
    fn from(row: DbCategory) -> Self {
        Category {
            category_id: row.category_id,
            category_name: row.category_name,
            category_image: row.category_image,
            is_deleted: row.is_deleted,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct DbProduct {
    product_id: String,
    product_name: String,
    product_price: String,
    product_description: String,
    owner_id: String,
    main_image: String,
    quantity: i32,
    product_type: String,
    brand: String,
    category: String,
    sub_category: String,
    total_likes: i32,
    total_comments: i32,
    total_bookmarks: i32,
    total_interactions: i32,
    date_added: i64,
    last_updated: i64,
    is_active: bool,
    is_approved: bool,
    is_deleted: bool,
}

impl From<DbProduct> for Product {
    fn from(row: DbProduct) -> Self {
        Product {
            product_id: row.product_id,
            product_name: row.product_name,
            product_price: row.product_price,
            product_description: row.product_description,
            owner_id: row.owner_id,
            main_image: row.main_image,
            quantity: row.quantity,
            product_type: row.product_type,
            brand: row.brand,
            category: row.category,
            sub_category: row.sub_category,
            total_likes: row.total_likes,
            total_comments: row.total_comments,
            total_bookmarks: row.total_bookmarks,
            total_interactions: row.total_interactions,
            date_added: row.date_added,
            last_updated: row.last_updated,
            is_active: row.is_active,
            is_approved: row.is_approved,
            is_deleted: row.is_deleted,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct DbProductImage {
    image_id: String,
    product_id: String,
    image_url: String,
}

#[derive(Debug, Clone, FromRow)]
struct DbAdvert {
    advert_id: String,
    owner_id: String,
    title: String,
    description: String,
    image: String,
    link: String,
    date_added: i64,
    last_updated: i64,
    is_active: bool,
    is_deleted: bool,
}

impl From<DbAdvert> for Advert {
    fn from(row: DbAdvert) -> Self {
        Advert {
            advert_id: row.advert_id,
            owner_id: row.owner_id,
            title: row.title,
            description: row.description,
            image: row.image,
            link: row.link,
            date_added: row.date_added,
            last_updated: row.last_updated,
            is_active: row.is_active,
            is_deleted: row.is_deleted,
        }
    }
}

const USER_COLUMNS: &str = "user_id, first_name, middle_name, last_name, email, phone, location, user_image, password_hash, is_approved, last_token, date_joined, last_logged_in, last_interaction";
const ADMIN_COLUMNS: &str = "admin_id, admin_name, email, cell, admin_image, role, password_hash, last_token, date_added, last_logged_in";
const PRODUCT_COLUMNS: &str = "product_id, product_name, product_price, product_description, owner_id, main_image, quantity, product_type, brand, category, sub_category, total_likes, total_comments, total_bookmarks, total_interactions, date_added, last_updated, is_active, is_approved, is_deleted";
const ADVERT_COLUMNS: &str = "advert_id, owner_id, title, description, image, link, date_added, last_updated, is_active, is_deleted";

impl PostgresStore {
    /// Connect to Postgres and apply embedded migrations.
    ///
    /// # Errors
    /// - Connection, pool setup, or migration failures.
    pub async fn connect(pg: &PostgresConfig) -> StoreResult<Self> {
        let connect_options = PgConnectOptions::from_str(&pg.url)?;
        let pool = tokio::time::timeout(
            Duration::from_millis(pg.connect_timeout_ms),
            PgPoolOptions::new()
                .max_connections(pg.max_connections)
                .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
                .connect_with(connect_options),
        )
        .await
        .map_err(|_| StoreError::Unexpected(anyhow!("postgres connect timed out")))??;

        // Handlers assume the schema exists; fail startup otherwise.
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    async fn user_where(&self, clause: &str, value: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {clause}");
        let row = sqlx::query_as::<_, DbUser>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn admin_where(&self, clause: &str, value: &str) -> StoreResult<Option<Admin>> {
        let sql = format!("SELECT {ADMIN_COLUMNS} FROM admins WHERE {clause}");
        let row = sqlx::query_as::<_, DbAdmin>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        row.map(admin_from_db).transpose()
    }

    async fn write_product(
        &self,
        product_id: &str,
        update: impl FnOnce(&mut Product) + Send,
    ) -> StoreResult<Product> {
        let mut tx = self.pool.begin().await?;
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE product_id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, DbProduct>(&sql)
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound("product".into()))?;
        let mut product = Product::from(row);
        update(&mut product);
        product.last_updated = now_epoch_seconds();
        let result = sqlx::query(
            r#"UPDATE products SET product_name = $2, product_price = $3,
                product_description = $4, quantity = $5, product_type = $6, brand = $7,
                category = $8, sub_category = $9, last_updated = $10, is_active = $11,
                is_approved = $12, is_deleted = $13
            WHERE product_id = $1"#,
        )
        .bind(&product.product_id)
        .bind(&product.product_name)
        .bind(&product.product_price)
        .bind(&product.product_description)
        .bind(product.quantity)
        .bind(&product.product_type)
        .bind(&product.brand)
        .bind(&product.category)
        .bind(&product.sub_category)
        .bind(product.last_updated)
        .bind(product.is_active)
        .bind(product.is_approved)
        .bind(product.is_deleted)
        .execute(&mut *tx)
        .await;
        if let Err(err) = result {
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict("product name exists".into()));
            }
            return Err(err.into());
        }
        tx.commit().await?;
        Ok(product)
    }

    async fn write_advert(
        &self,
        advert_id: &str,
        update: impl FnOnce(&mut Advert) + Send,
    ) -> StoreResult<Advert> {
        let mut tx = self.pool.begin().await?;
        let sql = format!("SELECT {ADVERT_COLUMNS} FROM adverts WHERE advert_id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, DbAdvert>(&sql)
            .bind(advert_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound("advert".into()))?;
        let mut advert = Advert::from(row);
        update(&mut advert);
        advert.last_updated = now_epoch_seconds();
        sqlx::query(
            r#"UPDATE adverts SET title = $2, description = $3, link = $4, last_updated = $5,
                is_active = $6, is_deleted = $7
            WHERE advert_id = $1"#,
        )
        .bind(&advert.advert_id)
        .bind(&advert.title)
        .bind(&advert.description)
        .bind(&advert.link)
        .bind(advert.last_updated)
        .bind(advert.is_active)
        .bind(advert.is_deleted)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(advert)
    }
}

#[async_trait]
impl CredentialStore for PostgresStore {
    async fn find_user_by_id(&self, user_id: &str) -> StoreResult<Option<User>> {
        self.user_where("user_id = $1", user_id).await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.user_where("LOWER(email) = LOWER($1)", email).await
    }

    async fn create_user(&self, user: User) -> StoreResult<User> {
        let insert = sqlx::query(
            r#"INSERT INTO users (user_id, first_name, middle_name, last_name, email, phone,
                location, user_image, password_hash, is_approved, last_token, date_joined,
                last_logged_in, last_interaction)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"#,
        )
        .bind(&user.user_id)
        .bind(&user.first_name)
        .bind(&user.middle_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.location)
        .bind(&user.user_image)
        .bind(&user.password_hash)
        .bind(user.is_approved)
        .bind(&user.last_token)
        .bind(user.date_joined)
        .bind(user.last_logged_in)
        .bind(user.last_interaction)
        .execute(&self.pool)
        .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict("user email exists".into()));
            }
            return Err(err.into());
        }
        Ok(user)
    }

    async fn update_user_field(&self, user_id: &str, field: IdentityField) -> StoreResult<()> {
        let result = match field {
            IdentityField::Approved(value) => {
                sqlx::query("UPDATE users SET is_approved = $2 WHERE user_id = $1")
                    .bind(user_id)
                    .bind(value)
                    .execute(&self.pool)
                    .await?
            }
            IdentityField::LastToken(value) => {
                sqlx::query("UPDATE users SET last_token = $2 WHERE user_id = $1")
                    .bind(user_id)
                    .bind(value)
                    .execute(&self.pool)
                    .await?
            }
            IdentityField::LastLogin(at) => sqlx::query(
                "UPDATE users SET last_logged_in = $2, last_interaction = $2 WHERE user_id = $1",
            )
            .bind(user_id)
            .bind(at)
            .execute(&self.pool)
            .await?,
        };
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("user".into()));
        }
        Ok(())
    }

    async fn update_user_profile(&self, user_id: &str, patch: UserPatch) -> StoreResult<User> {
        let mut tx = self.pool.begin().await?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, DbUser>(&sql)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound("user".into()))?;
        let mut user = User::from(row);
        user.apply_patch(patch);
        user.last_interaction = now_epoch_seconds();
        sqlx::query(
            r#"UPDATE users SET first_name = $2, middle_name = $3, last_name = $4, phone = $5,
                location = $6, last_interaction = $7
            WHERE user_id = $1"#,
        )
        .bind(&user.user_id)
        .bind(&user.first_name)
        .bind(&user.middle_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.location)
        .bind(user.last_interaction)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(user)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY date_joined, user_id");
        let rows = sqlx::query_as::<_, DbUser>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn find_admin_by_id(&self, admin_id: &str) -> StoreResult<Option<Admin>> {
        self.admin_where("admin_id = $1", admin_id).await
    }

    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<Admin>> {
        self.admin_where("LOWER(email) = LOWER($1)", email).await
    }

    async fn create_admin(&self, admin: Admin) -> StoreResult<Admin> {
        let insert = sqlx::query(
            r#"INSERT INTO admins (admin_id, admin_name, email, cell, admin_image, role,
                password_hash, last_token, date_added, last_logged_in)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
        )
        .bind(&admin.admin_id)
        .bind(&admin.admin_name)
        .bind(&admin.email)
        .bind(&admin.cell)
        .bind(&admin.admin_image)
        .bind(admin.role.as_str())
        .bind(&admin.password_hash)
        .bind(&admin.last_token)
        .bind(admin.date_added)
        .bind(admin.last_logged_in)
        .execute(&self.pool)
        .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict("admin email exists".into()));
            }
            return Err(err.into());
        }
        Ok(admin)
    }

    async fn update_admin_field(&self, admin_id: &str, field: IdentityField) -> StoreResult<()> {
        let result = match field {
            IdentityField::Approved(_) => return Ok(()),
            IdentityField::LastToken(value) => {
                sqlx::query("UPDATE admins SET last_token = $2 WHERE admin_id = $1")
                    .bind(admin_id)
                    .bind(value)
                    .execute(&self.pool)
                    .await?
            }
            IdentityField::LastLogin(at) => {
                sqlx::query("UPDATE admins SET last_logged_in = $2 WHERE admin_id = $1")
                    .bind(admin_id)
                    .bind(at)
                    .execute(&self.pool)
                    .await?
            }
        };
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("admin".into()));
        }
        Ok(())
    }

    async fn update_admin_profile(
        &self,
        admin_id: &str,
        patch: AdminPatch,
    ) -> StoreResult<Admin> {
        let mut admin = self
            .find_admin_by_id(admin_id)
            .await?
            .ok_or_else(|| StoreError::NotFound("admin".into()))?;
        admin.apply_patch(patch);
        sqlx::query("UPDATE admins SET admin_name = $2, cell = $3 WHERE admin_id = $1")
            .bind(&admin.admin_id)
            .bind(&admin.admin_name)
            .bind(&admin.cell)
            .execute(&self.pool)
            .await?;
        Ok(admin)
    }
}

#[async_trait]
impl SessionStore for PostgresStore {
    async fn revoke_session(&self, jti: &str, expires_at: i64) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO revoked_sessions (jti, expires_at) VALUES ($1, $2)
            ON CONFLICT (jti) DO UPDATE SET expires_at = EXCLUDED.expires_at"#,
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn is_session_revoked(&self, jti: &str) -> StoreResult<bool> {
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM revoked_sessions WHERE jti = $1",
        )
        .bind(jti)
        .fetch_one(&self.pool)
        .await?;
        Ok(found > 0)
    }

    async fn purge_expired_sessions(&self, now: i64) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM revoked_sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl MarketStore for PostgresStore {
    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, DbCategory>(
            "SELECT category_id, category_name, category_image, is_deleted FROM categories ORDER BY category_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn find_category(&self, name: &str) -> StoreResult<Option<Category>> {
        let row = sqlx::query_as::<_, DbCategory>(
            "SELECT category_id, category_name, category_image, is_deleted FROM categories WHERE category_name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Category::from))
    }

    async fn create_category(&self, category: Category) -> StoreResult<Category> {
        let insert = sqlx::query(
            r#"INSERT INTO categories (category_id, category_name, category_image, is_deleted)
            VALUES ($1, $2, $3, $4)"#,
        )
        .bind(&category.category_id)
        .bind(&category.category_name)
        .bind(&category.category_image)
        .bind(category.is_deleted)
        .execute(&self.pool)
        .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict("category exists".into()));
            }
            return Err(err.into());
        }
        Ok(category)
    }

    async fn set_category_deleted(&self, name: &str, deleted: bool) -> StoreResult<()> {
        let result = sqlx::query("UPDATE categories SET is_deleted = $2 WHERE category_name = $1")
            .bind(name)
            .bind(deleted)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("category".into()));
        }
        Ok(())
    }

    async fn create_product(
        &self,
        product: Product,
        images: Vec<ProductImage>,
    ) -> StoreResult<Product> {
        let mut tx = self.pool.begin().await?;
        let insert = sqlx::query(
            r#"INSERT INTO products (product_id, product_name, product_price,
                product_description, owner_id, main_image, quantity, product_type, brand,
                category, sub_category, total_likes, total_comments, total_bookmarks,
                total_interactions, date_added, last_updated, is_active, is_approved, is_deleted)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                $17, $18, $19, $20)"#,
        )
        .bind(&product.product_id)
        .bind(&product.product_name)
        .bind(&product.product_price)
        .bind(&product.product_description)
        .bind(&product.owner_id)
        .bind(&product.main_image)
        .bind(product.quantity)
        .bind(&product.product_type)
        .bind(&product.brand)
        .bind(&product.category)
        .bind(&product.sub_category)
        .bind(product.total_likes)
        .bind(product.total_comments)
        .bind(product.total_bookmarks)
        .bind(product.total_interactions)
        .bind(product.date_added)
        .bind(product.last_updated)
        .bind(product.is_active)
        .bind(product.is_approved)
        .bind(product.is_deleted)
        .execute(&mut *tx)
        .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict("product name exists".into()));
            }
            return Err(err.into());
        }
        for image in &images {
            sqlx::query(
                "INSERT INTO product_images (image_id, product_id, image_url) VALUES ($1, $2, $3)",
            )
            .bind(&image.image_id)
            .bind(&image.product_id)
            .bind(&image.image_url)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(product)
    }

    async fn find_product(&self, product_id: &str) -> StoreResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE product_id = $1");
        let row = sqlx::query_as::<_, DbProduct>(&sql)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Product::from))
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let sql =
            format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY date_added DESC, product_id");
        let rows = sqlx::query_as::<_, DbProduct>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn update_product(
        &self,
        product_id: &str,
        patch: ProductPatch,
    ) -> StoreResult<Product> {
        self.write_product(product_id, move |product| product.apply_patch(patch))
            .await
    }

    async fn set_product_lifecycle(
        &self,
        product_id: &str,
        state: Lifecycle,
    ) -> StoreResult<Product> {
        self.write_product(product_id, move |product| product.set_lifecycle(state))
            .await
    }

    async fn list_product_images(&self, product_id: &str) -> StoreResult<Vec<ProductImage>> {
        let rows = sqlx::query_as::<_, DbProductImage>(
            "SELECT image_id, product_id, image_url FROM product_images WHERE product_id = $1 ORDER BY image_id",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| ProductImage {
                image_id: row.image_id,
                product_id: row.product_id,
                image_url: row.image_url,
            })
            .collect())
    }

    async fn create_advert(&self, advert: Advert) -> StoreResult<Advert> {
        let insert = sqlx::query(
            r#"INSERT INTO adverts (advert_id, owner_id, title, description, image, link,
                date_added, last_updated, is_active, is_deleted)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
        )
        .bind(&advert.advert_id)
        .bind(&advert.owner_id)
        .bind(&advert.title)
        .bind(&advert.description)
        .bind(&advert.image)
        .bind(&advert.link)
        .bind(advert.date_added)
        .bind(advert.last_updated)
        .bind(advert.is_active)
        .bind(advert.is_deleted)
        .execute(&self.pool)
        .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict("advert exists".into()));
            }
            return Err(err.into());
        }
        Ok(advert)
    }

    async fn find_advert(&self, advert_id: &str) -> StoreResult<Option<Advert>> {
        let sql = format!("SELECT {ADVERT_COLUMNS} FROM adverts WHERE advert_id = $1");
        let row = sqlx::query_as::<_, DbAdvert>(&sql)
            .bind(advert_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Advert::from))
    }

    async fn list_adverts(&self) -> StoreResult<Vec<Advert>> {
        let sql =
            format!("SELECT {ADVERT_COLUMNS} FROM adverts ORDER BY date_added DESC, advert_id");
        let rows = sqlx::query_as::<_, DbAdvert>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Advert::from).collect())
    }

    async fn update_advert(&self, advert_id: &str, patch: AdvertPatch) -> StoreResult<Advert> {
        self.write_advert(advert_id, move |advert| advert.apply_patch(patch))
            .await
    }

    async fn set_advert_lifecycle(
        &self,
        advert_id: &str,
        state: Lifecycle,
    ) -> StoreResult<Advert> {
        self.write_advert(advert_id, move |advert| advert.set_lifecycle(state))
            .await
    }
}

#[async_trait]
impl MarketplaceStore for PostgresStore {
    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|code| code == "23505").unwrap_or(false);
    }
    false
}
