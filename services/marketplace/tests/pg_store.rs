#![cfg(feature = "pg-tests")]

use duka_authz::Lifecycle;
use marketplace::config::PostgresConfig;
use marketplace::model::{Advert, Category, IdentityField, Product, ProductImage, User};
use marketplace::store::postgres::PostgresStore;
use marketplace::store::{CredentialStore, MarketStore, MarketplaceStore, SessionStore, StoreError};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

static PG_STORE: tokio::sync::OnceCell<Arc<PostgresStore>> = tokio::sync::OnceCell::const_new();

async fn reset_postgres(url: &str) -> Result<(), sqlx::Error> {
    let pool = match tokio::time::timeout(
        std::time::Duration::from_secs(2),
        PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(std::time::Duration::from_secs(2))
            .connect(url),
    )
    .await
    {
        Ok(result) => result?,
        Err(_) => return Err(sqlx::Error::PoolTimedOut),
    };
    // Tables may not exist before the first migration run.
    let _ = sqlx::query(
        "TRUNCATE product_images, products, adverts, categories, revoked_sessions, admins, users",
    )
    .execute(&pool)
    .await;
    Ok(())
}

async fn pg_store() -> Option<Arc<PostgresStore>> {
    let url = match std::env::var("DUKA_PG_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("skipping pg-tests: set DUKA_PG_URL or DATABASE_URL");
            return None;
        }
    };
    if let Err(err) = reset_postgres(&url).await {
        eprintln!("skipping pg-tests: cannot connect to postgres: {err}");
        return None;
    }
    let pg = PostgresConfig {
        url,
        max_connections: 5,
        connect_timeout_ms: 5_000,
        acquire_timeout_ms: 5_000,
    };
    match PG_STORE
        .get_or_try_init(|| async { PostgresStore::connect(&pg).await.map(Arc::new) })
        .await
    {
        Ok(store) => Some(Arc::clone(store)),
        Err(err) => {
            eprintln!("skipping pg-tests: connect postgres store failed: {err}");
            None
        }
    }
}

fn user(id: &str) -> User {
    User {
        user_id: id.to_string(),
        first_name: "Wanjiru".to_string(),
        middle_name: String::new(),
        last_name: id.to_string(),
        email: format!("{id}@Duka.Test"),
        phone: "0711000000".to_string(),
        location: "Nairobi".to_string(),
        user_image: String::new(),
        password_hash: "hash".to_string(),
        is_approved: false,
        last_token: None,
        date_joined: 10,
        last_logged_in: 10,
        last_interaction: 10,
    }
}

fn product(id: &str, owner: &str, category: &str) -> Product {
    Product {
        product_id: id.to_string(),
        product_name: format!("product {id}"),
        product_price: "100.50".to_string(),
        product_description: String::new(),
        owner_id: owner.to_string(),
        main_image: String::new(),
        quantity: 3,
        product_type: "goods".to_string(),
        brand: String::new(),
        category: category.to_string(),
        sub_category: String::new(),
        total_likes: 0,
        total_comments: 0,
        total_bookmarks: 0,
        total_interactions: 0,
        date_added: 10,
        last_updated: 10,
        is_active: true,
        is_approved: false,
        is_deleted: false,
    }
}

// One test drives the whole store so the shared database is never truncated
// underneath a concurrent test.
#[tokio::test]
async fn postgres_store_round_trips_marketplace_records() {
    let Some(store) = pg_store().await else {
        return;
    };
    assert!(store.is_durable());
    store.health_check().await.expect("health");

    let created = store.create_user(user("pg-user")).await.expect("create user");
    let found = store
        .find_user_by_email("PG-USER@duka.test")
        .await
        .expect("lookup")
        .expect("user by email");
    assert_eq!(found.user_id, created.user_id);
    let duplicate = store.create_user(user("pg-user")).await;
    assert!(matches!(duplicate, Err(StoreError::Conflict(_))));

    store
        .update_user_field("pg-user", IdentityField::Approved(true))
        .await
        .expect("approve");
    store
        .update_user_field("pg-user", IdentityField::LastToken(Some("jti".to_string())))
        .await
        .expect("token");
    let found = store
        .find_user_by_id("pg-user")
        .await
        .expect("lookup")
        .expect("user");
    assert!(found.is_approved);
    assert_eq!(found.last_token.as_deref(), Some("jti"));

    store.revoke_session("jti-1", 100).await.expect("revoke");
    assert!(store.is_session_revoked("jti-1").await.expect("revoked"));
    assert_eq!(store.purge_expired_sessions(200).await.expect("purge"), 1);
    assert!(!store.is_session_revoked("jti-1").await.expect("purged"));

    store
        .create_category(Category {
            category_id: "cat-1".to_string(),
            category_name: "tools".to_string(),
            category_image: String::new(),
            is_deleted: false,
        })
        .await
        .expect("category");
    store
        .set_category_deleted("tools", true)
        .await
        .expect("soft delete");
    let category = store
        .find_category("tools")
        .await
        .expect("lookup")
        .expect("category");
    assert!(category.is_deleted);

    let images = vec![ProductImage {
        image_id: "img-1".to_string(),
        product_id: "prod-1".to_string(),
        image_url: "products/prod-1-gallery-0".to_string(),
    }];
    store
        .create_product(product("prod-1", "pg-user", "tools"), images)
        .await
        .expect("product");
    let listed = store.list_product_images("prod-1").await.expect("images");
    assert_eq!(listed.len(), 1);
    let updated = store
        .set_product_lifecycle(
            "prod-1",
            Lifecycle {
                active: false,
                approved: true,
                deleted: false,
            },
        )
        .await
        .expect("lifecycle");
    assert!(updated.is_approved);
    assert!(!updated.is_active);
    assert_eq!(updated.product_price, "100.50");

    let advert = store
        .create_advert(Advert {
            advert_id: "ad-1".to_string(),
            owner_id: "pg-user".to_string(),
            title: "Sale".to_string(),
            description: String::new(),
            image: String::new(),
            link: String::new(),
            date_added: 10,
            last_updated: 10,
            is_active: true,
            is_deleted: false,
        })
        .await
        .expect("advert");
    assert_eq!(store.list_adverts().await.expect("adverts").len(), 1);
    assert_eq!(advert.owner_id, "pg-user");
    let missing = store
        .set_advert_lifecycle(
            "ad-missing",
            Lifecycle {
                active: false,
                approved: true,
                deleted: false,
            },
        )
        .await;
    assert!(matches!(missing, Err(StoreError::NotFound(_))));
}
