#![allow(dead_code)]

use axum::body::Body;
use axum::http::StatusCode;
use axum::http::header::HeaderName;
use duka_authz::{TokenIssuer, TokenVerifier};
use marketplace::app::{AppState, build_router};
use marketplace::auth::password::hash_password;
use marketplace::auth::session::SessionAuthenticator;
use marketplace::images::memory::InMemoryImageStore;
use marketplace::model::{Admin, AdminRole, Category, User};
use marketplace::store::memory::InMemoryStore;
use marketplace::store::{CredentialStore, MarketStore};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const SECRET: &[u8] = b"integration-test-secret";
pub const PASSWORD: &str = "correct-horse-battery";
/// base64 of `hello`.
pub const IMAGE: &str = "aGVsbG8=";

pub type App = axum::routing::RouterIntoService<Body, ()>;

pub struct TestApp {
    pub app: App,
    pub store: Arc<InMemoryStore>,
    pub images: Arc<InMemoryImageStore>,
    pub issuer: Arc<TokenIssuer>,
}

pub fn test_app() -> TestApp {
    let store = Arc::new(InMemoryStore::new());
    let images = Arc::new(InMemoryImageStore::new());
    let issuer = Arc::new(TokenIssuer::new(SECRET, Duration::from_secs(3600)));
    let sessions = SessionAuthenticator::new(
        Arc::new(TokenVerifier::new(SECRET, 0)),
        HeaderName::from_static("authorization"),
        "Bearer",
    );
    let state = AppState {
        service_name: "duka-marketplace".to_string(),
        api_version: "v1".to_string(),
        store: store.clone(),
        images: images.clone(),
        issuer: issuer.clone(),
        sessions: Arc::new(sessions),
    };
    TestApp {
        app: build_router(state).into_service(),
        store,
        images,
        issuer,
    }
}

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

pub async fn seed_user(store: &InMemoryStore, id: &str, approved: bool) -> User {
    let user = User {
        user_id: id.to_string(),
        first_name: "Achieng".to_string(),
        middle_name: String::new(),
        last_name: id.to_string(),
        email: format!("{id}@duka.test"),
        phone: "0700000000".to_string(),
        location: "Kisumu".to_string(),
        user_image: String::new(),
        password_hash: hash_password(PASSWORD).expect("hash"),
        is_approved: approved,
        last_token: None,
        date_joined: 1,
        last_logged_in: 1,
        last_interaction: 1,
    };
    store.create_user(user).await.expect("seed user")
}

pub async fn seed_admin(store: &InMemoryStore, id: &str) -> Admin {
    let admin = Admin {
        admin_id: id.to_string(),
        admin_name: format!("Admin {id}"),
        email: format!("{id}@admin.duka.test"),
        cell: String::new(),
        admin_image: String::new(),
        role: AdminRole::Admin,
        password_hash: hash_password(PASSWORD).expect("hash"),
        last_token: None,
        date_added: 1,
        last_logged_in: 0,
    };
    store.create_admin(admin).await.expect("seed admin")
}

pub async fn seed_category(store: &InMemoryStore, name: &str) -> Category {
    store
        .create_category(Category {
            category_id: format!("cat-{name}"),
            category_name: name.to_string(),
            category_image: String::new(),
            is_deleted: false,
        })
        .await
        .expect("seed category")
}

/// Log in through the HTTP API and return the bearer token.
pub async fn login(app: &App, path: &str, email: &str) -> String {
    let request = crate::http_helpers::json_request(
        "POST",
        path,
        serde_json::json!({ "email": email, "password": PASSWORD }),
    );
    let response = app.clone().oneshot(request).await.expect("login");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    body["data"]["token"]
        .as_str()
        .expect("token")
        .to_string()
}

pub async fn user_token(app: &App, user: &User) -> String {
    login(app, "/users/login", &user.email).await
}

pub async fn admin_token(app: &App, admin: &Admin) -> String {
    login(app, "/admins/login", &admin.email).await
}
