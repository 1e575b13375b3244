mod common;

use axum::http::StatusCode;
use common::{PASSWORD, read_json, seed_user, test_app};
use duka_authz::{Principal, Role, TokenIssuer, now_epoch_seconds};
use http_helpers::{authed_request, get, json_request};
use marketplace::store::CredentialStore;
use std::time::Duration;
use tower::ServiceExt;

fn registration(email: &str) -> serde_json::Value {
    serde_json::json!({
        "first_name": "Amani",
        "last_name": "Otieno",
        "email": email,
        "phone": "0711000000",
        "location": "Nairobi",
        "password": PASSWORD
    })
}

async fn assert_unauthenticated(response: axum::response::Response) {
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "unauthenticated");
    assert_eq!(body["message"], "authentication required");
}

#[tokio::test]
async fn register_login_logout_revokes_the_session() {
    let harness = test_app();
    let app = harness.app.clone();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/users/register",
            registration("amani@duka.test"),
        ))
        .await
        .expect("register");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["role"], "user");
    let user_id = body["data"]["identity_id"].as_str().expect("id").to_string();

    let token = common::login(&app, "/users/login", "amani@duka.test").await;
    let stored = harness
        .store
        .find_user_by_id(&user_id)
        .await
        .expect("lookup")
        .expect("user");
    assert_eq!(stored.last_token.as_deref(), Some(token.as_str()));
    assert!(!stored.is_approved);

    let response = app
        .clone()
        .oneshot(authed_request("GET", "/users/me", &token))
        .await
        .expect("me");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["email"], "amani@duka.test");
    assert!(body["data"].get("password_hash").is_none());

    let response = app
        .clone()
        .oneshot(authed_request("POST", "/users/logout", &token))
        .await
        .expect("logout");
    assert_eq!(response.status(), StatusCode::OK);
    let stored = harness
        .store
        .find_user_by_id(&user_id)
        .await
        .expect("lookup")
        .expect("user");
    assert_eq!(stored.last_token, None);

    let response = app
        .clone()
        .oneshot(authed_request("GET", "/users/me", &token))
        .await
        .expect("me after logout");
    assert_unauthenticated(response).await;
}

#[tokio::test]
async fn expired_foreign_and_malformed_tokens_get_the_same_401() {
    let harness = test_app();
    let user = seed_user(&harness.store, "wanjiru", true).await;
    let principal = Principal::new(user.user_id.clone(), Role::User, true);

    let expired = TokenIssuer::new(common::SECRET, Duration::from_secs(60))
        .issue_at(&principal, now_epoch_seconds() - 3_600)
        .expect("issue");
    let foreign = TokenIssuer::new(b"someone-else", Duration::from_secs(60))
        .issue(&principal)
        .expect("issue");

    for token in [expired.token.as_str(), foreign.token.as_str(), "not-a-jwt"] {
        let response = harness
            .app
            .clone()
            .oneshot(authed_request("GET", "/users/me", token))
            .await
            .expect("request");
        assert_unauthenticated(response).await;
    }

    let response = harness
        .app
        .clone()
        .oneshot(get("/users/me"))
        .await
        .expect("no header");
    assert_unauthenticated(response).await;

    let basic = axum::http::Request::builder()
        .uri("/users/me")
        .header("authorization", format!("Basic {}", foreign.token))
        .body(axum::body::Body::empty())
        .expect("request");
    let response = harness.app.clone().oneshot(basic).await.expect("basic");
    assert_unauthenticated(response).await;
}

#[tokio::test]
async fn tokens_for_unknown_identities_are_rejected() {
    let harness = test_app();
    let ghost = harness
        .issuer
        .issue(&Principal::new("ghost", Role::User, true))
        .expect("issue");
    let response = harness
        .app
        .clone()
        .oneshot(authed_request("GET", "/users/me", &ghost.token))
        .await
        .expect("request");
    assert_unauthenticated(response).await;
}

#[tokio::test]
async fn login_failures_do_not_leak_which_part_was_wrong() {
    let harness = test_app();
    let user = seed_user(&harness.store, "baraka", true).await;

    let attempts = [
        serde_json::json!({ "email": user.email, "password": "wrong-password" }),
        serde_json::json!({ "email": "nobody@duka.test", "password": PASSWORD }),
    ];
    for attempt in attempts {
        let response = harness
            .app
            .clone()
            .oneshot(json_request("POST", "/users/login", attempt))
            .await
            .expect("login");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = read_json(response).await;
        assert_eq!(body["error"], "invalid_credentials");
    }

    // Users cannot log in through the admin endpoint.
    let response = harness
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/admins/login",
            serde_json::json!({ "email": user.email, "password": PASSWORD }),
        ))
        .await
        .expect("admin login");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn registration_validates_and_rejects_duplicates() {
    let harness = test_app();

    let mut short = registration("short@duka.test");
    short["password"] = serde_json::json!("abc");
    let response = harness
        .app
        .clone()
        .oneshot(json_request("POST", "/users/register", short))
        .await
        .expect("register");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["error"], "validation_error");

    let response = harness
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/users/register",
            registration("dup@duka.test"),
        ))
        .await
        .expect("first");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = harness
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/users/register",
            registration("DUP@duka.test"),
        ))
        .await
        .expect("second");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn registration_stores_profile_image() {
    let harness = test_app();
    let mut body = registration("pic@duka.test");
    body["user_image"] = serde_json::json!(common::IMAGE);
    let response = harness
        .app
        .clone()
        .oneshot(json_request("POST", "/users/register", body))
        .await
        .expect("register");
    assert_eq!(response.status(), StatusCode::CREATED);
    let user_id = read_json(response).await["data"]["identity_id"]
        .as_str()
        .expect("id")
        .to_string();
    assert_eq!(harness.images.len().await, 1);

    let response = harness
        .app
        .clone()
        .oneshot(get(&format!("/users/{user_id}")))
        .await
        .expect("profile");
    let body = read_json(response).await;
    assert_eq!(body["data"]["user_image_data"], common::IMAGE);
    assert!(body["data"]["seller"].get("password_hash").is_none());
}

#[tokio::test]
async fn profile_update_only_touches_given_fields() {
    let harness = test_app();
    let user = seed_user(&harness.store, "njeri", false).await;
    let token = common::user_token(&harness.app, &user).await;

    let response = harness
        .app
        .clone()
        .oneshot(http_helpers::authed_json_request(
            "PATCH",
            "/users/me",
            &token,
            serde_json::json!({ "location": "Mombasa" }),
        ))
        .await
        .expect("patch");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["location"], "Mombasa");
    assert_eq!(body["data"]["first_name"], user.first_name);

    let response = harness
        .app
        .clone()
        .oneshot(http_helpers::authed_json_request(
            "PATCH",
            "/users/me",
            &token,
            serde_json::json!({}),
        ))
        .await
        .expect("empty patch");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
