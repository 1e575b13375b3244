mod common;

use axum::http::StatusCode;
use common::{PASSWORD, admin_token, read_json, seed_admin, seed_user, test_app, user_token};
use http_helpers::{authed_json_request, authed_request, get};
use marketplace::store::CredentialStore;
use tower::ServiceExt;

#[tokio::test]
async fn non_admins_cannot_moderate() {
    let harness = test_app();
    let seller = seed_user(&harness.store, "seller", true).await;
    let target = seed_user(&harness.store, "target", false).await;
    let token = user_token(&harness.app, &seller).await;
    let before = harness.store.mutation_count();

    for (method, uri) in [
        ("POST", format!("/admins/users/{}/approve", target.user_id)),
        ("POST", format!("/admins/users/{}/revoke", target.user_id)),
        ("POST", "/admins/products/anything/approve".to_string()),
        ("GET", "/admins/sellers".to_string()),
    ] {
        let response = harness
            .app
            .clone()
            .oneshot(authed_request(method, &uri, &token))
            .await
            .expect("request");
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{method} {uri}");
        let body = read_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "forbidden");
    }

    assert_eq!(harness.store.mutation_count(), before);
    let target = harness
        .store
        .find_user_by_id(&target.user_id)
        .await
        .expect("lookup")
        .expect("user");
    assert!(!target.is_approved);
}

#[tokio::test]
async fn approving_an_unknown_user_is_success_shaped() {
    let harness = test_app();
    let admin = seed_admin(&harness.store, "root").await;
    let token = admin_token(&harness.app, &admin).await;

    let response = harness
        .app
        .clone()
        .oneshot(authed_request("POST", "/admins/users/missing/approve", &token))
        .await
        .expect("approve");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "user does not exist");
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn approval_is_idempotent_and_writes_once() {
    let harness = test_app();
    let admin = seed_admin(&harness.store, "root").await;
    let user = seed_user(&harness.store, "pending", false).await;
    let token = admin_token(&harness.app, &admin).await;
    let uri = format!("/admins/users/{}/approve", user.user_id);

    let before = harness.store.mutation_count();
    let response = harness
        .app
        .clone()
        .oneshot(authed_request("POST", &uri, &token))
        .await
        .expect("approve");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["message"], "user approved");
    assert_eq!(body["data"]["is_approved"], true);
    assert_eq!(harness.store.mutation_count(), before + 1);

    let response = harness
        .app
        .clone()
        .oneshot(authed_request("POST", &uri, &token))
        .await
        .expect("approve again");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "user is already approved");
    assert_eq!(body["data"]["user_id"], user.user_id);
    assert_eq!(harness.store.mutation_count(), before + 1);
}

#[tokio::test]
async fn revoking_requires_current_approval() {
    let harness = test_app();
    let admin = seed_admin(&harness.store, "root").await;
    let user = seed_user(&harness.store, "unapproved", false).await;
    let token = admin_token(&harness.app, &admin).await;
    let uri = format!("/admins/users/{}/revoke", user.user_id);

    let before = harness.store.mutation_count();
    let response = harness
        .app
        .clone()
        .oneshot(authed_request("POST", &uri, &token))
        .await
        .expect("revoke");
    let body = read_json(response).await;
    assert_eq!(body["message"], "user is not approved");
    assert_eq!(harness.store.mutation_count(), before);

    harness
        .app
        .clone()
        .oneshot(authed_request(
            "POST",
            &format!("/admins/users/{}/approve", user.user_id),
            &token,
        ))
        .await
        .expect("approve");
    let response = harness
        .app
        .clone()
        .oneshot(authed_request("POST", &uri, &token))
        .await
        .expect("revoke approved");
    let body = read_json(response).await;
    assert_eq!(body["message"], "user approval revoked");
    assert_eq!(body["data"]["is_approved"], false);
}

#[tokio::test]
async fn admin_registration_is_admin_only() {
    let harness = test_app();
    let admin = seed_admin(&harness.store, "root").await;
    let user = seed_user(&harness.store, "sneaky", true).await;
    let new_admin = serde_json::json!({
        "admin_name": "Second Admin",
        "email": "second@admin.duka.test",
        "cell": "0722000000",
        "password": PASSWORD,
        "role": "admin"
    });

    let token = user_token(&harness.app, &user).await;
    let response = harness
        .app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/admins/register",
            &token,
            new_admin.clone(),
        ))
        .await
        .expect("user registers admin");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let mut invalid = new_admin.clone();
    invalid["email"] = serde_json::json!("not-an-email");
    let response = harness
        .app
        .clone()
        .oneshot(authed_json_request("POST", "/admins/register", &token, invalid))
        .await
        .expect("invalid payload");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let token = admin_token(&harness.app, &admin).await;
    let response = harness
        .app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/admins/register",
            &token,
            new_admin.clone(),
        ))
        .await
        .expect("admin registers admin");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    assert_eq!(body["data"]["email"], "second@admin.duka.test");
    assert!(body["data"].get("password_hash").is_none());

    let response = harness
        .app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/admins/register",
            &token,
            new_admin,
        ))
        .await
        .expect("duplicate");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let second = common::login(&harness.app, "/admins/login", "second@admin.duka.test").await;
    let response = harness
        .app
        .clone()
        .oneshot(authed_request("GET", "/admins/me", &second))
        .await
        .expect("me");
    let body = read_json(response).await;
    assert_eq!(body["data"]["admin_name"], "Second Admin");
}

#[tokio::test]
async fn seller_lists_differ_by_audience() {
    let harness = test_app();
    let admin = seed_admin(&harness.store, "root").await;
    seed_user(&harness.store, "approved", true).await;
    seed_user(&harness.store, "pending", false).await;

    let response = harness
        .app
        .clone()
        .oneshot(get("/users/sellers"))
        .await
        .expect("public sellers");
    let body = read_json(response).await;
    let public = body["data"].as_array().expect("array");
    assert_eq!(public.len(), 1);
    assert_eq!(public[0]["user_id"], "approved");
    assert!(public[0].get("is_approved").is_none());

    let token = admin_token(&harness.app, &admin).await;
    let response = harness
        .app
        .clone()
        .oneshot(authed_request("GET", "/admins/sellers", &token))
        .await
        .expect("all sellers");
    let body = read_json(response).await;
    assert_eq!(body["data"].as_array().expect("array").len(), 2);
}

#[tokio::test]
async fn sessions_are_scoped_to_their_namespace() {
    let harness = test_app();
    let admin = seed_admin(&harness.store, "root").await;
    let user = seed_user(&harness.store, "plain", true).await;

    let token = admin_token(&harness.app, &admin).await;
    let response = harness
        .app
        .clone()
        .oneshot(authed_request("GET", "/users/me", &token))
        .await
        .expect("admin on user route");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = harness
        .app
        .clone()
        .oneshot(authed_request("POST", "/users/logout", &token))
        .await
        .expect("admin on user logout");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = harness
        .app
        .clone()
        .oneshot(authed_request("GET", "/admins/me", &token))
        .await
        .expect("admin session survives");
    assert_eq!(response.status(), StatusCode::OK);

    let token = user_token(&harness.app, &user).await;
    let response = harness
        .app
        .clone()
        .oneshot(authed_request("GET", "/admins/me", &token))
        .await
        .expect("user on admin route");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = harness
        .app
        .clone()
        .oneshot(authed_request("POST", "/admins/logout", &token))
        .await
        .expect("user on admin logout");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
