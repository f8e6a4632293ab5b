//! Login, registration, logout, and Google sign-in against the fake
//! marketplace.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use ocop_integration_tests::{TestContext, location, unsigned_jwt};
use reqwest::Url;
use serde_json::json;

#[tokio::test]
async fn test_admin_lands_on_dashboard() {
    let ctx = TestContext::spawn().await;

    assert_eq!(ctx.login("admin@ocop.vn", "matkhau-admin").await, "/admin");

    let body = ctx.page("/admin").await;
    assert!(body.contains("Welcome back, Tran Quan Tri."));
}

#[tokio::test]
async fn test_user_lands_on_home() {
    let ctx = TestContext::spawn().await;

    assert_eq!(ctx.login("lan@ocop.vn", "matkhau-lan").await, "/");

    let body = ctx.page("/account").await;
    assert!(body.contains("Nguyen Thi Lan"));
    assert!(body.contains(r#"href="/store/create""#));
}

#[tokio::test]
async fn test_bad_credentials_stay_on_login() {
    let ctx = TestContext::spawn().await;

    assert_eq!(
        ctx.login("lan@ocop.vn", "sai-mat-khau").await,
        "/auth/login?error=credentials"
    );

    let body = ctx.page("/auth/login?error=credentials").await;
    assert!(body.contains("Incorrect email or password."));

    // Still anonymous.
    let response = ctx.get("/account").await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/auth/login");
}

#[tokio::test]
async fn test_malformed_email_is_rejected_locally() {
    let ctx = TestContext::spawn().await;

    assert_eq!(
        ctx.login("not-an-email", "matkhau-lan").await,
        "/auth/login?error=invalid_email"
    );
}

#[tokio::test]
async fn test_logout_clears_session() {
    let ctx = TestContext::spawn().await;
    ctx.login("lan@ocop.vn", "matkhau-lan").await;

    let response = ctx.post_form("/auth/logout", &[]).await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/");

    let response = ctx.get("/account").await;
    assert_eq!(location(&response), "/auth/login");
}

#[tokio::test]
async fn test_register_redirects_to_login() {
    let ctx = TestContext::spawn().await;

    let response = ctx
        .post_form(
            "/auth/register",
            &[
                ("username", "hoa"),
                ("name", "Pham Thi Hoa"),
                ("email", "hoa@ocop.vn"),
                ("password", "mat-khau-dai"),
                ("password_confirm", "mat-khau-dai"),
            ],
        )
        .await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/auth/login?success=registered");
}

#[tokio::test]
async fn test_register_existing_email() {
    let ctx = TestContext::spawn().await;

    let response = ctx
        .post_form(
            "/auth/register",
            &[
                ("username", "lan2"),
                ("name", "Lan"),
                ("email", "lan@ocop.vn"),
                ("password", "mat-khau-dai"),
                ("password_confirm", "mat-khau-dai"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/auth/register?error=email_taken");
}

#[tokio::test]
async fn test_register_password_mismatch() {
    let ctx = TestContext::spawn().await;

    let response = ctx
        .post_form(
            "/auth/register",
            &[
                ("username", "hoa"),
                ("name", "Pham Thi Hoa"),
                ("email", "hoa@ocop.vn"),
                ("password", "mat-khau-dai"),
                ("password_confirm", "mat-khau-khac"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/auth/register?error=password_mismatch");
}

#[tokio::test]
async fn test_google_login_dispatches_by_role() {
    let ctx = TestContext::spawn().await;

    let response = ctx.get("/auth/google/login").await;
    assert_eq!(response.status(), 303);
    let authorize = Url::parse(&location(&response)).unwrap();
    assert_eq!(authorize.host_str(), Some("accounts.google.test"));

    let param = |name: &str| {
        authorize
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
            .unwrap()
    };
    let state = param("state");
    let nonce = param("nonce");
    assert_eq!(param("scope"), "openid email profile");

    *ctx.marketplace.google_id_token.lock().unwrap() =
        Some(unsigned_jwt(&json!({ "sub": "g-1", "nonce": nonce })));

    let response = ctx
        .get(&format!("/auth/google/callback?code=4%2F0Ab&state={state}"))
        .await;
    assert_eq!(location(&response), "/admin");

    let body = ctx.page("/admin").await;
    assert!(body.contains("Admin dashboard"));
}

#[tokio::test]
async fn test_google_callback_rejects_wrong_state() {
    let ctx = TestContext::spawn().await;
    ctx.get("/auth/google/login").await;

    let response = ctx
        .get("/auth/google/callback?code=4%2F0Ab&state=forged")
        .await;
    assert_eq!(location(&response), "/auth/login?error=invalid_state");
}

#[tokio::test]
async fn test_google_callback_rejects_replayed_nonce() {
    let ctx = TestContext::spawn().await;

    let response = ctx.get("/auth/google/login").await;
    let authorize = Url::parse(&location(&response)).unwrap();
    let state = authorize
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .unwrap();

    *ctx.marketplace.google_id_token.lock().unwrap() =
        Some(unsigned_jwt(&json!({ "sub": "g-1", "nonce": "from-another-login" })));

    let response = ctx
        .get(&format!("/auth/google/callback?code=4%2F0Ab&state={state}"))
        .await;
    assert_eq!(location(&response), "/auth/login?error=nonce");

    // State was consumed by the failed attempt.
    let response = ctx
        .get(&format!("/auth/google/callback?code=4%2F0Ab&state={state}"))
        .await;
    assert_eq!(location(&response), "/auth/login?error=invalid_state");
}

#[tokio::test]
async fn test_google_denied() {
    let ctx = TestContext::spawn().await;

    let response = ctx.get("/auth/google/callback?error=access_denied").await;
    assert_eq!(location(&response), "/auth/login?error=google_denied");
}
