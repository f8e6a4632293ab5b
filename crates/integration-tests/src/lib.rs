//! Integration tests for the OCOP Market storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p ocop-integration-tests
//! ```
//!
//! Every test spawns its own fake marketplace API and its own storefront on
//! `127.0.0.1:0`, so tests need no external services and run in parallel.
//!
//! # Fixtures
//!
//! | Email | Password | Roles | Store |
//! |---|---|---|---|
//! | `admin@ocop.vn` | `matkhau-admin` | admin, user | - |
//! | `lan@ocop.vn` | `matkhau-lan` | user | - |
//! | `seller@ocop.vn` | `matkhau-seller` | user | `s-1` |
//!
//! Address directory: Ha Noi (1) → Dong Da (10) → Lang (100), and
//! Ho Chi Minh (79) → Quan 1 (760) → Ben Nghe (7600).

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ocop_storefront::config::StorefrontConfig;
use ocop_storefront::state::AppState;
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// High-entropy secret accepted by the config validator.
const SESSION_SECRET: &str = "q7Lm2Xv9Rt4Kp8Wz1Nc6Hb3Jd5Fg0SyEa";

// ============================================================================
// Fake marketplace
// ============================================================================

struct Account {
    email: &'static str,
    password: &'static str,
    token: &'static str,
    user: Value,
}

fn accounts() -> Vec<Account> {
    vec![
        Account {
            email: "admin@ocop.vn",
            password: "matkhau-admin",
            token: "token-admin",
            user: json!({
                "id": "u-admin", "username": "admin", "name": "Tran Quan Tri",
                "email": "admin@ocop.vn", "roles": ["admin", "user"]
            }),
        },
        Account {
            email: "lan@ocop.vn",
            password: "matkhau-lan",
            token: "token-lan",
            user: json!({
                "id": "u-lan", "username": "lan", "name": "Nguyen Thi Lan",
                "email": "lan@ocop.vn", "roles": ["user"], "phone": "0912345678"
            }),
        },
        Account {
            email: "seller@ocop.vn",
            password: "matkhau-seller",
            token: "token-seller",
            user: json!({
                "id": "u-seller", "username": "seller", "name": "Le Van Ban",
                "email": "seller@ocop.vn", "roles": ["user"], "storeId": "s-1"
            }),
        },
    ]
}

/// Observable and steerable state of the fake marketplace.
#[derive(Default)]
pub struct FakeState {
    /// Bodies received on `POST /stores`.
    pub created_stores: Mutex<Vec<Value>>,
    /// Store ids created per bearer token.
    store_owners: Mutex<HashMap<String, String>>,
    /// District lists for this province id are delayed.
    pub slow_province: Mutex<Option<String>>,
    /// Ward lookups fail with 500.
    pub failing_wards: Mutex<bool>,
    /// Id token handed out by the fake Google token endpoint.
    pub google_id_token: Mutex<Option<String>>,
    /// Number of district list calls received.
    pub district_calls: Mutex<u32>,
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Invalid or expired token" })),
    )
        .into_response()
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

async fn login(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    accounts()
        .into_iter()
        .find(|a| a.email == email && a.password == password)
        .map_or_else(
            || {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "message": "Wrong email or password" })),
                )
                    .into_response()
            },
            |a| Json(json!({ "token": a.token, "user": a.user })).into_response(),
        )
}

async fn register(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    if accounts().iter().any(|a| a.email == email) {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "message": "Email already registered" })),
        )
            .into_response();
    }
    (
        StatusCode::CREATED,
        Json(json!({ "message": "Registration successful" })),
    )
        .into_response()
}

async fn google_login(Json(body): Json<Value>) -> Response {
    // Any id token the fake Google endpoint minted belongs to the admin.
    if body["idToken"].as_str().is_some_and(|t| t.contains('.')) {
        let admin = accounts().into_iter().next().expect("admin fixture");
        Json(json!({ "token": admin.token, "user": admin.user })).into_response()
    } else {
        unauthorized()
    }
}

async fn me(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    let Some(token) = bearer(&headers) else {
        return unauthorized();
    };
    let Some(account) = accounts().into_iter().find(|a| a.token == token) else {
        return unauthorized();
    };

    let mut user = account.user;
    if let Some(store_id) = state.store_owners.lock().unwrap().get(&token) {
        user["storeId"] = json!(store_id);
    }
    Json(user).into_response()
}

fn product(id: &str, name: &str, price: &str) -> Value {
    json!({
        "id": id, "name": name, "price": price,
        "storeName": "HTX Tra Tan Cuong", "rating": 4.5
    })
}

fn catalogue() -> Vec<Value> {
    vec![
        product("p-1", "Tra Shan Tuyet", "120000"),
        product("p-2", "Mat ong rung U Minh", "250000"),
        product("p-3", "Nuoc mam Phu Quoc", "1250000"),
    ]
}

async fn featured() -> Json<Value> {
    let products = catalogue();
    Json(json!({ "products": products, "total": products.len(), "page": 1, "limit": 8 }))
}

async fn search(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let q = params.get("q").cloned().unwrap_or_default().to_lowercase();
    let products: Vec<Value> = catalogue()
        .into_iter()
        .filter(|p| {
            p["name"]
                .as_str()
                .is_some_and(|name| name.to_lowercase().contains(&q))
        })
        .collect();
    Json(json!({ "products": products, "total": products.len(), "page": 1, "limit": 20 }))
}

async fn provinces() -> Json<Value> {
    Json(json!([
        { "id": "1", "name": "Ha Noi" },
        { "id": "79", "name": "Ho Chi Minh" }
    ]))
}

async fn districts(
    State(state): State<Arc<FakeState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let province = params.get("provinceId").cloned().unwrap_or_default();
    *state.district_calls.lock().unwrap() += 1;

    let slow = state.slow_province.lock().unwrap().as_deref() == Some(province.as_str());
    if slow {
        tokio::time::sleep(Duration::from_millis(400)).await;
    }

    Json(match province.as_str() {
        "1" => json!({ "data": [{ "id": "10", "name": "Dong Da", "provinceId": "1" }] }),
        "79" => json!([{ "id": "760", "name": "Quan 1", "provinceId": "79" }]),
        _ => json!([]),
    })
}

async fn wards(
    State(state): State<Arc<FakeState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if *state.failing_wards.lock().unwrap() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "directory offline" })),
        )
            .into_response();
    }

    let district = params.get("districtId").cloned().unwrap_or_default();
    Json(match district.as_str() {
        "10" => json!([{ "id": "100", "name": "Lang", "districtId": "10" }]),
        "760" => json!([{ "id": "7600", "name": "Ben Nghe", "districtId": "760" }]),
        _ => json!([]),
    })
    .into_response()
}

async fn create_store(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let Some(token) = bearer(&headers) else {
        return unauthorized();
    };
    if token == "token-expired" {
        return unauthorized();
    }

    let store_id = format!("s-{}", state.created_stores.lock().unwrap().len() + 100);
    let name = body["name"].clone();
    state.created_stores.lock().unwrap().push(body);
    state
        .store_owners
        .lock()
        .unwrap()
        .insert(token, store_id.clone());

    (
        StatusCode::CREATED,
        Json(json!({ "id": store_id, "name": name })),
    )
        .into_response()
}

async fn google_token(State(state): State<Arc<FakeState>>) -> Response {
    state.google_id_token.lock().unwrap().clone().map_or_else(
        || StatusCode::BAD_REQUEST.into_response(),
        |id_token| Json(json!({ "access_token": "ya29", "id_token": id_token })).into_response(),
    )
}

fn fake_marketplace(state: Arc<FakeState>) -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/google", post(google_login))
        .route("/api/auth/me", get(me))
        .route("/api/products", get(featured))
        .route("/api/products/search", get(search))
        .route("/api/address/provinces", get(provinces))
        .route("/api/address/districts", get(districts))
        .route("/api/address/wards", get(wards))
        .route("/api/stores", post(create_store))
        .route("/google/token", post(google_token))
        .with_state(state)
}

// ============================================================================
// Test context
// ============================================================================

/// A running fake marketplace plus a storefront wired to it.
pub struct TestContext {
    pub client: reqwest::Client,
    pub storefront_url: String,
    pub marketplace: Arc<FakeState>,
}

impl TestContext {
    /// Spawn both servers and return a client with an empty cookie jar.
    pub async fn spawn() -> Self {
        let marketplace = Arc::new(FakeState::default());
        let api_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let api_addr = api_listener.local_addr().unwrap();
        let api = fake_marketplace(Arc::clone(&marketplace));
        tokio::spawn(async move { axum::serve(api_listener, api).await });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let storefront_url = format!("http://{addr}");

        let vars: HashMap<&str, String> = HashMap::from([
            ("STOREFRONT_BASE_URL", storefront_url.clone()),
            ("STOREFRONT_SESSION_SECRET", SESSION_SECRET.to_string()),
            ("MARKETPLACE_API_URL", format!("http://{api_addr}/api")),
            ("MARKETPLACE_TIMEOUT_SECS", "5".to_string()),
            ("SELLER_PORTAL_URL", "https://seller.ocop.vn".to_string()),
            ("GOOGLE_CLIENT_ID", "ocop-web.apps.googleusercontent.com".to_string()),
            ("GOOGLE_CLIENT_SECRET", "GOCSPX-7hQ2mZ9vK4tR8wL1xN6c".to_string()),
            ("GOOGLE_AUTHORIZE_URL", "https://accounts.google.test/o/oauth2/v2/auth".to_string()),
            ("GOOGLE_TOKEN_URL", format!("http://{api_addr}/google/token")),
        ]);
        let config = StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
            .expect("test configuration is valid");
        let app = ocop_storefront::app(AppState::new(config).expect("state builds"));
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
        });

        Self {
            client: new_client(),
            storefront_url,
            marketplace,
        }
    }

    /// Absolute URL for a storefront path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.storefront_url)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .unwrap()
    }

    /// Same as [`TestContext::post_form`], flagged as an HTMX request.
    pub async fn htmx_post(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("hx-request", "true")
            .form(form)
            .send()
            .await
            .unwrap()
    }

    /// Log in through the storefront and return the redirect target.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .post_form("/auth/login", &[("email", email), ("password", password)])
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER.as_u16());
        location(&response)
    }

    /// Body of a page that must render with 200.
    pub async fn page(&self, path: &str) -> String {
        let response = self.get(path).await;
        assert_eq!(response.status(), 200, "GET {path}");
        response.text().await.unwrap()
    }
}

/// Client with a cookie jar that does not follow redirects.
#[must_use]
pub fn new_client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// The `Location` header of a redirect.
#[must_use]
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Pull the address form id out of a rendered store form.
#[must_use]
pub fn form_id(html: &str) -> String {
    let marker = r#"name="form_id" value=""#;
    let start = html.find(marker).expect("form_id input present") + marker.len();
    let end = html[start..].find('"').expect("form_id value terminated");
    html[start..start + end].to_string()
}

/// A JWT-shaped token with the given claims. Signature is not checked by
/// the storefront.
#[must_use]
pub fn unsigned_jwt(claims: &Value) -> String {
    format!(
        "{}.{}.c2ln",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}
