//! Integration tests for Tienda.
//!
//! Tests run fully in-process: the router from `tienda-server` is driven
//! through `tower::ServiceExt::oneshot` over the in-memory store and the
//! no-op asset host, so no external services are needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p tienda-integration-tests
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::Value;
use tower::util::ServiceExt;

use tienda_server::assets::NullAssetStore;
use tienda_server::config::{AssetBackend, ServerConfig, StoreBackend};
use tienda_server::state::AppState;
use tienda_server::store::MemoryStore;

/// Admin credential wired into the test configuration.
pub const ADMIN_KEY: &str = "integration-test-admin-key-0123456789";

/// Build a test configuration (in-memory store, no-op asset host).
#[must_use]
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        store: StoreBackend::Memory,
        assets: AssetBackend::Null,
        admin_api_key: SecretString::from(ADMIN_KEY),
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// Build an application state over a fresh in-memory store.
#[must_use]
pub fn test_state() -> AppState {
    AppState::with_components(
        test_config(),
        Arc::new(MemoryStore::new()),
        Arc::new(NullAssetStore),
    )
}

/// Build the router for a state.
#[must_use]
pub fn app(state: &AppState) -> Router {
    tienda_server::build_router(state.clone())
}

/// Send one request through the router, returning status and decoded JSON
/// body (`Value::Null` for empty or non-JSON bodies).
///
/// # Panics
///
/// Panics if the request cannot be built or the response body cannot be
/// read, which only happens on programming errors in the test itself.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<&Value>,
    bearer: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("failed to build request");

    dispatch(app, request).await
}

/// Send one `multipart/form-data` request through the router. `body` is the
/// raw multipart payload delimited by `boundary`.
///
/// # Panics
///
/// Panics if the request cannot be built or the response body cannot be
/// read, which only happens on programming errors in the test itself.
pub async fn send_multipart(
    app: &Router,
    method: &str,
    uri: &str,
    boundary: &str,
    body: String,
    bearer: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={boundary}"),
    );
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = builder
        .body(Body::from(body))
        .expect("failed to build request");

    dispatch(app, request).await
}

async fn dispatch(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router returned an error");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to read response body")
        .to_bytes();

    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Seed a category through the admin API; returns its id.
///
/// # Panics
///
/// Panics if the seeding request does not succeed.
pub async fn seed_category(app: &Router, name: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/categorias",
        Some(&serde_json::json!({ "nombre_categoria": name })),
        Some(ADMIN_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "seed category failed: {body}");
    body["id_categoria"]
        .as_str()
        .expect("category id missing")
        .to_owned()
}

/// Seed a product through the admin API; returns its id.
///
/// # Panics
///
/// Panics if the seeding request does not succeed.
pub async fn seed_product(app: &Router, payload: &Value) -> String {
    let (status, body) = send(app, "POST", "/api/productos", Some(payload), Some(ADMIN_KEY)).await;
    assert_eq!(status, StatusCode::CREATED, "seed product failed: {body}");
    body["id_producto"]
        .as_str()
        .expect("product id missing")
        .to_owned()
}
