//! Anonymous cart session endpoints.

use axum::http::StatusCode;
use serde_json::json;
use tienda_integration_tests::{app, send, test_state};
use uuid::Uuid;

#[tokio::test]
async fn start_session_hands_out_an_id_without_creating_a_cart() {
    let state = test_state();
    let router = app(&state);

    let (status, body) = send(&router, "GET", "/api/session/start-session", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let id = body["sessionId"].as_str().unwrap();
    assert!(Uuid::parse_str(id).is_ok());

    // Unlike crear, no cart document exists yet.
    let (status, body) = send(
        &router,
        "GET",
        &format!("/api/session/verificar/{id}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exists"], false);
}

#[tokio::test]
async fn crear_generates_a_cart_id() {
    let state = test_state();
    let router = app(&state);

    let (status, body) = send(&router, "POST", "/api/session/crear", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let id = body["id_carrito"].as_str().unwrap();
    assert!(Uuid::parse_str(id).is_ok());

    let (status, body) = send(
        &router,
        "GET",
        &format!("/api/session/verificar/{id}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exists"], true);
}

#[tokio::test]
async fn verificar_reports_missing_carts() {
    let state = test_state();
    let router = app(&state);

    let (status, body) = send(&router, "GET", "/api/session/verificar/ghost", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exists"], false);
}

#[tokio::test]
async fn guardar_rejects_taken_ids() {
    let state = test_state();
    let router = app(&state);
    let body = json!({ "id_carrito": "client-cart-1" });

    let (status, response) = send(&router, "POST", "/api/session/guardar", Some(&body), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(response["id_carrito"], "client-cart-1");

    let (status, response) = send(&router, "POST", "/api/session/guardar", Some(&body), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        response["error"],
        "El ID del carrito ya existe en la base de datos."
    );
}

#[tokio::test]
async fn guardar_requires_an_id() {
    let state = test_state();
    let router = app(&state);

    let (status, body) = send(
        &router,
        "POST",
        "/api/session/guardar",
        Some(&json!({ "id_carrito": "  " })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "El id del carrito es requerido.");
}
