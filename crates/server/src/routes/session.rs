//! Anonymous cart session routes.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::{Value, json};

use crate::cart::CartEngine;
use crate::error::Result;
use crate::state::AppState;

/// GET /api/session/start-session
///
/// Hands out a fresh session id without persisting anything. The cart
/// document is only created once the client registers or mutates it.
pub async fn start() -> Result<impl IntoResponse> {
    Ok(Json(json!({ "sessionId": CartEngine::new_session_id() })))
}

/// POST /api/session/crear
///
/// Creates a cart under a server-generated id.
pub async fn create(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let id_carrito = state.cart().create_cart(None).await?;
    Ok(Json(json!({ "id_carrito": id_carrito })))
}

/// POST /api/session/guardar
///
/// Body: `{ id_carrito }`. Registers a client-supplied cart id; 409 when the
/// id is already taken.
pub async fn save(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse> {
    let id_carrito = body
        .get("id_carrito")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let id_carrito = state.cart().save_cart_id(id_carrito).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id_carrito": id_carrito })),
    ))
}

/// GET /api/session/verificar/{id_carrito}
pub async fn verify(
    State(state): State<AppState>,
    Path(id_carrito): Path<String>,
) -> Result<impl IntoResponse> {
    let exists = state.cart().cart_exists(&id_carrito).await?;
    Ok(Json(json!({ "exists": exists })))
}
