//! Order and checkout routes.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::{Value, json};

use crate::error::Result;
use crate::state::AppState;

/// POST /api/ordenes/{id_user}
///
/// Body: `{ items: [{ id_producto, cantidad, precio_unitario? }] }`. Prices
/// are snapshotted from the product unless an explicit unit price is given.
pub async fn create(
    State(state): State<AppState>,
    Path(id_user): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse> {
    let items = body.get("items").cloned().unwrap_or(Value::Null);
    let id_orden = state.orders().create_order(&id_user, &items).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("Orden creada con ID: {id_orden}"),
            "id_orden": id_orden,
        })),
    ))
}

/// GET /api/ordenes/{id_user}
pub async fn list_by_user(
    State(state): State<AppState>,
    Path(id_user): Path<String>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.orders().list_orders_by_user(&id_user).await?))
}

/// GET /api/ordenes/detalles/{id_orden}
pub async fn details(
    State(state): State<AppState>,
    Path(id_orden): Path<String>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.orders().get_order_details(&id_orden).await?))
}

/// POST /api/checkout
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse> {
    let receipt = state.orders().create_checkout(&payload).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}
