//! Cart routes.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::{Value, json};

use crate::error::Result;
use crate::state::AppState;

/// GET /api/carrito/{id_carrito}
///
/// A missing cart reads as an empty item list, not a 404.
pub async fn get_items(
    State(state): State<AppState>,
    Path(id_carrito): Path<String>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.cart().get_items(&id_carrito).await?))
}

/// POST /api/carrito/{id_carrito}
///
/// Body: `{ id_producto, cantidad, medida_seleccionada? }`. Merges into the
/// existing line for the same product and measure; creates the cart if it
/// does not exist yet.
pub async fn add_item(
    State(state): State<AppState>,
    Path(id_carrito): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse> {
    let id_producto = body
        .get("id_producto")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let cantidad = body.get("cantidad").cloned().unwrap_or(Value::Null);
    let medida = body.get("medida_seleccionada").and_then(Value::as_str);

    let items = state
        .cart()
        .add_or_update_item(&id_carrito, id_producto, &cantidad, medida)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Producto agregado o actualizado en el carrito",
            "items": items,
        })),
    ))
}

/// PUT /api/carrito/{id_carrito}/{id_producto}
///
/// Body: `{ cantidad, medida_seleccionada? }`; the measure can also come as
/// the `medida` query parameter. Sets the line quantity outright.
pub async fn replace_item(
    State(state): State<AppState>,
    Path((id_carrito, id_producto)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse> {
    let cantidad = body.get("cantidad").cloned().unwrap_or(Value::Null);
    let medida = body
        .get("medida_seleccionada")
        .and_then(Value::as_str)
        .or_else(|| params.get("medida").map(String::as_str));

    let items = state
        .cart()
        .replace_item_quantity(&id_carrito, &id_producto, &cantidad, medida)
        .await?;
    Ok(Json(json!({
        "message": "Producto actualizado en el carrito",
        "items": items,
    })))
}

/// DELETE /api/carrito/{id_carrito}/{id_producto}?medida=
///
/// Idempotent: removing an absent line or a missing cart still succeeds.
pub async fn remove_item(
    State(state): State<AppState>,
    Path((id_carrito, id_producto)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse> {
    let medida = params.get("medida").map(String::as_str);
    state
        .cart()
        .remove_item(&id_carrito, &id_producto, medida)
        .await?;
    Ok(Json(json!({ "message": "Producto eliminado del carrito" })))
}
