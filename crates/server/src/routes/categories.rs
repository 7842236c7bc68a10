//! Category routes.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::{Value, json};
use tienda_core::CategoryId;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// GET /api/categorias
pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.catalog().list_categories().await?))
}

/// GET /api/categorias/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let category = state
        .catalog()
        .get_category_by_id(&CategoryId::from(id))
        .await?
        .ok_or_else(|| AppError::NotFound("Categoria no encontrada".to_owned()))?;
    Ok(Json(category))
}

/// GET /api/categorias/con-productos
pub async fn list_with_products(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.catalog().list_categories_with_products().await?))
}

/// GET /api/categorias/categoria/{nombre}
///
/// `nombre` matches the slug first, then the display name.
pub async fn products_by_category(
    State(state): State<AppState>,
    Path(nombre): Path<String>,
) -> Result<impl IntoResponse> {
    let products = state
        .catalog()
        .products_by_category(&nombre)
        .await?
        .ok_or_else(|| AppError::NotFound("Categoria no encontrada.".to_owned()))?;
    Ok(Json(products))
}

/// POST /api/categorias
pub async fn create(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse> {
    let category = state.catalog().create_category(&payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /api/categorias/{id}
pub async fn update(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse> {
    let category = state
        .catalog()
        .update_category(&CategoryId::from(id), &payload)
        .await?;
    Ok(Json(category))
}

/// DELETE /api/categorias/{id}
pub async fn delete(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    state
        .catalog()
        .delete_category(&CategoryId::from(id))
        .await?;
    Ok(Json(json!({ "message": "Categoria eliminada correctamente" })))
}
