//! Product routes.
//!
//! Create and update accept either a JSON body or `multipart/form-data`.
//! In the multipart case, text fields form the payload and file parts named
//! `imagen` or `imagenes` become image uploads; empty file parts are
//! ignored and parts without an `image/*` content type are rejected.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde_json::{Map, Value, json};
use tienda_core::ProductId;

use crate::assets::ImageUpload;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// GET /api/productos?limit&offset
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse> {
    let limit = params.get("limit").and_then(|value| value.parse().ok());
    let offset = params.get("offset").and_then(|value| value.parse().ok());
    Ok(Json(state.catalog().list_products(limit, offset).await?))
}

/// GET /api/productos/all
pub async fn list_all(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.catalog().list_all_products().await?))
}

/// GET /api/productos/search?search=term
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse> {
    let term = params
        .get("search")
        .or_else(|| params.get("q"))
        .map(String::as_str)
        .filter(|term| !term.trim().is_empty())
        .ok_or_else(|| {
            AppError::Validation("Debe proporcionar un termino de busqueda.".to_owned())
        })?;
    Ok(Json(state.catalog().search_products(term).await?))
}

/// GET /api/productos/tag/{tag}
pub async fn by_tag(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.catalog().products_by_tag(&tag).await?))
}

/// GET /api/productos/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let product = state
        .catalog()
        .get_product_by_id(&ProductId::from(id))
        .await?
        .ok_or_else(|| AppError::NotFound("Producto no encontrado".to_owned()))?;
    Ok(Json(product))
}

/// GET /api/productos/{id}/stock
pub async fn stock(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let stock = state
        .catalog()
        .get_product_stock(&ProductId::from(id))
        .await?
        .ok_or_else(|| AppError::NotFound("Producto no encontrado".to_owned()))?;
    Ok(Json(json!({ "stock": stock })))
}

/// POST /api/productos
pub async fn create(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    request: Request,
) -> Result<impl IntoResponse> {
    let (payload, images) = parse_catalog_request(&state, request).await?;
    let product = state.catalog().create_product(&payload, images).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /api/productos/{id}
pub async fn update(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
    request: Request,
) -> Result<impl IntoResponse> {
    let (payload, images) = parse_catalog_request(&state, request).await?;
    let product = state
        .catalog()
        .update_product(&ProductId::from(id), &payload, images)
        .await?;
    Ok(Json(product))
}

/// DELETE /api/productos/{id}
pub async fn delete(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    state.catalog().delete_product(&ProductId::from(id)).await?;
    Ok(Json(json!({ "message": "Producto eliminado correctamente" })))
}

/// Split a catalog write request into its JSON payload and image uploads,
/// accepting both JSON and multipart bodies.
async fn parse_catalog_request(
    state: &AppState,
    request: Request,
) -> Result<(Value, Vec<ImageUpload>)> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if !content_type.contains("multipart/form-data") {
        let Json(payload) = Json::<Value>::from_request(request, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        return Ok((payload, Vec::new()));
    }

    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|rejection| AppError::Validation(rejection.body_text()))?;

    let mut payload = Map::new();
    let mut images = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| AppError::Validation(error.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        if name == "imagen" || name == "imagenes" {
            let content_type = field.content_type().map(ToOwned::to_owned);
            let file_name = field.file_name().unwrap_or("upload").to_owned();
            let bytes = field
                .bytes()
                .await
                .map_err(|error| AppError::Validation(error.body_text()))?;
            if bytes.is_empty() {
                continue;
            }
            let Some(content_type) = content_type.filter(|kind| kind.starts_with("image/"))
            else {
                return Err(AppError::Validation(
                    "El archivo debe ser una imagen valida.".to_owned(),
                ));
            };
            images.push(ImageUpload {
                bytes: bytes.to_vec(),
                content_type,
                file_name,
            });
        } else {
            let text = field
                .text()
                .await
                .map_err(|error| AppError::Validation(error.body_text()))?;
            payload.insert(name, Value::from(text));
        }
    }

    Ok((Value::Object(payload), images))
}
