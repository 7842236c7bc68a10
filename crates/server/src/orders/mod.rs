//! Orders and checkouts.
//!
//! An order is an immutable snapshot: each line captures the product's name,
//! image, and unit price at creation time, so later catalog edits never
//! change what a past order shows. Creating an order does not decrement
//! product stock; stock only gates cart growth.
//!
//! Checkouts are plain contact/delivery forms persisted as submitted. No
//! payment flow hangs off them.

use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::catalog::{CatalogService, json_datetime, json_number, json_opt_string, json_string};
use crate::error::{AppError, Result};
use crate::store::{SharedStore, collections};

/// Order and checkout service.
#[derive(Clone)]
pub struct OrderService {
    store: SharedStore,
    catalog: CatalogService,
}

/// One order as listed per user.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub id_orden: String,
    pub id_user: String,
    pub fecha: String,
    pub status: String,
    pub total: f64,
}

/// One line of an order, as returned by the detail endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    /// Synthetic line id, `orderId:position` (1-based).
    pub id_detalle: String,
    pub id_orden: String,
    pub id_producto: String,
    pub cantidad: i64,
    pub precio_unitario: f64,
    pub nombre: String,
    pub imagen: Option<String>,
}

/// Response of a checkout submission.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub id_checkout: String,
    pub message: String,
}

/// An order line after validation and price resolution.
#[derive(Debug, Clone)]
struct NormalizedOrderItem {
    product_id: String,
    quantity: i64,
    unit_price: f64,
    name: String,
    image: Option<String>,
}

impl OrderService {
    #[must_use]
    pub fn new(store: SharedStore, catalog: CatalogService) -> Self {
        Self { store, catalog }
    }

    /// Create an order for a user. Every referenced product must exist; the
    /// unit price defaults to the product's current price unless the item
    /// carries an explicit `precio_unitario` (or legacy `precio`).
    #[instrument(skip(self, items))]
    pub async fn create_order(&self, user_id: &str, items: &Value) -> Result<String> {
        let user_id = ensure_string(user_id, "El id_user es requerido.")?;
        let normalized = self.normalize_order_items(items).await?;
        let total: f64 = normalized
            .iter()
            .map(|item| item.unit_price * item.quantity as f64)
            .sum();

        let lines: Vec<Value> = normalized
            .iter()
            .map(|item| {
                json!({
                    "id_producto": item.product_id,
                    "cantidad": item.quantity,
                    "precio_unitario": item.unit_price,
                    "nombre": item.name,
                    "imagen": item.image,
                })
            })
            .collect();

        let now = Utc::now().to_rfc3339();
        let document = self
            .store
            .add(
                collections::ORDERS,
                json!({
                    "userId": user_id,
                    "items": lines,
                    "total": total,
                    "status": "pending",
                    "createdAt": now,
                    "updatedAt": now,
                }),
            )
            .await?;
        Ok(document.id)
    }

    /// List a user's orders, newest first.
    pub async fn list_orders_by_user(&self, user_id: &str) -> Result<Vec<OrderSummary>> {
        let user_id = ensure_string(user_id, "El id_user es requerido.")?;
        let documents = self.store.list(collections::ORDERS).await?;

        let mut orders: Vec<OrderSummary> = documents
            .iter()
            .filter(|doc| json_string(&doc.data, "userId") == user_id)
            .map(|doc| OrderSummary {
                id_orden: doc.id.clone(),
                id_user: user_id.to_owned(),
                fecha: json_datetime(&doc.data, "createdAt")
                    .unwrap_or_else(Utc::now)
                    .to_rfc3339(),
                status: json_opt_string(&doc.data, "status")
                    .unwrap_or_else(|| "pending".to_owned()),
                total: json_number(&doc.data, "total").unwrap_or(0.0),
            })
            .collect();

        orders.sort_by(|a, b| b.fecha.cmp(&a.fecha));
        Ok(orders)
    }

    /// The lines of one order.
    pub async fn get_order_details(&self, order_id: &str) -> Result<Vec<OrderDetail>> {
        let order_id = ensure_string(order_id, "El id_orden es requerido.")?;
        let document = self
            .store
            .get(collections::ORDERS, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Orden no encontrada.".to_owned()))?;

        let items = document
            .data
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(items
            .iter()
            .enumerate()
            .map(|(index, item)| OrderDetail {
                id_detalle: format!("{order_id}:{}", index + 1),
                id_orden: order_id.to_owned(),
                id_producto: json_string(item, "id_producto"),
                cantidad: crate::catalog::json_integer(item, "cantidad").unwrap_or(0),
                precio_unitario: json_number(item, "precio_unitario").unwrap_or(0.0),
                nombre: json_string(item, "nombre"),
                imagen: json_opt_string(item, "imagen"),
            })
            .collect())
    }

    /// Persist a checkout form. Contact fields are required; address fields
    /// default to empty strings.
    #[instrument(skip(self, payload))]
    pub async fn create_checkout(&self, payload: &Value) -> Result<CheckoutReceipt> {
        let nombre = require_field(payload, "nombre", "El nombre es requerido.")?;
        let apellido = require_field(payload, "apellido", "El apellido es requerido.")?;
        let dni = require_field(payload, "dni", "El DNI es requerido.")?;
        let telefono = require_field(payload, "telefono", "El telefono es requerido.")?;
        let correo = require_field(payload, "correo", "El correo es requerido.")?;
        let referencia = require_field(
            payload,
            "referenciaDeEntrega",
            "La referencia de entrega es requerida.",
        )?;

        let document = self
            .store
            .add(
                collections::CHECKOUTS,
                json!({
                    "nombre": nombre,
                    "apellido": apellido,
                    "dni": dni,
                    "telefono": telefono,
                    "correo": correo,
                    "direccion": json_string(payload, "direccion"),
                    "ciudad": json_string(payload, "ciudad"),
                    "provincia": json_string(payload, "provincia"),
                    "codigo_postal": json_string(payload, "codigo_postal"),
                    "referenciaDeEntrega": referencia,
                    "carritoId": json_string(payload, "carritoId"),
                    "createdAt": Utc::now().to_rfc3339(),
                }),
            )
            .await?;

        Ok(CheckoutReceipt {
            id_checkout: document.id,
            message: "Checkout realizado con exito.".to_owned(),
        })
    }

    async fn normalize_order_items(&self, items: &Value) -> Result<Vec<NormalizedOrderItem>> {
        let items = items.as_array().filter(|items| !items.is_empty()).ok_or_else(|| {
            AppError::Validation("Debes enviar al menos un item para la orden.".to_owned())
        })?;

        let mut normalized = Vec::with_capacity(items.len());
        for item in items {
            let product_id = json_opt_string(item, "id_producto")
                .or_else(|| json_opt_string(item, "productId"))
                .ok_or_else(|| {
                    AppError::Validation("Cada item debe incluir id_producto.".to_owned())
                })?;
            let quantity = normalize_quantity(item.get("cantidad"))?;

            let product = self
                .catalog
                .get_product_by_id(&product_id.as_str().into())
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Producto no encontrado: {product_id}"))
                })?;

            let explicit_price = item
                .get("precio_unitario")
                .filter(|value| !value.is_null())
                .or_else(|| item.get("precio").filter(|value| !value.is_null()));
            let unit_price = match explicit_price {
                Some(value) => normalize_price(value)?,
                None => product.precio,
            };

            normalized.push(NormalizedOrderItem {
                product_id,
                quantity,
                unit_price,
                name: product.nombre,
                image: product.imagen,
            });
        }
        Ok(normalized)
    }
}

fn ensure_string<'a>(value: &'a str, message: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(message.to_owned()));
    }
    Ok(trimmed)
}

fn require_field(payload: &Value, key: &str, message: &str) -> Result<String> {
    json_opt_string(payload, key).ok_or_else(|| AppError::Validation(message.to_owned()))
}

/// A strictly positive integer quantity, from a number or numeric string.
#[allow(clippy::cast_possible_truncation)]
fn normalize_quantity(value: Option<&Value>) -> Result<i64> {
    let invalid =
        || AppError::Validation("Cada item debe tener una cantidad valida.".to_owned());

    let quantity = match value.ok_or_else(invalid)? {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|float| float.fract() == 0.0 && float.is_finite())
                    .map(|float| float as i64)
            })
            .ok_or_else(invalid)?,
        Value::String(text) => text.trim().parse::<i64>().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };

    if quantity <= 0 {
        return Err(invalid());
    }
    Ok(quantity)
}

/// A non-negative price, from a number or numeric string.
fn normalize_price(value: &Value) -> Result<f64> {
    let invalid = || AppError::Validation("Precio unitario invalido.".to_owned());

    let price = match value {
        Value::Number(number) => number.as_f64().ok_or_else(invalid)?,
        Value::String(text) => text.trim().parse::<f64>().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };

    if !price.is_finite() || price < 0.0 {
        return Err(invalid());
    }
    Ok(price)
}
