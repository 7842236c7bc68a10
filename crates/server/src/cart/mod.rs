//! Shopping carts.
//!
//! A cart is one document keyed by the cart id, holding a list of lines.
//! A line is identified by `productId` plus the normalized selected measure,
//! so the same product can appear once per measure. Lines store only the
//! product reference, quantity, and measure; name, price, and stock are
//! hydrated from the live product on every read, and lines whose product no
//! longer exists are silently dropped from responses.
//!
//! All mutations go through [`engine::CartEngine`], which wraps each
//! read-modify-write in an optimistic retry loop over the cart document.

pub mod engine;

pub use engine::CartEngine;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tienda_core::Measure;

use crate::catalog::Product;
use crate::catalog::{json_datetime, json_integer, json_opt_string};

/// Identity key of a cart line: product id plus normalized measure.
#[must_use]
pub fn line_key(product_id: &str, selected_measure: Option<&Measure>) -> String {
    format!(
        "{product_id}::{}",
        selected_measure.map(Measure::as_str).unwrap_or_default()
    )
}

/// A cart line as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredLine {
    pub product_id: String,
    pub quantity: i64,
    pub selected_measure: Option<Measure>,
}

impl StoredLine {
    /// True when `other` addresses the same line (same product, same
    /// normalized measure).
    #[must_use]
    pub fn matches(&self, product_id: &str, selected_measure: Option<&Measure>) -> bool {
        self.product_id == product_id && self.selected_measure.as_ref() == selected_measure
    }
}

/// A cart document as stored, decoded leniently.
///
/// Junk entries (non-objects, missing product ids, non-positive quantities)
/// are dropped at decode time, so the engine only ever sees valid lines.
#[derive(Debug, Clone, Default)]
pub struct StoredCart {
    pub items: Vec<StoredLine>,
    pub created_at: Option<DateTime<Utc>>,
}

impl StoredCart {
    /// Decode a stored cart document.
    #[must_use]
    pub fn from_data(data: &Value) -> Self {
        let items = data
            .get("items")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        let product_id = json_opt_string(entry, "productId")?;
                        let quantity = json_integer(entry, "quantity").unwrap_or(0);
                        if quantity <= 0 {
                            return None;
                        }
                        Some(StoredLine {
                            product_id,
                            quantity,
                            selected_measure: Measure::normalize(
                                json_opt_string(entry, "selectedMeasure").as_deref(),
                            ),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            items,
            created_at: json_datetime(data, "createdAt"),
        }
    }

    /// Encode for storage. A cart created on first write gets `now` as its
    /// creation time; an existing one keeps what it had.
    #[must_use]
    pub fn to_data(&self, now: DateTime<Utc>) -> Value {
        let items: Vec<Value> = self
            .items
            .iter()
            .map(|line| {
                json!({
                    "productId": line.product_id,
                    "quantity": line.quantity,
                    "selectedMeasure": line.selected_measure.as_ref().map(Measure::as_str),
                })
            })
            .collect();

        json!({
            "items": items,
            "createdAt": self.created_at.unwrap_or(now).to_rfc3339(),
            "updatedAt": now.to_rfc3339(),
        })
    }
}

/// A hydrated cart line as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct CartItem {
    /// Line identity key, `productId::measure`.
    pub clave: String,
    pub cantidad: i64,
    pub id_producto: String,
    pub medida_seleccionada: Option<String>,
    pub stock: i64,
    pub nombre: String,
    pub precio: f64,
    pub tag: Option<String>,
    pub imagen: Option<String>,
}

/// Hydrate one stored line against the live product.
#[must_use]
pub fn serialize_cart_item(
    product: &Product,
    quantity: i64,
    selected_measure: Option<&Measure>,
) -> CartItem {
    CartItem {
        clave: line_key(&product.id_producto, selected_measure),
        cantidad: quantity,
        id_producto: product.id_producto.clone(),
        medida_seleccionada: selected_measure.map(|measure| measure.as_str().to_owned()),
        stock: product.stock,
        nombre: product.nombre.clone(),
        precio: product.precio,
        tag: product.tag.clone(),
        imagen: product.imagen.clone(),
    }
}
