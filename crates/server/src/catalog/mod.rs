//! Catalog: categories and products.
//!
//! Three layers, leaves first:
//!
//! - [`normalize`] - validates and normalizes inbound create/update payloads
//!   (full vs. partial), including the legacy/current field-name adapter.
//! - [`serialize`] - pure mapping from stored document shape to the
//!   API-facing entity shape. No side effects.
//! - [`service`] - reads/writes category and product documents, enforcing
//!   slug/name uniqueness and the "category cannot be deleted while products
//!   reference it" rule.
//!
//! Stored documents are decoded leniently: older documents may carry numbers
//! as strings, a single `imageUrl`/`imagePath` instead of the plural lists,
//! or junk in optional fields. [`RawCategory`] and [`RawProduct`] absorb all
//! of that so the rest of the system only sees one shape.

pub mod normalize;
pub mod serialize;
pub mod service;

pub use serialize::{Category, CategoryWithProducts, Product};
pub use service::CatalogService;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tienda_core::MeasureType;

/// A category document as stored, decoded leniently.
#[derive(Debug, Clone)]
pub struct RawCategory {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl RawCategory {
    /// Decode a stored category document.
    #[must_use]
    pub fn from_document(id: &str, data: &Value) -> Self {
        Self {
            id: id.to_owned(),
            name: json_string(data, "name"),
            slug: json_string(data, "slug"),
            created_at: json_datetime(data, "createdAt"),
            updated_at: json_datetime(data, "updatedAt"),
        }
    }
}

/// A product document as stored, decoded leniently.
#[derive(Debug, Clone)]
pub struct RawProduct {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category_id: Option<String>,
    pub stock: i64,
    pub tag: Option<String>,
    pub measure_type: MeasureType,
    pub measure_options: Vec<String>,
    pub image_urls: Vec<String>,
    pub image_paths: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl RawProduct {
    /// Decode a stored product document, folding the legacy single
    /// `imageUrl`/`imagePath` fields into the plural lists.
    #[must_use]
    pub fn from_document(id: &str, data: &Value) -> Self {
        let mut image_urls = json_string_list(data, "imageUrls");
        let mut image_paths = json_string_list(data, "imagePaths");
        let fallback_url = json_opt_string(data, "imageUrl");
        let fallback_path = json_opt_string(data, "imagePath");

        if image_urls.is_empty() {
            image_urls.extend(fallback_url);
        }
        if image_paths.is_empty() {
            image_paths.extend(fallback_path);
        }

        Self {
            id: id.to_owned(),
            name: json_string(data, "name"),
            description: json_string(data, "description"),
            price: json_number(data, "price").unwrap_or(0.0),
            category_id: json_opt_string(data, "categoryId"),
            stock: json_integer(data, "stock").unwrap_or(0),
            tag: json_opt_string(data, "tag"),
            measure_type: MeasureType::parse(&json_string(data, "measureType")),
            measure_options: json_string_list(data, "measureOptions"),
            image_urls,
            image_paths,
            created_at: json_datetime(data, "createdAt"),
            updated_at: json_datetime(data, "updatedAt"),
        }
    }

    /// Re-encode this record into its canonical stored shape. Used when a
    /// partial update rewrites the whole document.
    #[must_use]
    pub fn to_document_data(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "price": self.price,
            "categoryId": self.category_id,
            "stock": self.stock,
            "tag": self.tag,
            "measureType": self.measure_type.as_str(),
            "measureOptions": self.measure_options,
            "imageUrl": self.image_urls.first(),
            "imagePath": self.image_paths.first(),
            "imageUrls": self.image_urls,
            "imagePaths": self.image_paths,
            "createdAt": self.created_at.map(|at| at.to_rfc3339()),
            "updatedAt": self.updated_at.map(|at| at.to_rfc3339()),
        })
    }

    /// Cover image: first entry of the image list.
    #[must_use]
    pub fn cover_image(&self) -> Option<&str> {
        self.image_urls.first().map(String::as_str)
    }
}

// =============================================================================
// Lenient JSON field readers
// =============================================================================

/// Read a string field; missing or mistyped values become `""`.
#[must_use]
pub(crate) fn json_string(data: &Value, key: &str) -> String {
    data.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default()
        .to_owned()
}

/// Read a string field; missing, mistyped, or empty values become `None`.
#[must_use]
pub(crate) fn json_opt_string(data: &Value, key: &str) -> Option<String> {
    let text = json_string(data, key);
    if text.is_empty() { None } else { Some(text) }
}

/// Read a numeric field from a number or a numeric string.
#[must_use]
pub(crate) fn json_number(data: &Value, key: &str) -> Option<f64> {
    match data.get(key)? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    }
}

/// Read an integer field from a number or a numeric string; fractional
/// values are truncated.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn json_integer(data: &Value, key: &str) -> Option<i64> {
    match data.get(key)? {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|value| value.trunc() as i64)),
        Value::String(text) => {
            let trimmed = text.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().map(|value| value.trunc() as i64))
        }
        _ => None,
    }
}

/// Read a list of strings from either an array or a comma-separated string;
/// entries are trimmed and empties dropped.
#[must_use]
pub(crate) fn json_string_list(data: &Value, key: &str) -> Vec<String> {
    match data.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_owned)
            .collect(),
        Some(Value::String(text)) => text
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

/// Read an RFC 3339 timestamp; anything unparsable becomes `None`.
#[must_use]
pub(crate) fn json_datetime(data: &Value, key: &str) -> Option<DateTime<Utc>> {
    let text = data.get(key)?.as_str()?;
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|at| at.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn raw_product_decodes_lenient_numbers() {
        let data = json!({
            "name": "  Remera  ",
            "price": "1500.50",
            "stock": "3",
        });
        let product = RawProduct::from_document("p1", &data);
        assert_eq!(product.name, "Remera");
        assert!((product.price - 1500.5).abs() < f64::EPSILON);
        assert_eq!(product.stock, 3);
        assert_eq!(product.category_id, None);
        assert_eq!(product.measure_type, MeasureType::None);
    }

    #[test]
    fn raw_product_folds_legacy_image_fields() {
        let data = json!({
            "name": "Gorra",
            "imageUrl": "https://cdn/x.jpg",
            "imagePath": "products/x",
        });
        let product = RawProduct::from_document("p1", &data);
        assert_eq!(product.image_urls, vec!["https://cdn/x.jpg"]);
        assert_eq!(product.image_paths, vec!["products/x"]);
        assert_eq!(product.cover_image(), Some("https://cdn/x.jpg"));
    }

    #[test]
    fn measure_options_accept_comma_separated_string() {
        let data = json!({ "measureOptions": "S, M, ,L" });
        let product = RawProduct::from_document("p1", &data);
        assert_eq!(product.measure_options, vec!["S", "M", "L"]);
    }

    #[test]
    fn garbage_fields_coalesce_to_defaults() {
        let data = json!({
            "name": 42,
            "price": {"nested": true},
            "stock": null,
            "measureType": "whatever",
            "createdAt": "not-a-date",
        });
        let product = RawProduct::from_document("p1", &data);
        assert_eq!(product.name, "");
        assert!((product.price - 0.0).abs() < f64::EPSILON);
        assert_eq!(product.stock, 0);
        assert_eq!(product.measure_type, MeasureType::None);
        assert_eq!(product.created_at, None);
    }
}
