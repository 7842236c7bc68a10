//! Catalog serializers: stored document shape to API-facing entity shape.
//!
//! The public API keeps the original Spanish field names (`nombre_categoria`,
//! `precio`, `medidas`, ...) alongside the raw `id` so existing clients keep
//! working. These are pure mappings with no side effects.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tienda_core::MeasureType;

use super::{RawCategory, RawProduct};

/// API-facing category entity.
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: String,
    pub id_categoria: String,
    pub nombre_categoria: String,
    pub slug: String,
    pub created_at: Option<String>,
}

/// API-facing product entity.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: String,
    pub id_producto: String,
    pub nombre: String,
    pub descripcion: String,
    pub precio: f64,
    pub id_categoria: Option<String>,
    pub stock: i64,
    pub tag: Option<String>,
    pub tipo_medida: MeasureType,
    pub medidas: Vec<String>,
    /// Cover image: first entry of `imagenes`.
    pub imagen: Option<String>,
    pub imagenes: Vec<String>,
    pub image_url: Option<String>,
    pub image_urls: Vec<String>,
    pub image_path: Option<String>,
    pub image_paths: Vec<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// A category with its products attached (`con-productos` listing).
#[derive(Debug, Clone, Serialize)]
pub struct CategoryWithProducts {
    #[serde(flatten)]
    pub category: Category,
    pub productos: Vec<Product>,
}

/// Map a stored category onto its API shape.
#[must_use]
pub fn serialize_category(category: &RawCategory) -> Category {
    Category {
        id: category.id.clone(),
        id_categoria: category.id.clone(),
        nombre_categoria: category.name.clone(),
        slug: category.slug.clone(),
        created_at: to_iso_string(category.created_at),
    }
}

/// Map a stored product onto its API shape.
#[must_use]
pub fn serialize_product(product: &RawProduct) -> Product {
    Product {
        id: product.id.clone(),
        id_producto: product.id.clone(),
        nombre: product.name.clone(),
        descripcion: product.description.clone(),
        precio: product.price,
        id_categoria: product.category_id.clone(),
        stock: product.stock,
        tag: product.tag.clone(),
        tipo_medida: product.measure_type,
        medidas: product.measure_options.clone(),
        imagen: product.cover_image().map(str::to_owned),
        imagenes: product.image_urls.clone(),
        image_url: product.cover_image().map(str::to_owned),
        image_urls: product.image_urls.clone(),
        image_path: product.image_paths.first().cloned(),
        image_paths: product.image_paths.clone(),
        created_at: to_iso_string(product.created_at),
        updated_at: to_iso_string(product.updated_at),
    }
}

fn to_iso_string(at: Option<DateTime<Utc>>) -> Option<String> {
    at.map(|at| at.to_rfc3339())
}
