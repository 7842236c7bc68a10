//! Inbound payload normalization for catalog writes.
//!
//! Clients historically sent either legacy Spanish field names (`nombre`,
//! `precio`, `id_categoria`, `tipo_medida`, `medidas`) or the current
//! English ones (`name`, `price`, `categoryId`, `measureType`,
//! `measureOptions`). The [`CategoryInput`]/[`ProductInput`] adapters map
//! both spellings onto one canonical record at the boundary; everything past
//! this module is single-shaped.
//!
//! Normalization runs in two modes:
//!
//! - **full** (create): every required field must be present and valid.
//! - **partial** (update): only supplied fields are validated; an update
//!   that supplies no usable field at all is rejected.
//!
//! Measure consistency is validated jointly: touching either `measureType`
//! or `measureOptions` recomputes both, and a non-`none` type with zero
//! options is invalid.

use serde_json::{Map, Value};
use tienda_core::MeasureType;

use crate::error::AppError;

/// Raw category payload after field-name adaptation.
#[derive(Debug, Default, Clone)]
pub struct CategoryInput {
    pub name: Option<Value>,
    pub slug: Option<Value>,
}

impl CategoryInput {
    /// Adapt an inbound JSON payload, accepting both field spellings.
    #[must_use]
    pub fn from_payload(payload: &Value) -> Self {
        Self {
            name: pick(payload, &["nombre_categoria", "name"]),
            slug: pick(payload, &["slug"]),
        }
    }
}

/// Raw product payload after field-name adaptation. `Some` means the field
/// was supplied, even if its value is `null`.
#[derive(Debug, Default, Clone)]
pub struct ProductInput {
    pub name: Option<Value>,
    pub description: Option<Value>,
    pub price: Option<Value>,
    pub category_id: Option<Value>,
    pub stock: Option<Value>,
    pub tag: Option<Value>,
    pub measure_type: Option<Value>,
    pub measure_options: Option<Value>,
}

impl ProductInput {
    /// Adapt an inbound JSON payload, accepting both field spellings.
    #[must_use]
    pub fn from_payload(payload: &Value) -> Self {
        Self {
            name: pick(payload, &["nombre", "name"]),
            description: pick(payload, &["descripcion", "description"]),
            price: pick(payload, &["precio", "price"]),
            category_id: pick(payload, &["id_categoria", "categoryId"]),
            stock: pick(payload, &["stock"]),
            tag: pick(payload, &["tag"]),
            measure_type: pick(payload, &["tipo_medida", "measureType"]),
            measure_options: pick(payload, &["medidas", "measureOptions"]),
        }
    }
}

/// A validated category write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedCategory {
    pub name: String,
    pub slug: String,
}

/// A validated product write; `None` fields were not supplied (partial mode).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NormalizedProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category_id: Option<String>,
    pub stock: Option<i64>,
    /// `Some(None)` clears the tag.
    pub tag: Option<Option<String>>,
    pub measure_type: Option<MeasureType>,
    pub measure_options: Option<Vec<String>>,
}

impl NormalizedProduct {
    /// Whether the update carries any field at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.category_id.is_none()
            && self.stock.is_none()
            && self.tag.is_none()
            && self.measure_type.is_none()
            && self.measure_options.is_none()
    }

    /// Merge the supplied fields into a stored document shape.
    pub fn merge_into(&self, doc: &mut Map<String, Value>) {
        if let Some(name) = &self.name {
            doc.insert("name".to_owned(), Value::from(name.clone()));
        }
        if let Some(description) = &self.description {
            doc.insert("description".to_owned(), Value::from(description.clone()));
        }
        if let Some(price) = self.price {
            doc.insert("price".to_owned(), Value::from(price));
        }
        if let Some(category_id) = &self.category_id {
            doc.insert("categoryId".to_owned(), Value::from(category_id.clone()));
        }
        if let Some(stock) = self.stock {
            doc.insert("stock".to_owned(), Value::from(stock));
        }
        if let Some(tag) = &self.tag {
            doc.insert(
                "tag".to_owned(),
                tag.clone().map_or(Value::Null, Value::from),
            );
        }
        if let Some(measure_type) = self.measure_type {
            doc.insert("measureType".to_owned(), Value::from(measure_type.as_str()));
        }
        if let Some(measure_options) = &self.measure_options {
            doc.insert(
                "measureOptions".to_owned(),
                Value::from(measure_options.clone()),
            );
        }
    }
}

/// Validate and normalize a category payload.
///
/// The slug is derived from the name (case fold, diacritic strip,
/// non-alphanumeric runs collapsed to hyphens) unless explicitly supplied.
///
/// # Errors
///
/// `AppError::Validation` if the name is empty or no valid slug can be
/// derived.
pub fn normalize_category(input: &CategoryInput) -> Result<NormalizedCategory, AppError> {
    let name = safe_string(input.name.as_ref());
    if name.is_empty() {
        return Err(AppError::Validation(
            "El nombre de la categoria es requerido.".to_owned(),
        ));
    }

    let slug = {
        let explicit = safe_string(input.slug.as_ref());
        if explicit.is_empty() { slugify(&name) } else { explicit }
    };
    if slug.is_empty() {
        return Err(AppError::Validation(
            "No se pudo generar un slug valido para la categoria.".to_owned(),
        ));
    }

    Ok(NormalizedCategory { name, slug })
}

/// Validate and normalize a product payload.
///
/// # Errors
///
/// `AppError::Validation` on any invalid supplied field, on missing
/// required fields in full mode, or on a partial update with no fields.
pub fn normalize_product(
    input: &ProductInput,
    partial: bool,
) -> Result<NormalizedProduct, AppError> {
    let mut normalized = NormalizedProduct::default();

    if !partial || input.name.is_some() {
        let name = safe_string(input.name.as_ref());
        if name.is_empty() {
            return Err(AppError::Validation(
                "El nombre del producto es requerido.".to_owned(),
            ));
        }
        normalized.name = Some(name);
    }

    if !partial || input.description.is_some() {
        normalized.description = Some(safe_string(input.description.as_ref()));
    }

    if !partial || input.price.is_some() {
        let price = parse_number(input.price.as_ref());
        match price {
            Some(price) if price >= 0.0 => normalized.price = Some(price),
            _ => {
                return Err(AppError::Validation(
                    "El precio del producto es invalido.".to_owned(),
                ));
            }
        }
    }

    if !partial || input.category_id.is_some() {
        let category_id = safe_string(input.category_id.as_ref());
        if category_id.is_empty() {
            return Err(AppError::Validation(
                "La categoria del producto es requerida.".to_owned(),
            ));
        }
        normalized.category_id = Some(category_id);
    }

    if !partial || input.stock.is_some() {
        let stock = parse_integer(input.stock.as_ref());
        match stock {
            Some(stock) if stock >= 0 => normalized.stock = Some(stock),
            _ => {
                return Err(AppError::Validation(
                    "El stock del producto es invalido.".to_owned(),
                ));
            }
        }
    }

    if !partial || input.tag.is_some() {
        let tag = safe_string(input.tag.as_ref());
        normalized.tag = Some(if tag.is_empty() { None } else { Some(tag) });
    }

    // Measure type and options are recomputed together whenever either is
    // touched, so they cannot drift apart across partial updates.
    if !partial || input.measure_type.is_some() || input.measure_options.is_some() {
        let measure_type = MeasureType::parse(&safe_string(input.measure_type.as_ref()));
        let measure_options = parse_measure_options(input.measure_options.as_ref());

        if measure_type.requires_selection() && measure_options.is_empty() {
            return Err(AppError::Validation(
                "Debes indicar al menos una medida disponible para el producto.".to_owned(),
            ));
        }

        normalized.measure_type = Some(measure_type);
        normalized.measure_options = Some(if measure_type.requires_selection() {
            measure_options
        } else {
            Vec::new()
        });
    }

    if partial && normalized.is_empty() {
        return Err(AppError::Validation(
            "No se enviaron datos para actualizar.".to_owned(),
        ));
    }

    Ok(normalized)
}

/// Derive a URL slug: diacritics stripped, case folded, non-alphanumeric
/// runs collapsed to single hyphens, leading/trailing hyphens trimmed.
#[must_use]
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_hyphen = false;

    for c in value.trim().chars().flat_map(char::to_lowercase) {
        let folded = fold_diacritic(c);
        if folded.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(folded);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Map accented Latin letters onto their ASCII base letter.
const fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

/// Pick the first supplied spelling of a field. Returns `Some` when any
/// spelling key is present; the value is the first non-null one.
fn pick(payload: &Value, keys: &[&str]) -> Option<Value> {
    let object = payload.as_object()?;
    let supplied = keys.iter().any(|key| object.contains_key(*key));
    if !supplied {
        return None;
    }

    for key in keys {
        if let Some(value) = object.get(*key)
            && !value.is_null()
        {
            return Some(value.clone());
        }
    }
    Some(Value::Null)
}

/// Trimmed string value; anything that is not a string becomes `""`.
fn safe_string(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default()
        .to_owned()
}

/// Number from a JSON number or numeric string; empty strings and junk are
/// `None`.
fn parse_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok().filter(|parsed| !parsed.is_nan())
            }
        }
        _ => None,
    }
}

/// Integer from a JSON number or numeric string; rejects fractional values.
fn parse_integer(value: Option<&Value>) -> Option<i64> {
    let parsed = parse_number(value)?;
    if parsed.fract() == 0.0 {
        #[allow(clippy::cast_possible_truncation)]
        Some(parsed as i64)
    } else {
        None
    }
}

/// Measure options from a list or a comma-separated string.
fn parse_measure_options(value: Option<&Value>) -> Vec<String> {
    match value {
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
