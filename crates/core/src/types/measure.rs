//! Product measure (variant) types.
//!
//! A measure is a variant selector on a product: a clothing size (`ropa`) or
//! a footwear number (`calzado`). Whether a measure is required at all is
//! controlled by the product's [`MeasureType`].
//!
//! Cart callers historically sent "no measure" as `null`, `""`, or
//! whitespace. [`Measure::normalize`] is the single place that collapses all
//! of those onto `None`; every cart operation must go through it so that the
//! same `(product, measure)` pair always resolves to the same line.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Which kind of measure a product carries, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasureType {
    /// Product has no variants.
    #[default]
    None,
    /// Clothing sizes (S, M, L, ...).
    Ropa,
    /// Footwear numbers (38, 39, ...).
    Calzado,
}

impl MeasureType {
    /// Parse a stored or inbound value. Unknown values fall back to `None`,
    /// matching how stored documents are read leniently.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "ropa" => Self::Ropa,
            "calzado" => Self::Calzado,
            _ => Self::None,
        }
    }

    /// The wire representation of this measure type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Ropa => "ropa",
            Self::Calzado => "calzado",
        }
    }

    /// Whether products of this type require a measure selection.
    #[must_use]
    pub const fn requires_selection(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for MeasureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A selected product measure, always non-empty and trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Measure(String);

impl Measure {
    /// Normalize a raw measure value: trim whitespace and collapse empty or
    /// missing values to `None`.
    #[must_use]
    pub fn normalize(value: Option<&str>) -> Option<Self> {
        let trimmed = value?.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    /// Get the measure label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
