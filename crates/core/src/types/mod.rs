//! Core types for Tienda.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod measure;

pub use id::*;
pub use measure::{Measure, MeasureType};
