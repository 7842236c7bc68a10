//! Tienda Core - Shared types library.
//!
//! This crate provides common types used across all Tienda components:
//! - `server` - Storefront and admin JSON API
//! - `integration-tests` - End-to-end tests over the in-memory store
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no store access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and product measures

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
