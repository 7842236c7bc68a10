//! Document store access.
//!
//! Every entity in the system lives as a JSON document inside a named
//! collection (`categories`, `products`, `carts`, `orders`, `checkouts`).
//! The store is an external collaborator: this module only defines the seam
//! ([`DocumentStore`]) plus two backends - a hosted Firestore REST client
//! for production and an in-memory store for tests and local development.
//!
//! # Concurrency
//!
//! The transactional read-modify-write primitive is exposed as optimistic
//! concurrency: every read returns a [`Revision`], and a conditional write
//! with [`Precondition::Revision`] fails with
//! [`StoreError::PreconditionFailed`] if the document changed in between.
//! Callers that need a per-document critical section (the cart engine) loop
//! on that failure; business aborts are never retried.
//!
//! The store handle is constructed once at process startup and passed by
//! dependency injection - there is no global memoized client.

pub mod firestore;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

/// Collection names used across the services.
pub mod collections {
    pub const CATEGORIES: &str = "categories";
    pub const PRODUCTS: &str = "products";
    pub const CARTS: &str = "carts";
    pub const ORDERS: &str = "orders";
    pub const CHECKOUTS: &str = "checkouts";
}

/// Errors surfaced by a document store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A conditional write lost the race: the document's revision no longer
    /// matches (or an existence precondition failed).
    #[error("write precondition failed")]
    PreconditionFailed,

    /// HTTP transport failure talking to the hosted store.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend returned a payload we could not decode.
    #[error("decode error: {0}")]
    Decode(String),

    /// The backend rejected the request.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Opaque document revision token.
///
/// For Firestore this is the document's `updateTime`; for the in-memory
/// store it is a per-document write counter. Callers treat it as opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision(String);

impl Revision {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A document read from the store.
#[derive(Debug, Clone)]
pub struct Document {
    /// Document id within its collection.
    pub id: String,
    /// Decoded JSON payload.
    pub data: Value,
    /// Revision observed at read time.
    pub revision: Revision,
}

/// Write precondition for [`DocumentStore::put`].
#[derive(Debug, Clone)]
pub enum Precondition {
    /// Unconditional write.
    None,
    /// The document must not exist yet.
    MustNotExist,
    /// The document must still be at this revision.
    Revision(Revision),
}

/// Seam over a hosted document database.
///
/// Implementations must guarantee that a `put` with a revision or existence
/// precondition is atomic with respect to concurrent writers on the same
/// document - that is the only isolation the rest of the system relies on.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one document. `Ok(None)` if it does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Read every document in a collection.
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Create a document with a store-generated id.
    async fn add(&self, collection: &str, data: Value) -> Result<Document, StoreError>;

    /// Write a document, subject to `precondition`.
    async fn put(
        &self,
        collection: &str,
        id: &str,
        data: Value,
        precondition: Precondition,
    ) -> Result<(), StoreError>;

    /// Delete a document. Deleting a missing document is a no-op.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}

/// Shared handle to the configured store backend.
pub type SharedStore = Arc<dyn DocumentStore>;
