//! In-memory document store.
//!
//! Used by tests and local development (`STORE_BACKEND=memory`). Semantics
//! mirror the hosted backend: string ids, JSON payloads, and conditional
//! writes that fail with [`StoreError::PreconditionFailed`] when the
//! document's revision moved. All operations serialize on one mutex, which
//! trivially satisfies the atomicity contract of [`DocumentStore`].

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Document, DocumentStore, Precondition, Revision, StoreError};

#[derive(Debug, Clone)]
struct StoredDocument {
    data: Value,
    version: u64,
}

impl StoredDocument {
    fn to_document(&self, id: &str) -> Document {
        Document {
            id: id.to_owned(),
            data: self.data.clone(),
            revision: Revision::new(self.version.to_string()),
        }
    }
}

/// In-memory [`DocumentStore`] backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, BTreeMap<String, StoredDocument>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.lock().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|doc| doc.to_document(id)))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.lock().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, doc)| doc.to_document(id))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn add(&self, collection: &str, data: Value) -> Result<Document, StoreError> {
        let id = Uuid::new_v4().to_string();
        let mut collections = self.collections.lock().await;
        let docs = collections.entry(collection.to_owned()).or_default();
        let stored = StoredDocument { data, version: 1 };
        let document = stored.to_document(&id);
        docs.insert(id, stored);
        Ok(document)
    }

    async fn put(
        &self,
        collection: &str,
        id: &str,
        data: Value,
        precondition: Precondition,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().await;
        let docs = collections.entry(collection.to_owned()).or_default();

        let next_version = match (docs.get(id), &precondition) {
            (Some(_), Precondition::MustNotExist) => {
                return Err(StoreError::PreconditionFailed);
            }
            (None, Precondition::Revision(_)) => {
                return Err(StoreError::PreconditionFailed);
            }
            (Some(existing), Precondition::Revision(revision)) => {
                if existing.version.to_string() != revision.as_str() {
                    return Err(StoreError::PreconditionFailed);
                }
                existing.version + 1
            }
            (Some(existing), Precondition::None) => existing.version + 1,
            (None, _) => 1,
        };

        docs.insert(
            id.to_owned(),
            StoredDocument {
                data,
                version: next_version,
            },
        );
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().await;
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn get_returns_none_for_missing_document() {
        let store = MemoryStore::new();
        assert!(store.get("carts", "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_and_get_round_trip() {
        let store = MemoryStore::new();
        store
            .put("carts", "c1", json!({"items": []}), Precondition::None)
            .await
            .unwrap();

        let doc = store.get("carts", "c1").await.unwrap().unwrap();
        assert_eq!(doc.data, json!({"items": []}));
    }

    #[tokio::test]
    async fn must_not_exist_rejects_existing_document() {
        let store = MemoryStore::new();
        store
            .put("carts", "c1", json!({}), Precondition::None)
            .await
            .unwrap();

        let err = store
            .put("carts", "c1", json!({}), Precondition::MustNotExist)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::PreconditionFailed));
    }

    #[tokio::test]
    async fn stale_revision_is_rejected() {
        let store = MemoryStore::new();
        store
            .put("carts", "c1", json!({"n": 0}), Precondition::None)
            .await
            .unwrap();
        let stale = store.get("carts", "c1").await.unwrap().unwrap().revision;

        // Another writer advances the document.
        store
            .put("carts", "c1", json!({"n": 1}), Precondition::None)
            .await
            .unwrap();

        let err = store
            .put("carts", "c1", json!({"n": 2}), Precondition::Revision(stale))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::PreconditionFailed));

        // The losing write must not have landed.
        let doc = store.get("carts", "c1").await.unwrap().unwrap();
        assert_eq!(doc.data, json!({"n": 1}));
    }

    #[tokio::test]
    async fn current_revision_is_accepted() {
        let store = MemoryStore::new();
        store
            .put("carts", "c1", json!({"n": 0}), Precondition::None)
            .await
            .unwrap();
        let current = store.get("carts", "c1").await.unwrap().unwrap().revision;

        store
            .put("carts", "c1", json!({"n": 1}), Precondition::Revision(current))
            .await
            .unwrap();
        let doc = store.get("carts", "c1").await.unwrap().unwrap();
        assert_eq!(doc.data, json!({"n": 1}));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        store
            .put("carts", "c1", json!({}), Precondition::None)
            .await
            .unwrap();
        store.delete("carts", "c1").await.unwrap();
        store.delete("carts", "c1").await.unwrap();
        assert!(store.get("carts", "c1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn add_generates_distinct_ids() {
        let store = MemoryStore::new();
        let a = store.add("orders", json!({"total": 1})).await.unwrap();
        let b = store.add("orders", json!({"total": 2})).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.list("orders").await.unwrap().len(), 2);
    }
}
