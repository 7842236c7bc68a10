//! Application state shared across handlers.

use std::sync::Arc;

use crate::assets::{AssetStore, CloudinaryStore, NullAssetStore};
use crate::cart::CartEngine;
use crate::catalog::CatalogService;
use crate::config::{AssetBackend, ServerConfig, StoreBackend};
use crate::orders::OrderService;
use crate::store::{FirestoreStore, MemoryStore, SharedStore};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Holds the configuration plus one instance of
/// each service, all sharing the same store handle.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    store: SharedStore,
    catalog: CatalogService,
    cart: CartEngine,
    orders: OrderService,
}

impl AppState {
    /// Build the state from configuration, constructing the configured store
    /// and asset backends.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let store: SharedStore = match &config.store {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::Firestore(firestore) => Arc::new(FirestoreStore::new(firestore)),
        };
        let assets: Arc<dyn AssetStore> = match &config.assets {
            AssetBackend::Null => Arc::new(NullAssetStore),
            AssetBackend::Cloudinary(cloudinary) => Arc::new(CloudinaryStore::new(cloudinary)),
        };
        Self::with_components(config, store, assets)
    }

    /// Build the state from explicit backends. Tests use this to inject the
    /// in-memory store regardless of configuration.
    #[must_use]
    pub fn with_components(
        config: ServerConfig,
        store: SharedStore,
        assets: Arc<dyn AssetStore>,
    ) -> Self {
        let catalog = CatalogService::new(Arc::clone(&store), assets);
        let cart = CartEngine::new(Arc::clone(&store), catalog.clone());
        let orders = OrderService::new(Arc::clone(&store), catalog.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                catalog,
                cart,
                orders,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn store(&self) -> &SharedStore {
        &self.inner.store
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    #[must_use]
    pub fn cart(&self) -> &CartEngine {
        &self.inner.cart
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }
}
