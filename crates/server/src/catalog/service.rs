//! Catalog store access.
//!
//! Owns the `categories` and `products` collections. Catalog reads are not
//! transactional: listings re-read the store on every call and may observe a
//! product mid-update, which is acceptable because no single read spans two
//! fields atomically in the UI. The only write-ordering rule lives in image
//! replacement: new remote assets are uploaded first, the document update
//! lands second, and the old assets are deleted last - a failed delete is
//! logged and tolerated (stale images may briefly remain) rather than rolled
//! back or retried.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value, json};
use tienda_core::{CategoryId, ProductId};
use tracing::instrument;

use crate::assets::{AssetStore, ImageUpload, UploadedAsset};
use crate::error::{AppError, Result};
use crate::store::{Precondition, SharedStore, collections};

use super::normalize::{
    CategoryInput, ProductInput, normalize_category, normalize_product,
};
use super::serialize::{
    Category, CategoryWithProducts, Product, serialize_category, serialize_product,
};
use super::{RawCategory, RawProduct};

const DEFAULT_PAGE_SIZE: usize = 15;

/// Catalog service owning category and product documents.
#[derive(Clone)]
pub struct CatalogService {
    store: SharedStore,
    assets: Arc<dyn AssetStore>,
}

impl CatalogService {
    #[must_use]
    pub fn new(store: SharedStore, assets: Arc<dyn AssetStore>) -> Self {
        Self { store, assets }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// List every category, sorted by name.
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let mut categories = self.read_categories_raw().await?;
        categories.sort_by_key(|category| category.name.to_lowercase());
        Ok(categories.iter().map(serialize_category).collect())
    }

    /// Get one category. `Ok(None)` if absent.
    pub async fn get_category_by_id(&self, id: &CategoryId) -> Result<Option<Category>> {
        Ok(self
            .get_category_raw(id.as_str())
            .await?
            .as_ref()
            .map(serialize_category))
    }

    /// Create a category, enforcing case-insensitive name/slug uniqueness.
    #[instrument(skip(self, payload))]
    pub async fn create_category(&self, payload: &Value) -> Result<Category> {
        let normalized = normalize_category(&CategoryInput::from_payload(payload))?;
        self.ensure_unique_category(&normalized.name, &normalized.slug, None)
            .await?;

        let now = Utc::now().to_rfc3339();
        let document = self
            .store
            .add(
                collections::CATEGORIES,
                json!({
                    "name": normalized.name,
                    "slug": normalized.slug,
                    "createdAt": now,
                    "updatedAt": now,
                }),
            )
            .await?;

        Ok(serialize_category(&RawCategory::from_document(
            &document.id,
            &document.data,
        )))
    }

    /// Update a category. Missing fields fall back to the stored values
    /// before normalization, so a rename keeps the slug and vice versa.
    #[instrument(skip(self, payload))]
    pub async fn update_category(&self, id: &CategoryId, payload: &Value) -> Result<Category> {
        let existing = self
            .get_category_raw(id.as_str())
            .await?
            .ok_or_else(|| AppError::NotFound("Categoria no encontrada.".to_owned()))?;

        let mut input = CategoryInput::from_payload(payload);
        if input.name.is_none() {
            input.name = Some(Value::from(existing.name.clone()));
        }
        if input.slug.is_none() {
            input.slug = Some(Value::from(existing.slug.clone()));
        }

        let normalized = normalize_category(&input)?;
        self.ensure_unique_category(&normalized.name, &normalized.slug, Some(id.as_str()))
            .await?;

        let updated_at = Utc::now();
        self.store
            .put(
                collections::CATEGORIES,
                id.as_str(),
                json!({
                    "name": normalized.name,
                    "slug": normalized.slug,
                    "createdAt": existing.created_at.map(|at| at.to_rfc3339()),
                    "updatedAt": updated_at.to_rfc3339(),
                }),
                Precondition::None,
            )
            .await?;

        Ok(serialize_category(&RawCategory {
            name: normalized.name,
            slug: normalized.slug,
            updated_at: Some(updated_at),
            ..existing
        }))
    }

    /// Delete a category. Blocked while any product references it.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: &CategoryId) -> Result<()> {
        let category = self.get_category_raw(id.as_str()).await?;
        if category.is_none() {
            return Err(AppError::NotFound("Categoria no encontrada.".to_owned()));
        }

        let products = self.read_products_raw().await?;
        let referenced = products
            .iter()
            .any(|product| product.category_id.as_deref() == Some(id.as_str()));
        if referenced {
            return Err(AppError::Conflict(
                "No se puede eliminar la categoria porque tiene productos asociados.".to_owned(),
            ));
        }

        self.store.delete(collections::CATEGORIES, id.as_str()).await?;
        Ok(())
    }

    /// List categories sorted by name, each with its products attached
    /// (newest product first).
    pub async fn list_categories_with_products(&self) -> Result<Vec<CategoryWithProducts>> {
        let mut categories = self.read_categories_raw().await?;
        categories.sort_by_key(|category| category.name.to_lowercase());

        let mut products = self.read_products_raw().await?;
        sort_newest_first(&mut products);
        let serialized: Vec<Product> = products.iter().map(serialize_product).collect();

        Ok(categories
            .iter()
            .map(|category| CategoryWithProducts {
                category: serialize_category(category),
                productos: serialized
                    .iter()
                    .filter(|product| product.id_categoria.as_deref() == Some(category.id.as_str()))
                    .cloned()
                    .collect(),
            })
            .collect())
    }

    /// Products of a category found by slug or name (case-insensitive).
    /// `Ok(None)` when no category matches.
    pub async fn products_by_category(&self, identifier: &str) -> Result<Option<Vec<Product>>> {
        let Some(category) = self.find_category(identifier).await? else {
            return Ok(None);
        };

        let mut products = self.read_products_raw().await?;
        products.retain(|product| product.category_id.as_deref() == Some(category.id.as_str()));
        sort_newest_first(&mut products);
        Ok(Some(products.iter().map(serialize_product).collect()))
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// List products, newest first, sliced by offset/limit. Non-positive
    /// values fall back to the defaults (offset 0, limit 15).
    pub async fn list_products(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Product>> {
        let limit = limit
            .filter(|value| *value > 0)
            .and_then(|value| usize::try_from(value).ok())
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let offset = offset
            .filter(|value| *value > 0)
            .and_then(|value| usize::try_from(value).ok())
            .unwrap_or(0);

        let mut products = self.read_products_raw().await?;
        sort_newest_first(&mut products);
        Ok(products
            .iter()
            .skip(offset)
            .take(limit)
            .map(serialize_product)
            .collect())
    }

    /// Every product, newest first.
    pub async fn list_all_products(&self) -> Result<Vec<Product>> {
        let mut products = self.read_products_raw().await?;
        sort_newest_first(&mut products);
        Ok(products.iter().map(serialize_product).collect())
    }

    /// Case-insensitive substring search on the product name only.
    pub async fn search_products(&self, term: &str) -> Result<Vec<Product>> {
        let needle = term.trim().to_lowercase();
        let mut products = self.read_products_raw().await?;
        sort_newest_first(&mut products);
        products.retain(|product| product.name.to_lowercase().contains(&needle));
        Ok(products.iter().map(serialize_product).collect())
    }

    /// Products with an exact (case-insensitive) tag match, newest first.
    pub async fn products_by_tag(&self, tag: &str) -> Result<Vec<Product>> {
        let needle = tag.trim().to_lowercase();
        let mut products = self.read_products_raw().await?;
        sort_newest_first(&mut products);
        products.retain(|product| {
            product
                .tag
                .as_deref()
                .is_some_and(|product_tag| product_tag.to_lowercase() == needle)
        });
        Ok(products.iter().map(serialize_product).collect())
    }

    /// Get one product. `Ok(None)` if absent.
    pub async fn get_product_by_id(&self, id: &ProductId) -> Result<Option<Product>> {
        Ok(self
            .get_product_raw(id.as_str())
            .await?
            .as_ref()
            .map(serialize_product))
    }

    /// Read-only stock projection used by cart validation.
    pub async fn get_product_stock(&self, id: &ProductId) -> Result<Option<i64>> {
        Ok(self
            .get_product_raw(id.as_str())
            .await?
            .map(|product| product.stock))
    }

    /// Create a product. The category must exist; images are uploaded to the
    /// asset host before the document is written.
    #[instrument(skip(self, payload, images))]
    pub async fn create_product(
        &self,
        payload: &Value,
        images: Vec<ImageUpload>,
    ) -> Result<Product> {
        let normalized = normalize_product(&ProductInput::from_payload(payload), false)?;
        let category_id = normalized.category_id.clone().ok_or_else(|| {
            AppError::Validation("La categoria del producto es requerida.".to_owned())
        })?;
        self.ensure_category_exists(&category_id).await?;

        let uploaded = self.upload_images(images).await?;
        let now = Utc::now().to_rfc3339();

        let mut doc = Map::new();
        normalized.merge_into(&mut doc);
        set_image_fields(&mut doc, &uploaded);
        doc.insert("createdAt".to_owned(), Value::from(now.clone()));
        doc.insert("updatedAt".to_owned(), Value::from(now));

        let document = self
            .store
            .add(collections::PRODUCTS, Value::Object(doc))
            .await?;
        Ok(serialize_product(&RawProduct::from_document(
            &document.id,
            &document.data,
        )))
    }

    /// Partially update a product. New images fully replace the previous
    /// set; the old remote assets are deleted only after the document update
    /// succeeds, and a failed delete is logged, not retried.
    #[instrument(skip(self, payload, images))]
    pub async fn update_product(
        &self,
        id: &ProductId,
        payload: &Value,
        images: Vec<ImageUpload>,
    ) -> Result<Product> {
        let existing = self
            .get_product_raw(id.as_str())
            .await?
            .ok_or_else(|| AppError::NotFound("Producto no encontrado.".to_owned()))?;

        let normalized = normalize_product(&ProductInput::from_payload(payload), true)?;
        if let Some(category_id) = &normalized.category_id {
            self.ensure_category_exists(category_id).await?;
        }

        let uploaded = self.upload_images(images).await?;

        let mut doc = match existing.to_document_data() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        normalized.merge_into(&mut doc);
        if !uploaded.is_empty() {
            set_image_fields(&mut doc, &uploaded);
        }
        doc.insert("updatedAt".to_owned(), Value::from(Utc::now().to_rfc3339()));

        let data = Value::Object(doc);
        self.store
            .put(collections::PRODUCTS, id.as_str(), data.clone(), Precondition::None)
            .await?;

        if !uploaded.is_empty() {
            self.delete_remote_images(&existing.image_paths).await;
        }

        Ok(serialize_product(&RawProduct::from_document(
            id.as_str(),
            &data,
        )))
    }

    /// Delete a product document, then best-effort delete its remote images.
    /// Image deletion failure does not roll back the document delete.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: &ProductId) -> Result<()> {
        let existing = self
            .get_product_raw(id.as_str())
            .await?
            .ok_or_else(|| AppError::NotFound("Producto no encontrado.".to_owned()))?;

        self.store.delete(collections::PRODUCTS, id.as_str()).await?;
        self.delete_remote_images(&existing.image_paths).await;
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn read_categories_raw(&self) -> Result<Vec<RawCategory>> {
        let documents = self.store.list(collections::CATEGORIES).await?;
        Ok(documents
            .iter()
            .map(|doc| RawCategory::from_document(&doc.id, &doc.data))
            .collect())
    }

    async fn read_products_raw(&self) -> Result<Vec<RawProduct>> {
        let documents = self.store.list(collections::PRODUCTS).await?;
        Ok(documents
            .iter()
            .map(|doc| RawProduct::from_document(&doc.id, &doc.data))
            .collect())
    }

    async fn get_category_raw(&self, id: &str) -> Result<Option<RawCategory>> {
        Ok(self
            .store
            .get(collections::CATEGORIES, id)
            .await?
            .map(|doc| RawCategory::from_document(&doc.id, &doc.data)))
    }

    pub(crate) async fn get_product_raw(&self, id: &str) -> Result<Option<RawProduct>> {
        Ok(self
            .store
            .get(collections::PRODUCTS, id)
            .await?
            .map(|doc| RawProduct::from_document(&doc.id, &doc.data)))
    }

    async fn find_category(&self, identifier: &str) -> Result<Option<RawCategory>> {
        let needle = identifier.trim().to_lowercase();
        let categories = self.read_categories_raw().await?;

        Ok(categories
            .iter()
            .find(|category| category.slug.to_lowercase() == needle)
            .or_else(|| {
                categories
                    .iter()
                    .find(|category| category.name.to_lowercase() == needle)
            })
            .cloned())
    }

    async fn ensure_category_exists(&self, category_id: &str) -> Result<()> {
        if self.get_category_raw(category_id).await?.is_none() {
            return Err(AppError::NotFound("Categoria no encontrada.".to_owned()));
        }
        Ok(())
    }

    async fn ensure_unique_category(
        &self,
        name: &str,
        slug: &str,
        exclude_id: Option<&str>,
    ) -> Result<()> {
        let name = name.to_lowercase();
        let slug = slug.to_lowercase();
        let categories = self.read_categories_raw().await?;

        let duplicated = categories.iter().any(|category| {
            if exclude_id == Some(category.id.as_str()) {
                return false;
            }
            category.name.to_lowercase() == name || category.slug.to_lowercase() == slug
        });

        if duplicated {
            return Err(AppError::Conflict(
                "Ya existe una categoria con ese nombre o slug.".to_owned(),
            ));
        }
        Ok(())
    }

    async fn upload_images(&self, images: Vec<ImageUpload>) -> Result<Vec<UploadedAsset>> {
        let mut uploaded = Vec::with_capacity(images.len());
        for image in images {
            uploaded.push(self.assets.upload(image).await?);
        }
        Ok(uploaded)
    }

    /// Best-effort remote cleanup; failures leave stale assets behind, which
    /// is an accepted inconsistency window.
    async fn delete_remote_images(&self, asset_ids: &[String]) {
        for asset_id in asset_ids {
            if let Err(error) = self.assets.delete(asset_id).await {
                tracing::warn!(%asset_id, %error, "failed to delete remote image");
            }
        }
    }
}

fn sort_newest_first(products: &mut [RawProduct]) {
    products.sort_by_key(|product| {
        std::cmp::Reverse(product.created_at.unwrap_or(chrono::DateTime::UNIX_EPOCH))
    });
}

fn set_image_fields(doc: &mut Map<String, Value>, uploaded: &[UploadedAsset]) {
    let urls: Vec<String> = uploaded.iter().map(|asset| asset.url.clone()).collect();
    let paths: Vec<String> = uploaded
        .iter()
        .map(|asset| asset.asset_id.clone())
        .collect();

    doc.insert(
        "imageUrl".to_owned(),
        urls.first().cloned().map_or(Value::Null, Value::from),
    );
    doc.insert(
        "imagePath".to_owned(),
        paths.first().cloned().map_or(Value::Null, Value::from),
    );
    doc.insert("imageUrls".to_owned(), Value::from(urls));
    doc.insert("imagePaths".to_owned(), Value::from(paths));
}
