//! Cart mutation engine.
//!
//! Every mutation follows the same shape: validate input, read the product
//! once outside the critical section, then run an optimistic retry loop over
//! the cart document. Inside the loop the cart is re-read fresh, the new
//! line list is computed, and the write is attempted with the revision
//! observed at read time. A lost race retries the whole loop body; business
//! aborts (missing product, insufficient stock, missing line) are returned
//! immediately and never retried. After a commit the cart is read back and
//! hydrated, so the response reflects stored state.
//!
//! Stock is validated against the quantity already in the cart for the same
//! product across every measure, so the measures of one product share its
//! stock pool. The cart never decrements stock; it only refuses to grow past
//! the product's current value.

use chrono::Utc;
use serde_json::Value;
use tienda_core::Measure;
use tracing::instrument;
use uuid::Uuid;

use crate::catalog::{CatalogService, Product};
use crate::error::{AppError, Result};
use crate::store::{Precondition, SharedStore, StoreError, collections};

use super::{CartItem, StoredCart, StoredLine, serialize_cart_item};

/// How many times a lost optimistic race is retried before giving up.
const MAX_TXN_ATTEMPTS: u32 = 5;

/// Cart service owning the `carts` collection.
#[derive(Clone)]
pub struct CartEngine {
    store: SharedStore,
    catalog: CatalogService,
}

impl CartEngine {
    #[must_use]
    pub fn new(store: SharedStore, catalog: CatalogService) -> Self {
        Self { store, catalog }
    }

    /// Generate a fresh anonymous session id. Nothing is persisted until the
    /// id is used as a cart id.
    #[must_use]
    pub fn new_session_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Create a cart, generating an id when none is supplied. Creating an
    /// already existing cart is a no-op that returns its id.
    #[instrument(skip(self, id))]
    pub async fn create_cart(&self, id: Option<&str>) -> Result<String> {
        let generated;
        let cart_id = match id {
            Some(id) => ensure_id(id, "El id del carrito es requerido.")?,
            None => {
                generated = Self::new_session_id();
                generated.as_str()
            }
        };

        if self.read_cart(cart_id).await?.is_some() {
            return Ok(cart_id.to_owned());
        }
        self.write_empty_cart(cart_id).await?;
        Ok(cart_id.to_owned())
    }

    /// Register a client-supplied cart id. Unlike [`Self::create_cart`] this
    /// rejects an id that is already taken.
    #[instrument(skip(self))]
    pub async fn save_cart_id(&self, id: &str) -> Result<String> {
        let cart_id = ensure_id(id, "El id del carrito es requerido.")?;
        if self.read_cart(cart_id).await?.is_some() {
            return Err(AppError::Conflict(
                "El ID del carrito ya existe en la base de datos.".to_owned(),
            ));
        }
        self.write_empty_cart(cart_id).await?;
        Ok(cart_id.to_owned())
    }

    /// Whether a cart document exists.
    pub async fn cart_exists(&self, id: &str) -> Result<bool> {
        let cart_id = ensure_id(id, "El id del carrito es requerido.")?;
        Ok(self.read_cart(cart_id).await?.is_some())
    }

    /// Read a cart and hydrate its lines against the live products. A
    /// missing cart reads as empty, and lines whose product was deleted are
    /// dropped from the response without touching the stored document.
    pub async fn get_items(&self, id: &str) -> Result<Vec<CartItem>> {
        let cart_id = ensure_id(id, "El id del carrito es requerido.")?;
        let Some(cart) = self.read_cart(cart_id).await? else {
            return Ok(Vec::new());
        };
        self.hydrate(&cart.items).await
    }

    /// Add a quantity of a product to the cart, merging into the existing
    /// line for the same product and measure. Creates the cart if needed.
    #[instrument(skip(self))]
    pub async fn add_or_update_item(
        &self,
        cart_id: &str,
        product_id: &str,
        quantity: &Value,
        selected_measure: Option<&str>,
    ) -> Result<Vec<CartItem>> {
        let cart_id = ensure_id(cart_id, "El id del carrito es requerido.")?;
        let product_id = ensure_id(product_id, "El id del carrito es requerido.")?;
        let quantity = normalize_quantity(quantity)?;
        let measure = Measure::normalize(selected_measure);

        let product = self.require_product(product_id).await?;
        ensure_measure_valid(&product, measure.as_ref())?;

        self.run_cart_txn(cart_id, true, |mut cart| {
            let in_cart: i64 = cart
                .items
                .iter()
                .filter(|line| line.product_id == product_id)
                .map(|line| line.quantity)
                .sum();
            if in_cart + quantity > product.stock {
                return Err(AppError::Conflict(
                    "No hay stock suficiente para este producto.".to_owned(),
                ));
            }

            if let Some(line) = cart
                .items
                .iter_mut()
                .find(|line| line.matches(product_id, measure.as_ref()))
            {
                line.quantity += quantity;
            } else {
                cart.items.push(StoredLine {
                    product_id: product_id.to_owned(),
                    quantity,
                    selected_measure: measure.clone(),
                });
            }
            Ok(cart)
        })
        .await?;

        self.get_items(cart_id).await
    }

    /// Set the quantity of an existing line. The cart and the line must both
    /// exist; stock is checked against the other lines of the same product.
    #[instrument(skip(self))]
    pub async fn replace_item_quantity(
        &self,
        cart_id: &str,
        product_id: &str,
        quantity: &Value,
        selected_measure: Option<&str>,
    ) -> Result<Vec<CartItem>> {
        let cart_id = ensure_id(cart_id, "El id del carrito es requerido.")?;
        let product_id = ensure_id(product_id, "El id del carrito es requerido.")?;
        let quantity = normalize_quantity(quantity)?;
        let measure = Measure::normalize(selected_measure);

        let product = self.require_product(product_id).await?;

        self.run_cart_txn(cart_id, false, |mut cart| {
            let Some(index) = cart
                .items
                .iter()
                .position(|line| line.matches(product_id, measure.as_ref()))
            else {
                return Err(AppError::NotFound(
                    "El producto no existe en el carrito.".to_owned(),
                ));
            };

            let other_lines: i64 = cart
                .items
                .iter()
                .enumerate()
                .filter(|(i, line)| *i != index && line.product_id == product_id)
                .map(|(_, line)| line.quantity)
                .sum();
            if other_lines + quantity > product.stock {
                return Err(AppError::Conflict(
                    "No hay stock suficiente para este producto.".to_owned(),
                ));
            }

            cart.items[index].quantity = quantity;
            Ok(cart)
        })
        .await?;

        self.get_items(cart_id).await
    }

    /// Remove a line. Removing from a missing cart or removing an absent
    /// line is a silent no-op.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        cart_id: &str,
        product_id: &str,
        selected_measure: Option<&str>,
    ) -> Result<()> {
        let cart_id = ensure_id(cart_id, "El id del carrito es requerido.")?;
        let product_id = ensure_id(product_id, "El id del carrito es requerido.")?;
        let measure = Measure::normalize(selected_measure);

        for _ in 0..MAX_TXN_ATTEMPTS {
            let Some(doc) = self.store.get(collections::CARTS, cart_id).await? else {
                return Ok(());
            };
            let mut cart = StoredCart::from_data(&doc.data);
            cart.items
                .retain(|line| !line.matches(product_id, measure.as_ref()));

            match self
                .store
                .put(
                    collections::CARTS,
                    cart_id,
                    cart.to_data(Utc::now()),
                    Precondition::Revision(doc.revision),
                )
                .await
            {
                Ok(()) => return Ok(()),
                Err(StoreError::PreconditionFailed) => {}
                Err(error) => return Err(error.into()),
            }
        }
        Err(contention_error(cart_id))
    }

    /// Run one mutation under the optimistic retry loop. `create_missing`
    /// controls whether a missing cart starts empty or aborts with 404.
    async fn run_cart_txn(
        &self,
        cart_id: &str,
        create_missing: bool,
        mutate: impl Fn(StoredCart) -> Result<StoredCart>,
    ) -> Result<()> {
        for _ in 0..MAX_TXN_ATTEMPTS {
            let doc = self.store.get(collections::CARTS, cart_id).await?;
            let (cart, precondition) = match doc {
                Some(doc) => (
                    StoredCart::from_data(&doc.data),
                    Precondition::Revision(doc.revision),
                ),
                None if create_missing => (StoredCart::default(), Precondition::MustNotExist),
                None => {
                    return Err(AppError::NotFound("Carrito no encontrado.".to_owned()));
                }
            };

            let next = mutate(cart)?;
            match self
                .store
                .put(
                    collections::CARTS,
                    cart_id,
                    next.to_data(Utc::now()),
                    precondition,
                )
                .await
            {
                Ok(()) => return Ok(()),
                Err(StoreError::PreconditionFailed) => {}
                Err(error) => return Err(error.into()),
            }
        }
        Err(contention_error(cart_id))
    }

    async fn read_cart(&self, cart_id: &str) -> Result<Option<StoredCart>> {
        Ok(self
            .store
            .get(collections::CARTS, cart_id)
            .await?
            .map(|doc| StoredCart::from_data(&doc.data)))
    }

    async fn write_empty_cart(&self, cart_id: &str) -> Result<()> {
        match self
            .store
            .put(
                collections::CARTS,
                cart_id,
                StoredCart::default().to_data(Utc::now()),
                Precondition::MustNotExist,
            )
            .await
        {
            // Lost a creation race: the cart exists now, which is what the
            // caller wanted.
            Ok(()) | Err(StoreError::PreconditionFailed) => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    async fn require_product(&self, product_id: &str) -> Result<Product> {
        self.catalog
            .get_product_by_id(&product_id.into())
            .await?
            .ok_or_else(|| AppError::NotFound("Producto no encontrado.".to_owned()))
    }

    async fn hydrate(&self, items: &[StoredLine]) -> Result<Vec<CartItem>> {
        let mut hydrated = Vec::with_capacity(items.len());
        for line in items {
            let Some(product) = self
                .catalog
                .get_product_by_id(&line.product_id.as_str().into())
                .await?
            else {
                continue;
            };
            hydrated.push(serialize_cart_item(
                &product,
                line.quantity,
                line.selected_measure.as_ref(),
            ));
        }
        Ok(hydrated)
    }
}

fn contention_error(cart_id: &str) -> AppError {
    AppError::Internal(format!(
        "cart {cart_id}: write contention, giving up after {MAX_TXN_ATTEMPTS} attempts"
    ))
}

fn ensure_id<'a>(id: &'a str, message: &str) -> Result<&'a str> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(message.to_owned()));
    }
    Ok(trimmed)
}

/// Parse a quantity from a JSON number or numeric string. Must be a strictly
/// positive integer; fractional values are rejected, not truncated.
#[allow(clippy::cast_possible_truncation)]
fn normalize_quantity(value: &Value) -> Result<i64> {
    let invalid = || AppError::Validation("La cantidad debe ser un entero mayor a 0.".to_owned());

    let quantity = match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|float| float.fract() == 0.0 && float.is_finite())
                    .map(|float| float as i64)
            })
            .ok_or_else(invalid)?,
        Value::String(text) => {
            let trimmed = text.trim();
            trimmed.parse::<i64>().map_err(|_| invalid())?
        }
        _ => return Err(invalid()),
    };

    if quantity <= 0 {
        return Err(invalid());
    }
    Ok(quantity)
}

/// Measure rules for adding to the cart: a supplied measure must be one of
/// the product's options, and a product that has options requires one.
fn ensure_measure_valid(product: &Product, measure: Option<&Measure>) -> Result<()> {
    if let Some(measure) = measure {
        if !product
            .medidas
            .iter()
            .any(|option| option == measure.as_str())
        {
            return Err(AppError::Validation(
                "El talle seleccionado no existe para este producto.".to_owned(),
            ));
        }
    } else if !product.medidas.is_empty() {
        return Err(AppError::Validation(
            "Debes seleccionar un talle antes de agregar.".to_owned(),
        ));
    }
    Ok(())
}
