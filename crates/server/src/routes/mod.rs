//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                  - Health check
//!
//! # Categories
//! GET    /api/categorias                        - List categories
//! GET    /api/categorias/con-productos          - Categories with products
//! GET    /api/categorias/categoria/{nombre}     - Products of a category (slug or name)
//! GET    /api/categorias/{id}                   - Category detail
//! POST   /api/categorias                        - Create category (admin)
//! PUT    /api/categorias/{id}                   - Update category (admin)
//! DELETE /api/categorias/{id}                   - Delete category (admin)
//!
//! # Products
//! GET    /api/productos?limit&offset            - Product page (newest first)
//! GET    /api/productos/all                     - Every product
//! GET    /api/productos/search?search=          - Name substring search
//! GET    /api/productos/tag/{tag}               - Products by tag
//! GET    /api/productos/{id}                    - Product detail
//! GET    /api/productos/{id}/stock              - Stock only
//! POST   /api/productos                         - Create product (admin, JSON or multipart)
//! PUT    /api/productos/{id}                    - Update product (admin, JSON or multipart)
//! DELETE /api/productos/{id}                    - Delete product (admin)
//!
//! # Cart
//! GET    /api/carrito/{id_carrito}              - Hydrated cart items
//! POST   /api/carrito/{id_carrito}              - Add/merge a line (201)
//! PUT    /api/carrito/{id_carrito}/{id_producto} - Set line quantity
//! DELETE /api/carrito/{id_carrito}/{id_producto} - Remove line (idempotent)
//!
//! # Session
//! GET  /api/session/start-session               - Fresh session id, nothing persisted
//! POST /api/session/crear                       - Create cart with generated id
//! POST /api/session/guardar                     - Register client-supplied cart id (201)
//! GET  /api/session/verificar/{id_carrito}      - Does the cart exist
//!
//! # Orders and checkout
//! POST /api/ordenes/{id_user}                   - Create order (201)
//! GET  /api/ordenes/{id_user}                   - List a user's orders
//! GET  /api/ordenes/detalles/{id_orden}         - Order lines
//! POST /api/checkout                            - Persist checkout form (201)
//! ```
//!
//! Admin-gated routes require `Authorization: Bearer <ADMIN_API_KEY>`.

pub mod cart;
pub mod categories;
pub mod orders;
pub mod products;
pub mod session;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Create the full API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/categorias", category_routes())
        .nest("/api/productos", product_routes())
        .nest("/api/carrito", cart_routes())
        .nest("/api/session", session_routes())
        .nest("/api/ordenes", order_routes())
        .route("/api/checkout", post(orders::create_checkout))
}

fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::list).post(categories::create))
        .route("/con-productos", get(categories::list_with_products))
        .route("/categoria/{nombre}", get(categories::products_by_category))
        .route(
            "/{id}",
            get(categories::get_by_id)
                .put(categories::update)
                .delete(categories::delete),
        )
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::list).post(products::create))
        .route("/all", get(products::list_all))
        .route("/search", get(products::search))
        .route("/tag/{tag}", get(products::by_tag))
        .route(
            "/{id}",
            get(products::get_by_id)
                .put(products::update)
                .delete(products::delete),
        )
        .route("/{id}/stock", get(products::stock))
}

fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/{id_carrito}", get(cart::get_items).post(cart::add_item))
        .route(
            "/{id_carrito}/{id_producto}",
            put(cart::replace_item).delete(cart::remove_item),
        )
}

fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/start-session", get(session::start))
        .route("/crear", post(session::create))
        .route("/guardar", post(session::save))
        .route("/verificar/{id_carrito}", get(session::verify))
}

fn order_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/{id_user}",
            get(orders::list_by_user).post(orders::create),
        )
        .route("/detalles/{id_orden}", get(orders::details))
}
