//! Cart behavior through the HTTP API: line identity, stock gating,
//! replace/remove semantics, and hydration against the live catalog.

use axum::http::StatusCode;
use serde_json::{Value, json};
use tienda_integration_tests::{app, seed_category, seed_product, send, test_state};

async fn seed_shirt(router: &axum::Router, stock: i64, medidas: &[&str]) -> String {
    let category_id = seed_category(router, "Ropa").await;
    seed_product(
        router,
        &json!({
            "nombre": "Remera",
            "precio": 100.0,
            "id_categoria": category_id,
            "stock": stock,
            "tipo_medida": if medidas.is_empty() { "none" } else { "ropa" },
            "medidas": medidas,
        }),
    )
    .await
}

async fn add(
    router: &axum::Router,
    cart: &str,
    product: &str,
    cantidad: i64,
    medida: Option<&str>,
) -> (StatusCode, Value) {
    let mut body = json!({ "id_producto": product, "cantidad": cantidad });
    if let Some(medida) = medida {
        body["medida_seleccionada"] = Value::from(medida);
    }
    send(router, "POST", &format!("/api/carrito/{cart}"), Some(&body), None).await
}

#[tokio::test]
async fn add_creates_cart_and_merges_same_line() {
    let state = test_state();
    let router = app(&state);
    let product = seed_shirt(&router, 10, &["S", "M"]).await;

    let (status, body) = add(&router, "cart-1", &product, 2, Some("M")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    // Same product and measure merges into one line.
    let (status, body) = add(&router, "cart-1", &product, 3, Some("M")).await;
    assert_eq!(status, StatusCode::CREATED);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["cantidad"], 5);
    assert_eq!(items[0]["medida_seleccionada"], "M");
    assert_eq!(items[0]["clave"], format!("{product}::M"));

    // The mutation response reflects stored state: a fresh read agrees.
    let (_, fresh) = send(&router, "GET", "/api/carrito/cart-1", None, None).await;
    assert_eq!(fresh.as_array().unwrap()[0]["cantidad"], 5);
}

#[tokio::test]
async fn different_measures_are_distinct_lines() {
    let state = test_state();
    let router = app(&state);
    let product = seed_shirt(&router, 10, &["S", "M"]).await;

    add(&router, "cart-1", &product, 1, Some("S")).await;
    let (_, body) = add(&router, "cart-1", &product, 2, Some("M")).await;
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
}

#[tokio::test]
async fn measures_share_the_product_stock_pool() {
    let state = test_state();
    let router = app(&state);
    let product = seed_shirt(&router, 5, &["S", "M"]).await;

    let (status, _) = add(&router, "cart-1", &product, 3, Some("S")).await;
    assert_eq!(status, StatusCode::CREATED);

    // 3 (S) + 3 (M) would exceed the stock of 5.
    let (status, body) = add(&router, "cart-1", &product, 3, Some("M")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "No hay stock suficiente para este producto.");

    // The failed add left the cart untouched.
    let (_, items) = send(&router, "GET", "/api/carrito/cart-1", None, None).await;
    assert_eq!(items.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_adds_cannot_oversell() {
    let state = test_state();
    let router = app(&state);
    let product = seed_shirt(&router, 3, &[]).await;

    // Two racing adds of 2 units against a stock of 3. Whichever order the
    // writes land in, the loser either loses the revision race and retries
    // into the stock check, or sees the committed quantity directly. Exactly
    // one may commit.
    let (first, second) = tokio::join!(
        add(&router, "cart-1", &product, 2, None),
        add(&router, "cart-1", &product, 2, None),
    );

    let statuses = [first.0, second.0];
    assert!(statuses.contains(&StatusCode::CREATED), "{statuses:?}");
    assert!(statuses.contains(&StatusCode::CONFLICT), "{statuses:?}");

    let (_, items) = send(&router, "GET", "/api/carrito/cart-1", None, None).await;
    let total: i64 = items
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["cantidad"].as_i64().unwrap())
        .sum();
    assert_eq!(total, 2);
}

#[tokio::test]
async fn add_validates_product_measure_and_quantity() {
    let state = test_state();
    let router = app(&state);
    let product = seed_shirt(&router, 5, &["S", "M"]).await;

    let (status, body) = add(&router, "c", "missing-product", 1, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Producto no encontrado.");

    let (status, body) = add(&router, "c", &product, 1, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Debes seleccionar un talle antes de agregar.");

    let (status, body) = add(&router, "c", &product, 1, Some("XL")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "El talle seleccionado no existe para este producto."
    );

    let (status, body) = add(&router, "c", &product, 0, Some("M")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "La cantidad debe ser un entero mayor a 0.");
}

#[tokio::test]
async fn replace_sets_quantity_and_excludes_its_own_line_from_stock() {
    let state = test_state();
    let router = app(&state);
    let product = seed_shirt(&router, 5, &["S", "M"]).await;

    add(&router, "cart-1", &product, 2, Some("S")).await;
    add(&router, "cart-1", &product, 2, Some("M")).await;

    // 2 (S) + 3 (M) = 5 fits exactly; the old M quantity does not count.
    let (status, body) = send(
        &router,
        "PUT",
        &format!("/api/carrito/cart-1/{product}"),
        Some(&json!({ "cantidad": 3, "medida_seleccionada": "M" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    let m_line = items
        .iter()
        .find(|item| item["medida_seleccionada"] == "M")
        .unwrap();
    assert_eq!(m_line["cantidad"], 3);

    // One more would exceed the pool.
    let (status, body) = send(
        &router,
        "PUT",
        &format!("/api/carrito/cart-1/{product}"),
        Some(&json!({ "cantidad": 4, "medida_seleccionada": "M" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "No hay stock suficiente para este producto.");
}

#[tokio::test]
async fn replace_requires_cart_and_line() {
    let state = test_state();
    let router = app(&state);
    let category_id = seed_category(&router, "Ropa").await;
    let in_cart = seed_product(
        &router,
        &json!({
            "nombre": "Remera",
            "precio": 100.0,
            "id_categoria": category_id,
            "stock": 5,
            "tipo_medida": "none",
        }),
    )
    .await;
    let not_in_cart = seed_product(
        &router,
        &json!({
            "nombre": "Pantalon",
            "precio": 200.0,
            "id_categoria": category_id,
            "stock": 5,
            "tipo_medida": "none",
        }),
    )
    .await;

    let (status, body) = send(
        &router,
        "PUT",
        &format!("/api/carrito/no-cart/{in_cart}"),
        Some(&json!({ "cantidad": 1 })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Carrito no encontrado.");

    add(&router, "cart-1", &in_cart, 1, None).await;

    // A real product with no line in the cart fails at the line level.
    let (status, body) = send(
        &router,
        "PUT",
        &format!("/api/carrito/cart-1/{not_in_cart}"),
        Some(&json!({ "cantidad": 1 })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "El producto no existe en el carrito.");

    // A product missing from the catalog entirely fails before the cart is
    // ever read.
    let (status, body) = send(
        &router,
        "PUT",
        "/api/carrito/cart-1/ghost-product",
        Some(&json!({ "cantidad": 1 })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Producto no encontrado.");
}

#[tokio::test]
async fn remove_is_idempotent() {
    let state = test_state();
    let router = app(&state);
    let product = seed_shirt(&router, 5, &[]).await;

    add(&router, "cart-1", &product, 2, None).await;

    let uri = format!("/api/carrito/cart-1/{product}");
    let (status, body) = send(&router, "DELETE", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Producto eliminado del carrito");

    // Removing again, or from a cart that never existed, still succeeds.
    let (status, _) = send(&router, "DELETE", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&router, "DELETE", "/api/carrito/ghost/whatever", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, items) = send(&router, "GET", "/api/carrito/cart-1", None, None).await;
    assert!(items.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn missing_cart_reads_as_empty() {
    let state = test_state();
    let router = app(&state);

    let (status, items) = send(&router, "GET", "/api/carrito/never-created", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(items.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn lines_of_deleted_products_are_dropped_on_read() {
    let state = test_state();
    let router = app(&state);
    let product = seed_shirt(&router, 5, &[]).await;

    add(&router, "cart-1", &product, 2, None).await;
    let (status, _) = send(
        &router,
        "DELETE",
        &format!("/api/productos/{product}"),
        None,
        Some(tienda_integration_tests::ADMIN_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, items) = send(&router, "GET", "/api/carrito/cart-1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(items.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn hydrated_items_carry_live_product_fields() {
    let state = test_state();
    let router = app(&state);
    let product = seed_shirt(&router, 5, &[]).await;

    add(&router, "cart-1", &product, 2, None).await;
    let (_, items) = send(&router, "GET", "/api/carrito/cart-1", None, None).await;
    let item = &items.as_array().unwrap()[0];
    assert_eq!(item["nombre"], "Remera");
    assert_eq!(item["precio"], 100.0);
    assert_eq!(item["stock"], 5);
    assert_eq!(item["cantidad"], 2);
    assert_eq!(item["medida_seleccionada"], Value::Null);
}
