//! Catalog behavior through the HTTP API: category uniqueness and
//! referential rules, product listing/search/tag filters, and partial
//! product updates.

use axum::http::StatusCode;
use serde_json::json;
use tienda_integration_tests::{
    ADMIN_KEY, app, seed_category, seed_product, send, send_multipart, test_state,
};

fn multipart_product(boundary: &str, category_id: &str, file_content_type: &str) -> String {
    format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"nombre\"\r\n\r\nRemera\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"precio\"\r\n\r\n100\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"id_categoria\"\r\n\r\n{category_id}\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"stock\"\r\n\r\n5\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"tipo_medida\"\r\n\r\nnone\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"imagen\"; filename=\"archivo\"\r\n\
         Content-Type: {file_content_type}\r\n\r\n\
         contenido\r\n\
         --{boundary}--\r\n"
    )
}

#[tokio::test]
async fn category_names_and_slugs_are_unique_case_insensitively() {
    let state = test_state();
    let router = app(&state);
    seed_category(&router, "Ropa").await;

    let (status, body) = send(
        &router,
        "POST",
        "/api/categorias",
        Some(&json!({ "nombre_categoria": "ROPA" })),
        Some(ADMIN_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Ya existe una categoria con ese nombre o slug.");

    // Different name but colliding slug.
    let (status, _) = send(
        &router,
        "POST",
        "/api/categorias",
        Some(&json!({ "nombre_categoria": "Verano", "slug": "ropa" })),
        Some(ADMIN_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn category_slug_is_derived_from_name() {
    let state = test_state();
    let router = app(&state);

    let (status, body) = send(
        &router,
        "POST",
        "/api/categorias",
        Some(&json!({ "nombre_categoria": "Calzado Niño" })),
        Some(ADMIN_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["slug"], "calzado-nino");
    assert_eq!(body["nombre_categoria"], "Calzado Niño");
}

#[tokio::test]
async fn category_update_keeps_unsupplied_fields() {
    let state = test_state();
    let router = app(&state);
    let id = seed_category(&router, "Ropa").await;

    let (status, body) = send(
        &router,
        "PUT",
        &format!("/api/categorias/{id}"),
        Some(&json!({ "nombre_categoria": "Indumentaria" })),
        Some(ADMIN_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nombre_categoria"], "Indumentaria");
    // The stored slug survives a rename.
    assert_eq!(body["slug"], "ropa");
}

#[tokio::test]
async fn category_delete_blocked_while_products_reference_it() {
    let state = test_state();
    let router = app(&state);
    let category_id = seed_category(&router, "Ropa").await;
    let product_id = seed_product(
        &router,
        &json!({
            "nombre": "Remera",
            "precio": 10,
            "id_categoria": category_id,
            "stock": 1,
        }),
    )
    .await;

    let uri = format!("/api/categorias/{category_id}");
    let (status, body) = send(&router, "DELETE", &uri, None, Some(ADMIN_KEY)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["error"],
        "No se puede eliminar la categoria porque tiene productos asociados."
    );

    let (status, _) = send(
        &router,
        "DELETE",
        &format!("/api/productos/{product_id}"),
        None,
        Some(ADMIN_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&router, "DELETE", &uri, None, Some(ADMIN_KEY)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn categories_with_products_groups_by_category() {
    let state = test_state();
    let router = app(&state);
    let ropa = seed_category(&router, "Ropa").await;
    let calzado = seed_category(&router, "Calzado").await;
    seed_product(
        &router,
        &json!({ "nombre": "Remera", "precio": 10, "id_categoria": ropa, "stock": 1 }),
    )
    .await;

    let (status, body) = send(&router, "GET", "/api/categorias/con-productos", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let groups = body.as_array().unwrap();
    assert_eq!(groups.len(), 2);

    // Sorted by name: Calzado first, empty.
    assert_eq!(groups[0]["id_categoria"], calzado);
    assert!(groups[0]["productos"].as_array().unwrap().is_empty());
    assert_eq!(groups[1]["productos"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn products_by_category_resolves_slug_then_name() {
    let state = test_state();
    let router = app(&state);
    let category_id = seed_category(&router, "Calzado Niño").await;
    seed_product(
        &router,
        &json!({ "nombre": "Zapatilla", "precio": 10, "id_categoria": category_id, "stock": 1 }),
    )
    .await;

    let (status, by_slug) = send(
        &router,
        "GET",
        "/api/categorias/categoria/calzado-nino",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_slug.as_array().unwrap().len(), 1);

    let (status, by_name) = send(
        &router,
        "GET",
        "/api/categorias/categoria/Calzado%20Ni%C3%B1o",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_name.as_array().unwrap().len(), 1);

    let (status, body) = send(&router, "GET", "/api/categorias/categoria/nada", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Categoria no encontrada.");
}

#[tokio::test]
async fn product_listing_pages_and_search() {
    let state = test_state();
    let router = app(&state);
    let category_id = seed_category(&router, "Ropa").await;
    for name in ["Remera Azul", "Remera Roja", "Pantalon"] {
        seed_product(
            &router,
            &json!({ "nombre": name, "precio": 10, "id_categoria": category_id, "stock": 1 }),
        )
        .await;
    }

    let (status, body) = send(&router, "GET", "/api/productos?limit=2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = send(&router, "GET", "/api/productos/all", None, None).await;
    assert_eq!(body.as_array().unwrap().len(), 3);

    // Junk limit/offset fall back to defaults instead of failing.
    let (status, body) = send(
        &router,
        "GET",
        "/api/productos?limit=abc&offset=-2",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (status, body) = send(
        &router,
        "GET",
        "/api/productos/search?search=remera",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = send(&router, "GET", "/api/productos/search", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Debe proporcionar un termino de busqueda.");
}

#[tokio::test]
async fn products_by_tag_matches_exactly() {
    let state = test_state();
    let router = app(&state);
    let category_id = seed_category(&router, "Ropa").await;
    seed_product(
        &router,
        &json!({ "nombre": "Remera", "precio": 10, "id_categoria": category_id,
                 "stock": 1, "tag": "Oferta" }),
    )
    .await;
    seed_product(
        &router,
        &json!({ "nombre": "Gorra", "precio": 10, "id_categoria": category_id, "stock": 1 }),
    )
    .await;

    let (status, body) = send(&router, "GET", "/api/productos/tag/oferta", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let products = body.as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["nombre"], "Remera");
}

#[tokio::test]
async fn product_partial_update_touches_only_supplied_fields() {
    let state = test_state();
    let router = app(&state);
    let category_id = seed_category(&router, "Ropa").await;
    let product_id = seed_product(
        &router,
        &json!({ "nombre": "Remera", "precio": 100, "id_categoria": category_id, "stock": 5 }),
    )
    .await;

    let uri = format!("/api/productos/{product_id}");
    let (status, body) = send(
        &router,
        "PUT",
        &uri,
        Some(&json!({ "stock": 9 })),
        Some(ADMIN_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stock"], 9);
    assert_eq!(body["nombre"], "Remera");
    assert_eq!(body["precio"], 100.0);

    let (status, body) = send(&router, "PUT", &uri, Some(&json!({})), Some(ADMIN_KEY)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No se enviaron datos para actualizar.");
}

#[tokio::test]
async fn product_create_requires_existing_category() {
    let state = test_state();
    let router = app(&state);

    let (status, body) = send(
        &router,
        "POST",
        "/api/productos",
        Some(&json!({ "nombre": "Remera", "precio": 10, "id_categoria": "ghost", "stock": 1 })),
        Some(ADMIN_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Categoria no encontrada.");
}

#[tokio::test]
async fn product_detail_and_stock_endpoints() {
    let state = test_state();
    let router = app(&state);
    let category_id = seed_category(&router, "Ropa").await;
    let product_id = seed_product(
        &router,
        &json!({ "nombre": "Remera", "precio": 10, "id_categoria": category_id, "stock": 7 }),
    )
    .await;

    let (status, body) = send(
        &router,
        "GET",
        &format!("/api/productos/{product_id}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id_producto"], product_id);

    let (status, body) = send(
        &router,
        "GET",
        &format!("/api/productos/{product_id}/stock"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stock"], 7);

    let (status, _) = send(&router, "GET", "/api/productos/ghost", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn multipart_uploads_must_be_images() {
    let state = test_state();
    let router = app(&state);
    let category_id = seed_category(&router, "Ropa").await;
    let boundary = "tienda-form-boundary";

    let (status, body) = send_multipart(
        &router,
        "POST",
        "/api/productos",
        boundary,
        multipart_product(boundary, &category_id, "text/plain"),
        Some(ADMIN_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "El archivo debe ser una imagen valida.");

    // The same form with a real image content type goes through.
    let (status, body) = send_multipart(
        &router,
        "POST",
        "/api/productos",
        boundary,
        multipart_product(boundary, &category_id, "image/png"),
        Some(ADMIN_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert!(body["imagen"].is_string());
}
