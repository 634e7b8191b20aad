//! Handler tests for the Products domain
//!
//! These drive the products router end to end with `oneshot`, backed by the
//! in-memory repository, real HS256 tokens and a fake image host:
//! - JSON and multipart request bodies
//! - Authentication (401) and admin role checks (403)
//! - Status codes and the shared error envelope

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::middleware::from_fn_with_state;
use axum_helpers::{JwtAuth, JwtConfig, optional_jwt_auth_middleware};
use domain_products::*;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For oneshot()

const SECRET: &str = "handler-test-secret-with-at-least-32-chars";
const BOUNDARY: &str = "product-form-boundary";

/// Returns `https://cdn.test/<file name>` for every image.
struct FakeUploader;

#[async_trait]
impl ImageUploader for FakeUploader {
    async fn upload(&self, images: Vec<ImagePayload>) -> Result<Vec<String>, UploadError> {
        Ok(images
            .into_iter()
            .map(|image| format!("https://cdn.test/{}", image.file_name))
            .collect())
    }
}

struct TestApp {
    router: Router,
    auth: JwtAuth,
}

impl TestApp {
    fn new() -> Self {
        let auth = JwtAuth::new(&JwtConfig::new(SECRET).unwrap());
        let service = ProductService::new(InMemoryProductRepository::new(), Arc::new(FakeUploader));
        let router = handlers::router(service)
            .layer(from_fn_with_state(auth.clone(), optional_jwt_auth_middleware));
        Self { router, auth }
    }

    fn token(&self, role: &str) -> String {
        self.auth
            .create_access_token("user-1", "user@example.com", "Test User", &[role.to_string()])
            .unwrap()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn json(
        &self,
        method: &str,
        uri: &str,
        role: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(role) = role {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token(role)));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    async fn multipart(
        &self,
        method: &str,
        uri: &str,
        text: &[(&str, &str)],
        files: &[&str],
    ) -> (StatusCode, Value) {
        self.raw_multipart("admin", method, uri, multipart_body(text, files))
            .await
    }

    async fn raw_multipart(
        &self,
        role: &str,
        method: &str,
        uri: &str,
        body: String,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token(role)))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }
}

fn multipart_body(text: &[(&str, &str)], files: &[&str]) -> String {
    let mut body = String::new();
    for (name, value) in text {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    for file in files {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"images\"; filename=\"{file}\"\r\nContent-Type: image/png\r\n\r\nfake-png-bytes\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    body
}

fn product_json(sku: &str) -> Value {
    json!({
        "nombre": "Remera básica",
        "descripcion": "Algodón peinado",
        "precio": 10.0,
        "sku": sku,
        "stock": 5,
        "categoria_id": 1
    })
}

fn form_fields(sku: &'static str) -> Vec<(&'static str, &'static str)> {
    vec![
        ("nombre", "Buzo"),
        ("precio", "49.9"),
        ("sku", sku),
        ("stock", "3"),
        ("categoria_id", "2"),
        ("material", "Frisa"),
    ]
}

#[tokio::test]
async fn test_product_lifecycle() {
    let app = TestApp::new();

    let (status, created) = app
        .json("POST", "/", Some("admin"), Some(product_json("SKU-1")))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["sku"], "SKU-1");
    assert_eq!(created["variantes"], json!([]));
    assert_eq!(created["urls_imagenes"], json!([]));
    let id = created["id"].as_i64().unwrap();

    let (status, fetched) = app.json("GET", &format!("/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (status, updated) = app
        .json(
            "PUT",
            &format!("/{id}"),
            Some("admin"),
            Some(json!({ "precio": 15.99, "stock": 75 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["precio"], 15.99);
    assert_eq!(updated["stock"], 75);
    assert_eq!(updated["sku"], "SKU-1");
    assert_eq!(updated["descripcion"], "Algodón peinado");

    let (status, body) = app.json("DELETE", &format!("/{id}"), Some("admin"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Product deleted successfully" }));

    let (status, body) = app.json("GET", &format!("/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Producto no encontrado");
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_duplicate_sku_is_bad_request() {
    let app = TestApp::new();

    let (status, _) = app
        .json("POST", "/", Some("admin"), Some(product_json("SKU-DUP")))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .json("POST", "/", Some("admin"), Some(product_json("SKU-DUP")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Ya existe un producto con el SKU: SKU-DUP");
}

#[tokio::test]
async fn test_mutations_require_admin() {
    let app = TestApp::new();

    let (status, _) = app
        .json("POST", "/", None, Some(product_json("SKU-1")))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .json("POST", "/", Some("customer"), Some(product_json("SKU-1")))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");

    let (status, _) = app.json("DELETE", "/1", Some("customer"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_invalid_json_body_returns_field_details() {
    let app = TestApp::new();
    let mut payload = product_json("SKU-1");
    payload["precio"] = json!(-1);

    let (status, body) = app.json("POST", "/", Some("admin"), Some(payload)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert!(body["details"]["precio"].is_array());
}

#[tokio::test]
async fn test_list_filters_sorts_and_paginates() {
    let app = TestApp::new();
    for (sku, nombre, precio, color) in [
        ("SKU-A", "Camisa", 30.0, "Azul marino"),
        ("SKU-B", "Bermuda", 20.0, "azul"),
        ("SKU-C", "Abrigo", 80.0, "Negro"),
    ] {
        let mut payload = product_json(sku);
        payload["nombre"] = json!(nombre);
        payload["precio"] = json!(precio);
        payload["color"] = json!(color);
        let (status, _) = app.json("POST", "/", Some("admin"), Some(payload)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app.json("GET", "/?color=AZUL&sort_by=precio_asc", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let skus: Vec<_> = body.as_array().unwrap().iter().map(|p| p["sku"].clone()).collect();
    assert_eq!(skus, vec![json!("SKU-B"), json!("SKU-A")]);

    let (_, body) = app.json("GET", "/?precio=30", None, None).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = app
        .json("GET", "/?sort_by=nombre_asc&skip=1&limit=1", None, None)
        .await;
    assert_eq!(body[0]["nombre"], "Bermuda");

    let (status, _) = app.json("GET", "/?sort_by=whatever", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.json("GET", "/?limit=0", None, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "UNPROCESSABLE_ENTITY");

    let (status, _) = app.json("GET", "/?limit=101", None, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_multipart_create_uploads_images() {
    let app = TestApp::new();

    let (status, body) = app
        .multipart("POST", "/", &form_fields("SKU-M1"), &["front.png", "back.png"])
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["material"], "Frisa");
    assert_eq!(
        body["urls_imagenes"],
        json!(["https://cdn.test/front.png", "https://cdn.test/back.png"])
    );
}

#[tokio::test]
async fn test_multipart_create_rejects_four_images() {
    let app = TestApp::new();

    let (status, body) = app
        .multipart("POST", "/", &form_fields("SKU-M1"), &["1.png", "2.png", "3.png", "4.png"])
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Se pueden subir como máximo 3 imágenes.");
}

#[tokio::test]
async fn test_multipart_create_rejects_non_finite_price() {
    let app = TestApp::new();

    for precio in ["NaN", "inf", "-NaN"] {
        let mut fields = form_fields("SKU-NAN");
        fields[1] = ("precio", precio);

        let (status, body) = app.multipart("POST", "/", &fields, &[]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "precio={precio}");
        assert_eq!(body["error"], "BAD_REQUEST");
    }

    let (_, listed) = app.json("GET", "/", None, None).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn test_multipart_accepts_image_with_unparsable_content_type() {
    let app = TestApp::new();

    let mut body = String::new();
    for (name, value) in form_fields("SKU-MIME") {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"images\"; filename=\"a.png\"\r\nContent-Type: not a mime\r\n\r\nfake-png-bytes\r\n--{BOUNDARY}--\r\n"
    ));

    let (status, body) = app.raw_multipart("admin", "POST", "/", body).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["urls_imagenes"], json!(["https://cdn.test/a.png"]));
}

#[tokio::test]
async fn test_multipart_checks_role_before_reading_form() {
    let app = TestApp::new();
    let (_, created) = app
        .json("POST", "/", Some("admin"), Some(product_json("SKU-ROLE")))
        .await;
    let id = created["id"].as_i64().unwrap();

    // Missing every required field.
    let malformed = multipart_body(&[("nombre", "Buzo")], &[]);

    let (status, _) = app
        .raw_multipart("user", "POST", "/", malformed.clone())
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .raw_multipart("user", "PUT", &format!("/{id}"), malformed.clone())
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.raw_multipart("admin", "POST", "/", malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_multipart_update_merges_kept_and_new_images() {
    let app = TestApp::new();
    let (_, created) = app
        .multipart("POST", "/", &form_fields("SKU-M1"), &["front.png", "back.png"])
        .await;
    let id = created["id"].as_i64().unwrap();

    let mut fields = form_fields("SKU-M1");
    fields[0] = ("nombre", "Buzo canguro");
    fields.retain(|(name, _)| *name != "material");
    fields.push(("existing_images_json", r#"["https://cdn.test/back.png"]"#));

    let (status, body) = app
        .multipart("PUT", &format!("/{id}"), &fields, &["side.png"])
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nombre"], "Buzo canguro");
    // Full replace: omitted optional fields are cleared.
    assert_eq!(body["material"], Value::Null);
    assert_eq!(
        body["urls_imagenes"],
        json!(["https://cdn.test/back.png", "https://cdn.test/side.png"])
    );
}

#[tokio::test]
async fn test_multipart_update_rejects_malformed_existing_images() {
    let app = TestApp::new();
    let (_, created) = app
        .multipart("POST", "/", &form_fields("SKU-M1"), &[])
        .await;
    let id = created["id"].as_i64().unwrap();

    let mut fields = form_fields("SKU-M1");
    fields.push(("existing_images_json", "{not json"));

    let (status, _) = app.multipart("PUT", &format!("/{id}"), &fields, &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_missing_product_is_not_found() {
    let app = TestApp::new();

    let (status, body) = app
        .json("PUT", "/404", Some("admin"), Some(json!({ "stock": 1 })))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Producto no encontrado");
}

#[tokio::test]
async fn test_add_variant() {
    let app = TestApp::new();
    let (_, created) = app
        .json("POST", "/", Some("admin"), Some(product_json("SKU-V")))
        .await;
    let id = created["id"].as_i64().unwrap();

    let (status, variant) = app
        .json(
            "POST",
            &format!("/{id}/variants"),
            Some("admin"),
            Some(json!({ "tamanio": "XL", "color": "Verde", "cantidad_en_stock": 4 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(variant["producto_id"], id);

    let (_, product) = app.json("GET", &format!("/{id}"), None, None).await;
    assert_eq!(product["variantes"], json!([variant]));

    let (status, _) = app
        .json(
            "POST",
            "/999/variants",
            Some("admin"),
            Some(json!({ "tamanio": "S", "color": "Rojo", "cantidad_en_stock": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
