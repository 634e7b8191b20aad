use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use axum_helpers::{
    AuditEvent, AuditOutcome, CurrentUser, ErrorResponse, ValidatedJson,
    errors::responses::{
        BadGatewayResponse, BadRequestResponse, BadRequestValidationResponse, ForbiddenResponse,
        InternalServerErrorResponse, NotFoundResponse, UnauthorizedResponse,
        UnprocessableEntityResponse,
    },
};
use serde_json::json;
use std::sync::Arc;
use utoipa::OpenApi;

use crate::authz::{Actor, Capability, authorize};
use crate::error::{ProductError, ProductResult};
use crate::forms::{ProductForm, ProductRequest};
use crate::models::{
    CreateProduct, CreateVariant, DeleteConfirmation, Product, ProductQuery, ProductUploadForm,
    UpdateProduct, Variant,
};
use crate::repository::ProductRepository;
use crate::service::ProductService;

pub const TAG: &str = "products";

/// Uploads of up to three images must fit in this.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// OpenAPI documentation for the Products API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_products,
        create_product,
        get_product,
        update_product,
        delete_product,
        add_variant,
    ),
    components(
        schemas(
            Product,
            Variant,
            CreateProduct,
            UpdateProduct,
            CreateVariant,
            ProductUploadForm,
            DeleteConfirmation,
            ErrorResponse
        ),
        responses(
            NotFoundResponse,
            BadRequestResponse,
            BadRequestValidationResponse,
            UnauthorizedResponse,
            ForbiddenResponse,
            UnprocessableEntityResponse,
            BadGatewayResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = TAG, description = "Product catalog: products, images and variants")
    )
)]
pub struct ApiDoc;

/// Create the product router with all HTTP endpoints
pub fn router<R: ProductRepository + 'static>(service: ProductService<R>) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/{id}/variants", post(add_variant))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(shared_service)
}

fn audit<T>(
    actor: &Actor,
    action: &str,
    product_id: Option<i32>,
    headers: &HeaderMap,
    result: &ProductResult<T>,
) {
    let outcome = match result {
        Ok(_) => AuditOutcome::Success,
        Err(ProductError::Forbidden { .. }) => AuditOutcome::Denied,
        Err(_) => AuditOutcome::Failure,
    };

    let mut event = AuditEvent::new(
        Some(actor.id.clone()),
        action,
        product_id.map(|id| format!("product:{id}")),
        outcome,
    )
    .with_request(headers);

    if let Err(err) = result {
        event = event.with_details(json!({ "error": err.to_string() }));
    }
    event.log();
}

/// Non-admins are turned away before the body is parsed.
async fn read_form(actor: &Actor, multipart: Multipart) -> ProductResult<ProductForm> {
    authorize(actor, Capability::ManageCatalog)?;
    ProductForm::read(multipart).await
}

/// List products with optional filters, sorting and pagination
#[utoipa::path(
    get,
    path = "",
    tag = TAG,
    params(ProductQuery),
    responses(
        (status = 200, description = "Matching products", body = Vec<Product>),
        (status = 422, response = UnprocessableEntityResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_products<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    Query(query): Query<ProductQuery>,
) -> ProductResult<Json<Vec<Product>>> {
    let products = service.list_products(query).await?;
    Ok(Json(products))
}

/// Create a product from JSON or from a multipart form with images
#[utoipa::path(
    post,
    path = "",
    tag = TAG,
    request_body(
        content(
            (CreateProduct = "application/json"),
            (ProductUploadForm = "multipart/form-data")
        )
    ),
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 502, response = BadGatewayResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn create_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    CurrentUser(claims): CurrentUser,
    headers: HeaderMap,
    payload: ProductRequest<CreateProduct>,
) -> ProductResult<impl IntoResponse> {
    let actor = Actor::from(claims);

    let result = match payload {
        ProductRequest::Json(input) => service.create_product(&actor, input).await,
        ProductRequest::Multipart(multipart) => match read_form(&actor, multipart).await {
            Ok(form) => {
                service
                    .create_product_with_images(&actor, form.fields, form.images)
                    .await
            }
            Err(err) => Err(err),
        },
    };

    audit(
        &actor,
        "product.create",
        result.as_ref().ok().map(|p| p.id),
        &headers,
        &result,
    );
    Ok((StatusCode::CREATED, Json(result?)))
}

/// Get a product by ID, variants included
#[utoipa::path(
    get,
    path = "/{id}",
    tag = TAG,
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product found", body = Product),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    Path(id): Path<i32>,
) -> ProductResult<Json<Product>> {
    let product = service.get_product(id).await?;
    Ok(Json(product))
}

/// Update a product
///
/// JSON bodies are partial updates. Multipart forms replace every field and
/// append new images to those listed in `existing_images_json`.
#[utoipa::path(
    put,
    path = "/{id}",
    tag = TAG,
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    request_body(
        content(
            (UpdateProduct = "application/json"),
            (ProductUploadForm = "multipart/form-data")
        )
    ),
    responses(
        (status = 200, description = "Product updated", body = Product),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 502, response = BadGatewayResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn update_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    CurrentUser(claims): CurrentUser,
    Path(id): Path<i32>,
    headers: HeaderMap,
    payload: ProductRequest<UpdateProduct>,
) -> ProductResult<Json<Product>> {
    let actor = Actor::from(claims);

    let result = match payload {
        ProductRequest::Json(input) => service.update_product(&actor, id, input).await,
        ProductRequest::Multipart(multipart) => match read_form(&actor, multipart).await {
            Ok(form) => {
                service
                    .update_product_with_images(
                        &actor,
                        id,
                        form.fields,
                        form.images,
                        &form.existing_images_json,
                    )
                    .await
            }
            Err(err) => Err(err),
        },
    };

    audit(&actor, "product.update", Some(id), &headers, &result);
    Ok(Json(result?))
}

/// Delete a product and its variants
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = TAG,
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product deleted", body = DeleteConfirmation),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn delete_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    CurrentUser(claims): CurrentUser,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> ProductResult<Json<DeleteConfirmation>> {
    let actor = Actor::from(claims);

    let result = service.delete_product(&actor, id).await;

    audit(&actor, "product.delete", Some(id), &headers, &result);
    Ok(Json(result?))
}

/// Attach a variant to an existing product
#[utoipa::path(
    post,
    path = "/{id}/variants",
    tag = TAG,
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    request_body = CreateVariant,
    responses(
        (status = 201, description = "Variant created", body = Variant),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn add_variant<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    CurrentUser(claims): CurrentUser,
    Path(id): Path<i32>,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<CreateVariant>,
) -> ProductResult<impl IntoResponse> {
    let actor = Actor::from(claims);

    let result = service.add_variant(&actor, id, input).await;

    audit(&actor, "product.variant.create", Some(id), &headers, &result);
    Ok((StatusCode::CREATED, Json(result?)))
}
