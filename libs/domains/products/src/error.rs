use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use sea_orm::DbErr;
use thiserror::Error;

use crate::images::UploadError;

/// Message returned whenever a product id does not resolve.
pub const NOT_FOUND_MESSAGE: &str = "Producto no encontrado";

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("Product not found: {0}")]
    NotFound(i32),

    #[error("Actor {actor} lacks the {capability} capability")]
    Forbidden { actor: String, capability: String },

    #[error("Ya existe un producto con el SKU: {0}")]
    DuplicateSku(String),

    #[error("Se pueden subir como máximo {max} imágenes.")]
    TooManyImages { max: usize },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Image upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

pub type ProductResult<T> = Result<T, ProductError>;

impl From<validator::ValidationErrors> for ProductError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ProductError::Validation(errors.to_string())
    }
}

impl From<ProductError> for AppError {
    fn from(err: ProductError) -> Self {
        match err {
            ProductError::NotFound(_) => AppError::NotFound(NOT_FOUND_MESSAGE.to_string()),
            ProductError::Forbidden { .. } => {
                AppError::Forbidden("Administrator privileges required".to_string())
            }
            ProductError::DuplicateSku(_)
            | ProductError::TooManyImages { .. }
            | ProductError::Validation(_) => AppError::BadRequest(err.to_string()),
            ProductError::InvalidQuery(msg) => AppError::UnprocessableEntity(msg),
            ProductError::Upload(e) => AppError::BadGateway(e.to_string()),
            ProductError::Database(e) => AppError::Database(e),
        }
    }
}

impl IntoResponse for ProductError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}
