//! Products API routes

use axum::Router;
use domain_products::{CloudinaryUploader, PgProductRepository, ProductService, handlers};
use std::sync::Arc;

use crate::state::AppState;

/// Create products router
pub fn router(state: &AppState) -> Router {
    let repository = PgProductRepository::new(state.db.clone());
    let uploader = CloudinaryUploader::new(state.config.cloudinary.clone());
    let service = ProductService::new(repository, Arc::new(uploader));
    handlers::router(service)
}
