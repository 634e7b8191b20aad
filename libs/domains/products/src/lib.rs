//! Products Domain
//!
//! Product catalog over PostgreSQL: filtered listing, admin-only mutations,
//! variants, and image uploads to an external host.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints (JSON or multipart)
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐      ┌───────────────┐
//! │   Service   │ ───► │ ImageUploader │  ← Cloudinary in production
//! └──────┬──────┘      └───────────────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← Data access (trait + Postgres / in-memory)
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Entity    │  ← Sea-ORM models for productos / variantes_producto
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use domain_products::{
//!     handlers, CloudinaryConfig, CloudinaryUploader, PgProductRepository, ProductService,
//! };
//! use sea_orm::DatabaseConnection;
//!
//! # fn example(db: DatabaseConnection, cloudinary: CloudinaryConfig) {
//! let repository = PgProductRepository::new(db);
//! let service = ProductService::new(repository, Arc::new(CloudinaryUploader::new(cloudinary)));
//!
//! let router = handlers::router(service);
//! # }
//! ```

pub mod authz;
pub mod entity;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod images;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use authz::{Actor, Authorized, Capability, authorize};
pub use error::{ProductError, ProductResult};
pub use handlers::ApiDoc;
pub use images::{CloudinaryConfig, CloudinaryUploader, ImagePayload, ImageUploader, UploadError};
pub use models::{
    CreateProduct, CreateVariant, DeleteConfirmation, NewProduct, Product, ProductChanges,
    ProductFields, ProductFilter, ProductQuery, ProductSort, UpdateProduct, Variant,
};
pub use postgres::PgProductRepository;
pub use repository::{InMemoryProductRepository, ProductRepository};
pub use service::ProductService;
