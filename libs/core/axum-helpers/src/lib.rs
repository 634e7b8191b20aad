//! # Axum Helpers
//!
//! Shared HTTP plumbing for the catalog service.
//!
//! - **[`errors`]**: `AppError` and the JSON error envelope
//! - **[`extractors`]**: `ValidatedJson`
//! - **[`auth`]**: JWT verification, optional auth middleware, `CurrentUser`
//! - **[`server`]**: router assembly with OpenAPI UIs, health checks, graceful shutdown
//! - **[`http`]**: CORS and security headers
//! - **[`audit`]**: audit events for mutations

pub mod audit;
pub mod auth;
pub mod errors;
pub mod extractors;
pub mod http;
pub mod server;

pub use audit::{AuditEvent, AuditOutcome};
pub use auth::{CurrentUser, JwtAuth, JwtClaims, JwtConfig, optional_jwt_auth_middleware};
pub use errors::{AppError, ErrorCode, ErrorResponse};
pub use extractors::ValidatedJson;
pub use server::{create_production_app, create_router, health_router, run_health_checks};
