//! Bearer-token authentication.
//!
//! Tokens are HS256 JWTs signed with `JWT_SECRET`. The optional middleware
//! attaches verified [`JwtClaims`] to the request; handlers that require a
//! caller take the [`CurrentUser`] extractor, which rejects anonymous requests
//! with 401. Role checks stay with the domain that owns the operation.
//!
//! ```ignore
//! let auth = JwtAuth::new(&JwtConfig::from_env()?);
//! let app = domain_router
//!     .layer(axum::middleware::from_fn_with_state(auth, optional_jwt_auth_middleware));
//! ```

pub mod config;
pub mod current_user;
pub mod jwt;
pub mod middleware;

pub use config::JwtConfig;
pub use current_user::CurrentUser;
pub use jwt::{AuthError, JwtAuth, JwtClaims};
pub use middleware::optional_jwt_auth_middleware;
