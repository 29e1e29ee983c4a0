//! # Actix Middleware Library
//!
//! Middleware components shared by reel Actix services
//!
//! ## Modules
//! - `jwt_auth`: bearer token authentication middleware and identity extractor
//! - `correlation_id`: request correlation ids
//! - `logging`: structured request/response logging

pub mod correlation_id;
pub mod jwt_auth;
pub mod logging;

pub use correlation_id::{get_correlation_id, CorrelationId, CorrelationIdMiddleware};
pub use jwt_auth::{AuthenticatedUser, JwtAuthMiddleware};
pub use logging::Logging;
