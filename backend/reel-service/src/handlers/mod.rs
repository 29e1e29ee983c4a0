/// HTTP routing
use std::sync::Arc;

use actix_middleware::JwtAuthMiddleware;
use actix_web::{web, HttpResponse};
use crypto_core::JwtKeys;
use error_types::ApiResponse;
use serde::Serialize;

use crate::error::AppError;
use crate::metrics::metrics_handler;

pub mod auth;
pub mod chat;
pub mod reels;
pub mod social;
pub mod users;

/// Plain acknowledgement payload
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    service: &'static str,
    healthy: bool,
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success(HealthResponse {
        service: "reel-service",
        healthy: true,
    }))
}

/// Malformed bodies, queries and paths answer with the validation envelope
fn extractor_configs(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(64 * 1024)
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    );
}

/// Register every route. `/api/auth` is public except password change;
/// everything else under `/api` requires a bearer token.
pub fn configure(cfg: &mut web::ServiceConfig, jwt: Arc<JwtKeys>) {
    extractor_configs(cfg);

    cfg.route("/health", web::get().to(health))
        .route("/metrics", web::get().to(metrics_handler))
        .service(
            web::scope("/api/auth")
                .route("/otp/send", web::post().to(auth::send_login_code))
                .route("/otp/verify", web::post().to(auth::verify_login_code))
                .route("/signup", web::post().to(auth::signup))
                .route("/login", web::post().to(auth::login))
                .route("/password/forgot", web::post().to(auth::forgot_password))
                .route("/password/reset", web::post().to(auth::reset_password))
                .service(
                    web::resource("/password/change")
                        .wrap(JwtAuthMiddleware::new(jwt.clone()))
                        .route(web::post().to(auth::change_password)),
                ),
        )
        .service(
            web::scope("/api")
                .wrap(JwtAuthMiddleware::new(jwt))
                // Literal segments before `/users/{email}`
                .route("/users/me", web::get().to(users::me))
                .route("/users/me", web::put().to(users::update_me))
                .route("/users/search", web::get().to(users::search))
                .route("/users/{email}", web::get().to(users::profile))
                .route("/users/{email}/followers", web::get().to(social::followers))
                .route("/users/{email}/following", web::get().to(social::following))
                .route("/follow", web::post().to(social::toggle_follow))
                .route("/chat/contacts", web::get().to(chat::contacts))
                .route("/chat/messages", web::post().to(chat::send_message))
                .route("/chat/messages/{email}", web::get().to(chat::conversation))
                .route("/reels", web::post().to(reels::register))
                .route("/reels/feed", web::get().to(reels::feed))
                .route("/reels/like", web::post().to(reels::like))
                .route("/reels/view", web::post().to(reels::view)),
        );
}
