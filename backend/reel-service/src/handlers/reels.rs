/// Reel registration, feed and counter handlers
use actix_middleware::AuthenticatedUser;
use actix_web::{web, HttpResponse};
use error_types::ApiResponse;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterReelRequest {
    #[validate(length(max = 200, message = "must be at most 200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 2048, message = "must be 1-2048 characters"))]
    pub file: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReelRef {
    #[validate(length(min = 1, message = "is required"))]
    pub file: String,
}

#[derive(Debug, Serialize)]
pub struct LikesResponse {
    pub likes: i64,
}

#[derive(Debug, Serialize)]
pub struct ViewsResponse {
    pub views: i64,
}

pub async fn register(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    payload: web::Json<RegisterReelRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let post = state
        .reels
        .register(user.email(), payload.title.as_deref(), &payload.file)
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(post)))
}

pub async fn feed(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let items = state.reels.feed().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(items)))
}

pub async fn like(
    state: web::Data<AppState>,
    payload: web::Json<ReelRef>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let likes = state.counters.increment_like(&payload.file).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(LikesResponse { likes })))
}

pub async fn view(
    state: web::Data<AppState>,
    payload: web::Json<ReelRef>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let views = state.counters.increment_view(&payload.file).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(ViewsResponse { views })))
}
