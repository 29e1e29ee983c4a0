/// Follow graph handlers
use actix_middleware::AuthenticatedUser;
use actix_web::{web, HttpResponse};
use error_types::ApiResponse;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::FollowAction;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct FollowRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub target: String,
}

#[derive(Debug, Serialize)]
pub struct FollowResponse {
    pub action: FollowAction,
}

pub async fn toggle_follow(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    payload: web::Json<FollowRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let action = state.follows.toggle(user.email(), &payload.target).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(FollowResponse { action })))
}

pub async fn followers(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let profiles = state.follows.followers(&path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(profiles)))
}

pub async fn following(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let profiles = state.follows.following(&path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(profiles)))
}
