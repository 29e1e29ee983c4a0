/// Profile and search handlers
use actix_middleware::AuthenticatedUser;
use actix_web::{web, HttpResponse};
use error_types::ApiResponse;
use serde::Deserialize;
use validator::Validate;

use crate::domain::ProfileUpdate;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 2048, message = "must be at most 2048 characters"))]
    pub profile_pic: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn me(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let profile = state.users.get_profile(user.email()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(profile)))
}

pub async fn update_me(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    payload: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let payload = payload.into_inner();
    let updated = state
        .users
        .update_profile(
            user.email(),
            ProfileUpdate {
                name: payload.name,
                profile_pic: payload.profile_pic,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(updated)))
}

pub async fn profile(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let profile = state.users.get_profile(&path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(profile)))
}

pub async fn search(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, AppError> {
    let results = state.users.search(user.email(), &query.q).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(results)))
}
