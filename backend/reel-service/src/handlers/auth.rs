/// Authentication handlers
use actix_middleware::AuthenticatedUser;
use actix_web::{web, HttpResponse};
use error_types::ApiResponse;
use serde::Deserialize;
use validator::Validate;

use super::MessageResponse;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SendCodeRequest {
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyCodeRequest {
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub code: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub name: String,
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub code: String,
    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    pub password: String,
}

pub async fn send_login_code(
    state: web::Data<AppState>,
    payload: web::Json<SendCodeRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    state.accounts.send_login_code(&payload.email).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(MessageResponse::new("Code sent"))))
}

pub async fn verify_login_code(
    state: web::Data<AppState>,
    payload: web::Json<VerifyCodeRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let session = state
        .accounts
        .verify_login_code(&payload.email, &payload.code)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(session)))
}

pub async fn signup(
    state: web::Data<AppState>,
    payload: web::Json<SignupRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let user = state
        .accounts
        .signup(&payload.name, &payload.email, &payload.password)
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(user)))
}

pub async fn login(
    state: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let session = state
        .accounts
        .password_login(&payload.email, &payload.password)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(session)))
}

pub async fn forgot_password(
    state: web::Data<AppState>,
    payload: web::Json<SendCodeRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    state.accounts.send_reset_code(&payload.email).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(MessageResponse::new(
        "Reset code sent",
    ))))
}

pub async fn reset_password(
    state: web::Data<AppState>,
    payload: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    state
        .accounts
        .reset_password(&payload.email, &payload.code, &payload.new_password)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(MessageResponse::new(
        "Password updated",
    ))))
}

pub async fn change_password(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    payload: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    state
        .accounts
        .change_password(user.email(), &payload.password)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(MessageResponse::new(
        "Password updated",
    ))))
}
