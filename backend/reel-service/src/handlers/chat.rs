/// Contact list and direct message handlers
use actix_middleware::AuthenticatedUser;
use actix_web::{web, HttpResponse};
use error_types::ApiResponse;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    pub to: String,
    #[validate(length(max = 5000, message = "must be at most 5000 characters"))]
    pub content: String,
}

pub async fn contacts(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let contacts = state.contacts.list_chat_contacts(user.email()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(contacts)))
}

pub async fn send_message(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    payload: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let message = state
        .messages
        .send_message(user.email(), &payload.to, &payload.content)
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(message)))
}

pub async fn conversation(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let thread = state.messages.fetch_conversation(user.email(), &path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(thread)))
}
