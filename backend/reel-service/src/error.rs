/// Error types for reel-service
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use error_types::{error_codes, ApiResponse, ErrorBody, ErrorKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Cannot follow yourself")]
    SelfFollow,

    #[error("Email is already registered")]
    EmailTaken,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Code has expired")]
    Expired,

    #[error("Invalid code")]
    CodeMismatch,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) | AppError::CodeMismatch => ErrorKind::Validation,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Auth(_) => ErrorKind::Auth,
            AppError::SelfFollow | AppError::EmailTaken | AppError::Conflict(_) => {
                ErrorKind::Conflict
            }
            AppError::Expired => ErrorKind::Expired,
            AppError::Database(_) | AppError::Redis(_) | AppError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => error_codes::VALIDATION_ERROR,
            AppError::NotFound(_) => error_codes::NOT_FOUND,
            AppError::Auth(_) => error_codes::INVALID_CREDENTIALS,
            AppError::SelfFollow => error_codes::SELF_FOLLOW,
            AppError::EmailTaken => error_codes::EMAIL_TAKEN,
            AppError::Conflict(_) => error_codes::CONFLICT,
            AppError::Expired => error_codes::CODE_EXPIRED,
            AppError::CodeMismatch => error_codes::CODE_MISMATCH,
            AppError::Database(_) => error_codes::DATABASE_ERROR,
            AppError::Redis(_) | AppError::Internal(_) => error_codes::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to clients; server-side detail stays in the logs.
    pub fn public_message(&self) -> String {
        if self.kind().is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody::new(self.kind(), self.code(), self.public_message())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let detail = errs
                    .iter()
                    .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .next()
                    .unwrap_or_else(|| "is invalid".to_string());
                format!("{field} {detail}")
            })
            .collect();
        fields.sort();
        AppError::Validation(fields.join(", "))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        if self.kind().is_server_error() {
            tracing::error!(error = %self, code = self.code(), "request failed");
        }
        HttpResponse::build(self.status_code()).json(ApiResponse::<()>::failure(self.body()))
    }
}

/// Result type alias for service operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ResponseError::status_code(&AppError::Validation("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ResponseError::status_code(&AppError::CodeMismatch),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ResponseError::status_code(&AppError::NotFound("user".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ResponseError::status_code(&AppError::Auth("bad".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ResponseError::status_code(&AppError::SelfFollow),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ResponseError::status_code(&AppError::EmailTaken),
            StatusCode::CONFLICT
        );
        assert_eq!(ResponseError::status_code(&AppError::Expired), StatusCode::GONE);
        assert_eq!(
            ResponseError::status_code(&AppError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn server_errors_hide_detail() {
        let resp = AppError::Internal("connection refused on 10.0.0.7".into()).error_response();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(value["status"], "error");
        assert_eq!(value["error"]["kind"], "internal");
        assert_eq!(value["error"]["message"], "Internal server error");
    }

    #[actix_web::test]
    async fn client_errors_carry_message() {
        let resp = AppError::SelfFollow.error_response();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(value["error"]["code"], "SELF_FOLLOW");
        assert_eq!(value["error"]["message"], "Cannot follow yourself");
    }
}
