use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::error::FieldErrors;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email/password")]
    InvalidCredentials,
    #[error("User not found")]
    UserNotFound,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Missing authorization header")]
    MissingAuthHeader,
    #[error("Invalid authorization header format")]
    InvalidAuthHeaderFormat,
    #[error("Wrong confirmation code")]
    WrongConfirmationCode,
    #[error("Invalid email format")]
    InvalidEmailFormat,
    #[error("This email is not associated to any profile")]
    EmailNotRegistered,
    #[error("Passwords do not match.")]
    PasswordMismatch,
    #[error("Invalid input")]
    Validation(FieldErrors),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("Password hashing error: {0}")]
    PasswordHashing(#[from] crate::auth::password::PasswordError),
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::WrongConfirmationCode
            | AuthError::InvalidEmailFormat
            | AuthError::EmailNotRegistered
            | AuthError::PasswordMismatch
            | AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::InvalidToken
            | AuthError::TokenExpired
            | AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeaderFormat
            | AuthError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AuthError::Database(_) | AuthError::PasswordHashing(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "Invalid credentials",
            AuthError::UserNotFound => "User not found",
            AuthError::InvalidToken => "Invalid token",
            AuthError::TokenExpired => "Token expired",
            AuthError::MissingAuthHeader => "Missing authorization header",
            AuthError::InvalidAuthHeaderFormat => "Invalid authorization header format",
            AuthError::WrongConfirmationCode => "Wrong confirmation code",
            AuthError::InvalidEmailFormat | AuthError::EmailNotRegistered => "Invalid email",
            AuthError::PasswordMismatch | AuthError::Validation(_) => "Validation failed",
            AuthError::Database(_) => "Database error",
            AuthError::Jwt(_) => "Token error",
            AuthError::PasswordHashing(_) => "Password processing error",
            AuthError::Internal(_) => "Internal server error",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            AuthError::Validation(fields) => json!({
                "error": self.kind(),
                "message": self.to_string(),
                "fields": fields,
            }),
            AuthError::Database(err) => {
                tracing::error!("Database error during authentication: {}", err);
                json!({ "error": self.kind(), "message": "Database error" })
            }
            AuthError::PasswordHashing(err) => {
                tracing::error!("Password hashing failed: {}", err);
                json!({ "error": self.kind(), "message": "Password processing error" })
            }
            AuthError::Internal(err) => {
                tracing::error!("Internal authentication error: {:#}", err);
                json!({ "error": self.kind(), "message": "Internal server error" })
            }
            _ => json!({ "error": self.kind(), "message": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<FieldErrors> for AuthError {
    fn from(fields: FieldErrors) -> Self {
        AuthError::Validation(fields)
    }
}
