use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User account is deactivated")]
    UserDeactivated,

    #[error("Invalid or expired token")]
    TokenExpired,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Admin access required")]
    Forbidden,

    #[error("Password change required")]
    MustChangePassword,

    #[error("Password does not meet security requirements")]
    WeakPassword(Vec<String>),

    #[error("A user with this email already exists")]
    DuplicateEmail,

    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error("Invalid or expired reset token")]
    InvalidResetToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Download not found")]
    DownloadNotFound,

    #[error("File not found")]
    FileNotFound,

    #[error("No new quotes available for download")]
    NoNewQuotes,

    #[error("Not found")]
    NotFound,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Database(sqlx::Error::RowNotFound) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            // Concurrent inserts can slip past a pre-check and land on the
            // unique index; answer exactly like the pre-check would have.
            AppError::Database(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                (StatusCode::CONFLICT, "DUPLICATE_EMAIL")
            }
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            AppError::UserDeactivated => (StatusCode::UNAUTHORIZED, "USER_DEACTIVATED"),
            AppError::TokenExpired => (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::MustChangePassword => (StatusCode::FORBIDDEN, "MUST_CHANGE_PASSWORD"),
            AppError::WeakPassword(_) => (StatusCode::BAD_REQUEST, "WEAK_PASSWORD"),
            AppError::DuplicateEmail => (StatusCode::CONFLICT, "DUPLICATE_EMAIL"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::InvalidResetToken => (StatusCode::BAD_REQUEST, "INVALID_TOKEN"),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "USER_NOT_FOUND"),
            AppError::DownloadNotFound => (StatusCode::NOT_FOUND, "DOWNLOAD_NOT_FOUND"),
            AppError::FileNotFound => (StatusCode::NOT_FOUND, "FILE_NOT_FOUND"),
            AppError::NoNewQuotes => (StatusCode::NOT_FOUND, "NO_NEW_QUOTES"),
            AppError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Io(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }

    fn details(&self) -> Option<&[String]> {
        match self {
            AppError::WeakPassword(details) | AppError::Validation(details) => Some(details),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Server faults are logged with detail but answered generically, and
        // database errors that map to client statuses never expose raw
        // constraint or query text.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("{}", self);
            "An unexpected error occurred. Please try again later.".to_string()
        } else if matches!(self, AppError::Database(_)) {
            match status {
                StatusCode::CONFLICT => AppError::DuplicateEmail.to_string(),
                _ => AppError::NotFound.to_string(),
            }
        } else {
            self.to_string()
        };

        let mut error = json!({
            "message": message,
            "code": code,
        });
        if let Some(details) = self.details() {
            error["details"] = json!(details);
        }

        let body = Json(json!({
            "success": false,
            "error": error,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
