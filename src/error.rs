use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A connection-pool error.
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// A pool-construction error.
    #[error("Pool build error: {0}")]
    CreatePool(#[from] deadpool_postgres::CreatePoolError),

    /// A database error.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// An I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An authentication error (bad credentials, bad token).
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The account exists but has not completed email verification.
    #[error("Account not verified")]
    Unverified,

    /// An authorization error (role or ownership mismatch).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A resource not found error.
    #[error("Resource not found")]
    NotFound,

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A unique identity field (email, student ID, RFID) is already taken.
    #[error("Duplicate identity: {0}")]
    DuplicateIdentity(String),

    /// The user's point balance cannot cover the requested job.
    #[error("Insufficient points: required {required}, available {available}")]
    InsufficientPoints { required: i32, available: i32 },

    /// A verification code past its expiry.
    #[error("Expired: {0}")]
    Expired(String),

    /// A stored file that should exist could not be retrieved.
    #[error("File unavailable: {0}")]
    FileUnavailable(String),

    /// The printer or its driver rejected a dispatch attempt.
    #[error("Print dispatch error: {0}")]
    PrintDispatch(String),

    /// A storage-backend error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A mail-delivery error.
    #[error("Mail error: {0}")]
    Mail(String),

    /// A multipart error.
    #[error("Multipart error: {0}")]
    Multipart(String),

    /// A column missing or of an unexpected type in a query result.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// A rate limit exceeded error.
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Pool(ref e) => {
                tracing::error!("Pool error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body("Database error"),
                )
            }

            AppError::CreatePool(ref e) => {
                tracing::error!("Pool build error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body("Database error"),
                )
            }

            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body("Database error"),
                )
            }

            AppError::Io(ref e) => {
                tracing::error!("IO error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body("File system error"),
                )
            }

            AppError::Authentication(ref msg) => {
                tracing::warn!("Authentication failed: {}", msg);
                (StatusCode::UNAUTHORIZED, error_body(msg))
            }

            AppError::Unverified => {
                tracing::debug!("Login attempt on unverified account");
                let body = sonic_rs::to_string(&sonic_rs::json!({
                    "error": "Account not verified. Please verify your email.",
                    "code": "needs_verification"
                }))
                .unwrap_or_else(|_| r#"{"error":"Account not verified"}"#.to_string());
                (StatusCode::FORBIDDEN, body)
            }

            AppError::Forbidden(ref msg) => {
                tracing::warn!("Authorization failed: {}", msg);
                (StatusCode::FORBIDDEN, error_body(msg))
            }

            AppError::NotFound => {
                tracing::debug!("Resource not found");
                (StatusCode::NOT_FOUND, error_body("Resource not found"))
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusCode::BAD_REQUEST, error_body(msg))
            }

            AppError::DuplicateIdentity(ref msg) => {
                tracing::debug!("Duplicate identity: {}", msg);
                (StatusCode::CONFLICT, error_body(msg))
            }

            AppError::InsufficientPoints {
                required,
                available,
            } => {
                tracing::debug!(
                    "Insufficient points: required {}, available {}",
                    required,
                    available
                );
                let body = sonic_rs::to_string(&sonic_rs::json!({
                    "error": "Insufficient points",
                    "code": "insufficient_points",
                    "required": required,
                    "available": available
                }))
                .unwrap_or_else(|_| r#"{"error":"Insufficient points"}"#.to_string());
                (StatusCode::PAYMENT_REQUIRED, body)
            }

            AppError::Expired(ref msg) => {
                tracing::debug!("Expired: {}", msg);
                (StatusCode::GONE, error_body(msg))
            }

            AppError::FileUnavailable(ref msg) => {
                tracing::warn!("File unavailable: {}", msg);
                let body = sonic_rs::to_string(&sonic_rs::json!({
                    "error": "Stored file is unavailable",
                    "code": "file_unavailable",
                    "reason": msg
                }))
                .unwrap_or_else(|_| r#"{"error":"Stored file is unavailable"}"#.to_string());
                (StatusCode::NOT_FOUND, body)
            }

            AppError::PrintDispatch(ref msg) => {
                tracing::error!("Print dispatch error: {}", msg);
                let body = sonic_rs::to_string(&sonic_rs::json!({
                    "error": "Printer dispatch failed",
                    "code": "print_dispatch_error",
                    "reason": msg
                }))
                .unwrap_or_else(|_| r#"{"error":"Printer dispatch failed"}"#.to_string());
                (StatusCode::BAD_GATEWAY, body)
            }

            AppError::Storage(ref msg) => {
                tracing::error!("Storage error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body("Storage error"),
                )
            }

            AppError::Mail(ref msg) => {
                tracing::error!("Mail error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, error_body("Mail error"))
            }

            AppError::Multipart(ref msg) => {
                tracing::error!("Multipart error: {}", msg);
                (StatusCode::BAD_REQUEST, error_body(msg))
            }

            AppError::MissingData(ref msg) => {
                tracing::error!("Missing data: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body("Internal server error"),
                )
            }

            AppError::RateLimitExceeded(ref msg) => {
                tracing::warn!("Rate limit exceeded: {}", msg);
                (StatusCode::TOO_MANY_REQUESTS, error_body(msg))
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body("Internal server error"),
                )
            }
        };

        (status, body).into_response()
    }
}

fn error_body(message: &str) -> String {
    sonic_rs::to_string(&sonic_rs::json!({
        "error": message
    }))
    .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string())
}
