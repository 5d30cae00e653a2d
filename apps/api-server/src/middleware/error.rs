//! Error handling - every failure leaves the server as `{message, data?}`.

use actix_web::{HttpRequest, HttpResponse, ResponseError, error, http::StatusCode};
use quill_core::{DomainError, FieldError};
use quill_shared::{ErrorResponse, FieldErrorBody};
use std::fmt;

/// Application-level error type, the single HTTP error responder.
#[derive(Debug)]
pub enum AppError {
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Internal(String),
}

impl AppError {
    /// A malformed request body, reported like any other validation failure.
    pub fn malformed(detail: impl fmt::Display) -> Self {
        tracing::debug!(%detail, "Rejected malformed request body");
        AppError::Validation {
            message: "Malformed request body.".to_string(),
            errors: Vec::new(),
        }
    }

    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        DomainError::invalid_field(field, message).into()
    }

    pub fn not_authenticated() -> Self {
        AppError::Unauthorized("Not authenticated.".to_string())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation { message, errors } => {
                write!(f, "Validation failed: {} ({} field errors)", message, errors.len())
            }
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            AppError::Validation { message, errors } if errors.is_empty() => {
                ErrorResponse::new(message.clone())
            }
            AppError::Validation { message, errors } => {
                ErrorResponse::new(message.clone()).with_data(
                    errors
                        .iter()
                        .map(|e| FieldErrorBody {
                            field: e.field.clone(),
                            message: e.message.clone(),
                        })
                        .collect(),
                )
            }
            AppError::Unauthorized(msg) | AppError::Forbidden(msg) | AppError::NotFound(msg) => {
                ErrorResponse::new(msg.clone())
            }
            AppError::Internal(detail) => {
                // Detail stays in the logs
                tracing::error!("Internal error: {}", detail);
                ErrorResponse::internal_error()
            }
        };

        HttpResponse::build(self.status_code()).json(error)
    }
}

// Conversion from domain errors
impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation { message, errors } => AppError::Validation { message, errors },
            DomainError::Unauthorized(msg) => AppError::Unauthorized(msg),
            DomainError::Forbidden(msg) => AppError::Forbidden(msg),
            DomainError::NotFound { entity_type, id } => {
                tracing::debug!(entity_type, %id, "Entity not found");
                AppError::NotFound(format!("Could not find {}.", entity_type.to_lowercase()))
            }
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// Routes JSON body errors (bad syntax, wrong content type, too large) to a 422.
pub fn json_error_handler(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::malformed(err).into()
}

/// Routes query string errors to a 422.
pub fn query_error_handler(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::malformed(err).into()
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;
