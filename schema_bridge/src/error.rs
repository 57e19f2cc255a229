use crate::schema::{Issue, ValidationError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("`{operation}` requires an object schema")]
    NotAnObject { operation: &'static str },
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Unknown field `{0}`")]
    UnknownField(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Validation(error) => ValidationException::new(error).into_response(),
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()).into_response(),
        }
    }
}

/// Request-facing failure raised by the validation pipe and guard.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ValidationException {
    message: String,
    error: ValidationError,
}

impl ValidationException {
    pub fn new(error: ValidationError) -> Self {
        Self {
            message: "Validation failed".to_string(),
            error,
        }
    }

    pub fn with_message(message: impl Into<String>, error: ValidationError) -> Self {
        Self {
            message: message.into(),
            error,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The underlying validation error, for logging and exception filters.
    pub fn zod_error(&self) -> &ValidationError {
        &self.error
    }

    pub fn issues(&self) -> &[Issue] {
        self.error.issues()
    }
}

impl From<ValidationError> for ValidationException {
    fn from(error: ValidationError) -> Self {
        ValidationException::new(error)
    }
}

impl IntoResponse for ValidationException {
    fn into_response(self) -> Response {
        let body = json!({
            "statusCode": StatusCode::BAD_REQUEST.as_u16(),
            "message": self.message,
            "errors": self.error.issues(),
        });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}
