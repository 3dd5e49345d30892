//! Platform Error Types
//!
//! Every handler returns `Result<_, ClinicError>`. Client-facing variants
//! carry a short message that is returned verbatim; infrastructure variants
//! are logged and collapsed into a generic 500.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

#[derive(Error, Debug)]
pub enum ClinicError {
    #[error("Unauthorized")]
    Unauthenticated,

    #[error("Invalid token: {message}")]
    InvalidToken { message: String },

    #[error("Session expired")]
    TokenExpired,

    #[error("{message}")]
    Unauthorized { message: String },

    #[error("{message}")]
    Forbidden { message: String },

    #[error("{message}")]
    Validation { message: String },

    #[error("{entity} not found")]
    NotFound { entity: String, id: String },

    #[error("{message}")]
    Conflict { message: String },

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bson::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] bson::de::Error),

    #[error("Blob storage error: {message}")]
    Blob { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ClinicError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized { message: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden { message: message.into() }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict { message: message.into() }
    }

    pub fn blob(message: impl Into<String>) -> Self {
        Self::Blob { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ClinicError::Unauthenticated
            | ClinicError::InvalidToken { .. }
            | ClinicError::TokenExpired
            | ClinicError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ClinicError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ClinicError::Validation { .. } => StatusCode::BAD_REQUEST,
            ClinicError::NotFound { .. } => StatusCode::NOT_FOUND,
            ClinicError::Conflict { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True when the message is safe to show to the caller.
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }

    /// True for a duplicate-key write error (E11000).
    pub fn is_duplicate_key(&self) -> bool {
        use mongodb::error::{ErrorKind, WriteFailure};
        match self {
            ClinicError::Database(e) => match e.kind.as_ref() {
                ErrorKind::Write(WriteFailure::WriteError(we)) => we.code == 11000,
                _ => false,
            },
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClinicError>;

/// Error response body
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always false
    pub ok: bool,
    pub error: String,
}

impl IntoResponse for ClinicError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if self.is_client_error() {
            self.to_string()
        } else {
            error!(error = %self, "Request failed");
            "Server error".to_string()
        };

        let body = ErrorResponse {
            ok: false,
            error: message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ClinicError {
    fn from(rejection: JsonRejection) -> Self {
        ClinicError::validation(rejection.body_text())
    }
}
