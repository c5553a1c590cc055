//! Error types for CampusDesk services
//!
//! Provides a single error enum with:
//! - Distinct variants for each failure mode of the portal
//! - HTTP status code mapping
//! - A classification tag separating client input faults, external
//!   dependency faults and internal faults
//! - Structured JSON error bodies

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Message shown to callers whenever an internal fault occurs
pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred while processing your request";

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    MissingColumns,
    UnsupportedFileType,
    PayloadTooLarge,

    // Authentication errors (2xxx)
    Unauthorized,
    InvalidCredentials,

    // Authorization errors (3xxx)
    InsufficientPrivilege,

    // Resource errors (4xxx)
    RecordNotFound,

    // Persistence errors (7xxx)
    PersistenceFailure,

    // External service errors (8xxx)
    ExternalServiceFailure,
    ImportFailure,
    DocumentFailure,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingColumns => 1002,
            ErrorCode::UnsupportedFileType => 1003,
            ErrorCode::PayloadTooLarge => 1004,

            ErrorCode::Unauthorized => 2001,
            ErrorCode::InvalidCredentials => 2002,

            ErrorCode::InsufficientPrivilege => 3001,

            ErrorCode::RecordNotFound => 4001,

            ErrorCode::PersistenceFailure => 7001,

            ErrorCode::ExternalServiceFailure => 8001,
            ErrorCode::ImportFailure => 8002,
            ErrorCode::DocumentFailure => 8003,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
        }
    }
}

/// Coarse classification used by logs and metrics
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The caller sent something malformed or is not allowed to do it
    ClientInput,
    /// A collaborator outside the process (model API, file contents) failed
    ExternalDependency,
    /// Our own fault: storage, configuration, bugs
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::ClientInput => "client_input",
            ErrorCategory::ExternalDependency => "external_dependency",
            ErrorCategory::Internal => "internal",
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Missing required columns: {}", columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("File type not allowed: {extension}. Allowed types: csv, pdf")]
    UnsupportedFileType { extension: String },

    #[error("Payload too large: uploads are limited to {limit} bytes")]
    PayloadTooLarge { limit: usize },

    // Authentication errors
    #[error("Invalid credentials. Please try again.")]
    InvalidCredentials,

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    // Authorization errors
    #[error("You do not have administrative privileges")]
    InsufficientPrivilege,

    // Resource errors
    #[error("{resource_type} not found: {id}")]
    RecordNotFound { resource_type: String, id: String },

    // Persistence errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] sea_orm::DbErr),

    // External collaborators
    #[error("Language model service error: {message}")]
    ExternalService { message: String },

    #[error("Tabular import error: {0}")]
    Import(#[from] csv::Error),

    #[error("Document error for {path}: {message}")]
    Document { path: String, message: String },

    // Internal errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Shorthand for a validation failure on a named field
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }

    /// Shorthand for a missing or wrong-role session
    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Unauthorized {
            message: message.into(),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MissingColumns { .. } => ErrorCode::MissingColumns,
            AppError::UnsupportedFileType { .. } => ErrorCode::UnsupportedFileType,
            AppError::PayloadTooLarge { .. } => ErrorCode::PayloadTooLarge,
            AppError::InvalidCredentials => ErrorCode::InvalidCredentials,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::InsufficientPrivilege => ErrorCode::InsufficientPrivilege,
            AppError::RecordNotFound { .. } => ErrorCode::RecordNotFound,
            AppError::Persistence(_) => ErrorCode::PersistenceFailure,
            AppError::ExternalService { .. } => ErrorCode::ExternalServiceFailure,
            AppError::Import(_) => ErrorCode::ImportFailure,
            AppError::Document { .. } => ErrorCode::DocumentFailure,
            AppError::Io(_) => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Internal { .. } => ErrorCode::InternalError,
        }
    }

    /// Classification tag for observability
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::Validation { .. }
            | AppError::MissingColumns { .. }
            | AppError::UnsupportedFileType { .. }
            | AppError::PayloadTooLarge { .. }
            | AppError::InvalidCredentials
            | AppError::Unauthorized { .. }
            | AppError::InsufficientPrivilege
            | AppError::RecordNotFound { .. } => ErrorCategory::ClientInput,

            AppError::ExternalService { .. }
            | AppError::Import(_)
            | AppError::Document { .. } => ErrorCategory::ExternalDependency,

            AppError::Persistence(_)
            | AppError::Io(_)
            | AppError::Configuration { .. }
            | AppError::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. }
            | AppError::MissingColumns { .. }
            | AppError::UnsupportedFileType { .. }
            | AppError::Import(_)
            | AppError::Document { .. } => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::InvalidCredentials | AppError::Unauthorized { .. } => {
                StatusCode::UNAUTHORIZED
            }

            // 403 Forbidden
            AppError::InsufficientPrivilege => StatusCode::FORBIDDEN,

            // 404 Not Found
            AppError::RecordNotFound { .. } => StatusCode::NOT_FOUND,

            // 413 Payload Too Large
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,

            // 502 Bad Gateway
            AppError::ExternalService { .. } => StatusCode::BAD_GATEWAY,

            // 500 Internal Server Error
            AppError::Persistence(_)
            | AppError::Io(_)
            | AppError::Configuration { .. }
            | AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Message safe to show an end user. Server faults never leak details.
    pub fn public_message(&self) -> String {
        if self.is_server_error() {
            GENERIC_FAILURE_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }

    /// Emit a log line tagged with code and category
    pub fn log(&self) {
        let code = self.code();
        let category = self.category().as_str();
        if self.is_server_error() {
            tracing::error!(
                error = %self,
                code = ?code,
                category,
                status = self.status_code().as_u16(),
                "Server error"
            );
        } else {
            tracing::warn!(
                error = %self,
                code = ?code,
                category,
                status = self.status_code().as_u16(),
                "Client error"
            );
        }
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: ErrorCode,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        crate::metrics::record_error(&self);

        let body = ErrorResponse {
            error: self.public_message(),
            code: self.code(),
        };

        (self.status_code(), Json(body)).into_response()
    }
}
