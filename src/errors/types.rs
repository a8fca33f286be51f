//! Error type definitions for the job aggregator
//!
//! This module defines the error types used throughout the application,
//! providing a hierarchical error system that keeps data access and job
//! board failures apart until they reach the web layer.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Repository layer errors
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Job board errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Resource not found errors
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// Missing or invalid credentials
    #[error("Unauthorized")]
    Unauthorized,
}

/// Repository layer specific errors
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Constraint violations (unique, foreign key, etc.)
    #[error("Constraint violation: {constraint} - {message}")]
    ConstraintViolation { constraint: String, message: String },

    /// Stored value that no longer decodes into a model
    #[error("Invalid stored value: {field} - {message}")]
    InvalidValue { field: String, message: String },
}

/// Job board specific errors
#[derive(Error, Debug)]
pub enum SourceError {
    /// Network connection timeouts
    #[error("Connection timeout: {url}")]
    Timeout { url: String },

    /// Invalid source configuration
    #[error("Invalid configuration: {field} - {message}")]
    InvalidConfig { field: String, message: String },

    /// Parsing errors for listing pages and API payloads
    #[error("Parse error: {source_name} - {message}")]
    ParseError {
        source_name: String,
        message: String,
    },

    /// HTTP errors from job boards
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    /// Transport level failures (DNS, TLS, connection reset)
    #[error("Request failed: {url} - {message}")]
    RequestFailed { url: String, message: String },

    /// Source disabled in configuration or not registered
    #[error("Source unavailable: {source_name}")]
    Unavailable { source_name: String },
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not found error for a specific resource
    pub fn not_found<R: Into<String>, I: Into<String>>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Status code and client-facing message for this error
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::Validation { message } => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::NotFound { resource, .. } => {
                (StatusCode::NOT_FOUND, format!("{} not found", resource))
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::Source(SourceError::Unavailable { source_name }) => (
                StatusCode::NOT_FOUND,
                format!("Unknown or disabled source: {}", source_name),
            ),
            AppError::Source(_) => (
                StatusCode::BAD_GATEWAY,
                "Source operation failed".to_string(),
            ),
            AppError::Repository(RepositoryError::ConstraintViolation { message, .. }) => {
                (StatusCode::BAD_REQUEST, message.clone())
            }
            AppError::Database(_) | AppError::Repository(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl RepositoryError {
    /// Create a constraint violation error
    pub fn constraint_violation<C: Into<String>, M: Into<String>>(
        constraint: C,
        message: M,
    ) -> Self {
        Self::ConstraintViolation {
            constraint: constraint.into(),
            message: message.into(),
        }
    }

    /// Create an invalid stored value error
    pub fn invalid_value<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl SourceError {
    /// Create a timeout error
    pub fn timeout<U: Into<String>>(url: U) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse_error<S: Into<String>, M: Into<String>>(source_name: S, message: M) -> Self {
        Self::ParseError {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create an unavailable source error
    pub fn unavailable<S: Into<String>>(source_name: S) -> Self {
        Self::Unavailable {
            source_name: source_name.into(),
        }
    }

    /// Map a reqwest failure for `url` onto a source error
    pub fn from_reqwest<U: Into<String>>(url: U, err: reqwest::Error) -> Self {
        let url = url.into();
        if err.is_timeout() {
            Self::Timeout { url }
        } else if let Some(status) = err.status() {
            Self::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            Self::RequestFailed {
                url,
                message: err.to_string(),
            }
        }
    }
}
