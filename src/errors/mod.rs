//! Centralized error handling for the job aggregator
//!
//! This module unifies error types across the application layers and maps
//! them onto HTTP responses for the web layer.
//!
//! # Error Categories
//!
//! - **Database Errors**: SQLite operations, migrations, connection issues
//! - **Repository Errors**: Data access layer failures
//! - **Source Errors**: Job board connectivity and page extraction
//! - **Validation Errors**: Input validation and business rule violations
//! - **Access Errors**: Missing credentials and resources owned by someone else

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Source Results
pub type SourceResult<T> = Result<T, SourceError>;
