//! Error handling for Patrimoine
//!
//! Defines the domain error types and establishes a unified Result type
//! using anyhow for context chaining and error propagation.

use thiserror::Error;

/// Core error types for register and valuation operations
#[derive(Error, Debug)]
pub enum PatrimoineError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid date range: {0}")]
    InvalidRange(String),

    #[error("possession #{0} not found")]
    NotFound(i64),

    #[error("a possession labelled '{0}' already exists")]
    DuplicateLabel(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("remote error: {0}")]
    Remote(String),

    #[error("io error")]
    Io(#[from] std::io::Error),
}

/// Result type alias for application operations
pub type Result<T> = anyhow::Result<T>;
