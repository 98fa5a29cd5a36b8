//! Common error types for the variant beacon

use thiserror::Error;

/// Common result type for beacon operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the beacon engine and its adapters
///
/// Client-facing refusals (bad input, unknown key, quota) are not errors;
/// they are reported as [`crate::engine::Rejection`] inside a normal outcome.
/// This enum covers failures of the collaborators behind the ports.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored JSON (pedigree, genotype) could not be decoded
    #[error("Malformed stored document: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Ontology file could not be loaded
    #[error("Ontology error: {0}")]
    Ontology(String),

    /// Invalid input or stored value
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
