//! # Error Types
//!
//! This module defines error types used throughout the placard library.

use thiserror::Error;

/// Main error type for placard operations
#[derive(Debug, Error)]
pub enum PlacardError {
    /// Configuration store errors (persistence, malformed units)
    #[error("Config error: {0}")]
    Config(String),

    /// Dataset errors (loading, malformed records)
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Composition/render error
    #[error("Render error: {0}")]
    Render(String),

    /// Image processing error
    #[error("Image error: {0}")]
    Image(String),

    /// Print submission error for a single record
    #[error("Print error: {0}")]
    Print(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error wrapper
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
