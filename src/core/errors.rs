// src/core/errors.rs

//! Defines the primary error type for the entire application.

use std::sync::Arc;
use thiserror::Error;

/// The main error enum, representing runtime failures within the node.
/// Boot-time configuration failures use `anyhow` instead and terminate the
/// process; everything here is scoped to a single connection or call.
#[derive(Error, Debug)]
pub enum FluxgateError {
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Frame exceeds maximum length of {0} bytes")]
    FrameTooLarge(usize),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown method '{0}'")]
    UnknownMethod(String),

    #[error("Invalid params for '{0}': {1}")]
    InvalidParams(String, String),

    #[error("JSON Error: {0}")]
    Json(String),
}

// --- From trait implementations for easy error conversion ---

impl From<std::io::Error> for FluxgateError {
    fn from(e: std::io::Error) -> Self {
        FluxgateError::Io(Arc::new(e))
    }
}

impl From<serde_json::Error> for FluxgateError {
    fn from(e: serde_json::Error) -> Self {
        FluxgateError::Json(e.to_string())
    }
}
