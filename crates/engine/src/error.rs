//! The module contains the errors the engine can throw.
//!
//! The errors are:
//!
//! - [`Validation`] thrown when user input is rejected before any mutation.
//! - [`NotFound`] thrown when an item id is not in the ledger.
//! - [`CaptureDenied`] thrown when every capture strategy failed.
//!
//! Storage failures are reported as [`StoreError`] and never reach the caller
//! of a ledger operation: the persistence service recovers or drops them.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`NotFound`]: EngineError::NotFound
//!  [`CaptureDenied`]: EngineError::CaptureDenied
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("Camera unavailable: {0}")]
    CaptureDenied(String),
    #[error("Invalid capture state: {0}")]
    InvalidCaptureState(String),
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::CaptureDenied(a), Self::CaptureDenied(b)) => a == b,
            (Self::InvalidCaptureState(a), Self::InvalidCaptureState(b)) => a == b,
            (Self::Image(a), Self::Image(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

/// Errors raised by a [`KeyValueStore`](crate::KeyValueStore).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("quota exceeded writing \"{key}\": {needed} bytes needed, {available} available")]
    QuotaExceeded {
        key: String,
        needed: u64,
        available: u64,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns `true` when the write failed because the store is full.
    #[must_use]
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

/// Why a single capture strategy could not produce a photo.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("permission denied: {0}")]
    Denied(String),
    #[error("not available: {0}")]
    Unavailable(String),
    #[error("capture failed: {0}")]
    Failed(String),
}
