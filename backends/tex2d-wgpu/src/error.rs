//! Error types for the WGPU backend

use thiserror::Error;

/// Errors that can occur while acquiring a device for the backend
#[derive(Error, Debug)]
pub enum InitError {
    /// No suitable adapter was found
    #[error("Failed to find an adapter: {0}")]
    NoAdapter(String),

    /// The adapter refused to create a device
    #[error("Failed to request device: {0}")]
    RequestDevice(String),
}

/// Result type for backend initialization
pub type InitResult<T> = Result<T, InitError>;
