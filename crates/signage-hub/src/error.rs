//! Error types for signage-hub

use thiserror::Error;

/// Result type for signage-hub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in signage-hub
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] signage_core::Error),

    #[error(transparent)]
    Render(#[from] signage_render::Error),

    /// Uploaded artwork could not be converted; the save was not applied
    #[error("artwork conversion failed: {0}")]
    Artwork(#[from] image::ImageError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// Errors cross the artwork job task boundary
fn _assert_error_send_sync<T: Send + Sync>() {}
fn _error_is_send_sync() {
    _assert_error_send_sync::<Error>();
}
