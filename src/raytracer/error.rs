//! Error types for the progressive renderer.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image dimensions are zero or disagree with the session buffer
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Pixel count mismatch: expected {expected}, got {actual}")]
    PixelCountMismatch { expected: usize, actual: usize },

    #[error("Malformed radiance file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("PNG encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Window error: {0}")]
    Window(#[from] minifb::Error),

    /// The producer reported a failure from one of its render passes
    #[error("Producer failed: {0}")]
    Producer(String),

    #[error("Producer panicked: {0}")]
    ProducerPanicked(String),

    #[error("Render pipeline already started")]
    AlreadyStarted,
}

pub type Result<T> = std::result::Result<T, Error>;
