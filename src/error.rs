//! Error types shared by the store, compositor, and HTTP layer

use thiserror::Error;

/// Errors reported by the capture store and compositor.
///
/// None of these are fatal to the process: a failed operation on one
/// capture leaves the store and every other capture untouched.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The uploaded bytes could not be decoded as a raster image.
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// A crop region had non-positive dimensions or fell outside the
    /// decoded image.
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    /// An annotation failed its shape or color constraints.
    #[error("Invalid annotation: {0}")]
    Validation(String),

    /// No capture exists with the given id.
    #[error("Capture not found: {0}")]
    NotFound(String),

    /// The requested render format is not supported.
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    /// The composited image could not be encoded.
    #[error("Failed to encode image: {0}")]
    Encode(String),
}
