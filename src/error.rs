//! Error types for bead pattern conversion

use thiserror::Error;

/// Errors produced while building a bead pattern.
#[derive(Debug, Error)]
pub enum Error {
    /// The palette has no entries, so nothing can be matched
    #[error("palette is empty")]
    EmptyPalette,

    /// Grid or image dimensions are zero (or the buffer does not match them)
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// Merge threshold is negative or not a number
    #[error("invalid merge threshold {0}, expected a non-negative distance")]
    InvalidThreshold(f64),

    /// The source image could not be decoded into a pixel buffer
    #[error("image decode unavailable: {0}")]
    DecodeUnavailable(String),

    /// Two palette entries share the same key
    #[error("duplicate palette key '{0}'")]
    DuplicateKey(String),

    /// A hex color string is malformed
    #[error("invalid hex color '{0}', expected 6 hex digits")]
    InvalidHex(String),

    /// A grid cell refers to a palette position that does not exist
    #[error("grid refers to palette position {0}, which is out of range")]
    UnknownPaletteIndex(usize),

    /// Catalog or mapping JSON could not be parsed
    #[error("catalog parse error: {0}")]
    Catalog(#[from] serde_json::Error),
}

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, Error>;
