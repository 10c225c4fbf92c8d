use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FluenceError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("No dataset labelled '{0}'")]
    LabelNotFound(String),

    #[error("Malformed container: {0}")]
    Format(String),

    #[error("Unsupported element type '{0}', only 32-bit float is supported")]
    UnsupportedType(String),

    #[error("Unsupported compression '{0}'")]
    UnsupportedCompression(String),

    #[error("Invalid base-64 payload: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("Corrupt compressed payload: {0}")]
    Decompression(std::io::Error),

    #[error("Payload has {actual} bytes but shape {shape:?} needs {expected}")]
    SizeMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("Shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Index {index} out of range for {dimension} (extent {extent})")]
    IndexOutOfRange {
        dimension: &'static str,
        index: usize,
        extent: usize,
    },

    #[error("Empty input")]
    EmptyInput,

    #[error("Dataset label '{0}' is already registered")]
    DuplicateLabel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T, E = FluenceError> = std::result::Result<T, E>;
