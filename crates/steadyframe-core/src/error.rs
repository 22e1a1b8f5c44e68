//! Error types for SteadyFrame.

use thiserror::Error;

/// Main error type for SteadyFrame operations.
#[derive(Error, Debug)]
pub enum SteadyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decoder error: {0}")]
    Decoder(String),

    #[error("Encoder error: {0}")]
    Encoder(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Frame dimensions {actual_width}x{actual_height} do not match stream dimensions {expected_width}x{expected_height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Singular transform: linear part determinant {determinant:e} is not invertible")]
    SingularTransform { determinant: f64 },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for SteadyFrame operations.
pub type Result<T> = std::result::Result<T, SteadyError>;
