use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiffError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DiffError {
    /// Buffer length does not match `width * height * 4`.
    #[error("invalid buffer: expected {expected} bytes, got {actual}")]
    InvalidBuffer { expected: usize, actual: usize },

    #[error("invalid dimensions: {width}x{height} (both must be > 0)")]
    InvalidDimensions { width: u32, height: u32 },

    /// Score engines report a size change as an error; the pixel engine
    /// reports it through `ComparisonVerdict::reason` instead.
    #[error("dimension mismatch: {left_w}x{left_h} vs {right_w}x{right_h}")]
    LayoutMismatch {
        left_w: u32,
        left_h: u32,
        right_w: u32,
        right_h: u32,
    },

    #[error("invalid option: {0}")]
    InvalidOption(String),
}
