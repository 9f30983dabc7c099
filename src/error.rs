//! Error taxonomy for the numeric engine.
use thiserror::Error;

/// Failures raised by matrix operations and the layered network.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NnError {
    #[error("shape mismatch in {op}: {left:?} vs {right:?}")]
    ShapeMismatch {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },
    #[error("index ({row}, {col}) out of bounds for shape {shape:?}")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        shape: (usize, usize),
    },
    #[error("inverse activation undefined for {value}, expected a value strictly inside (0, 1)")]
    NumericDomain { value: f64 },
    #[error("non-finite {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },
    #[error("failed to allocate {bytes} bytes of aligned matrix storage")]
    Allocation { bytes: usize },
    #[error("invalid layer sizes: {0}")]
    InvalidLayers(String),
}

pub type Result<T> = std::result::Result<T, NnError>;

impl NnError {
    pub(crate) fn shape(op: &'static str, left: (usize, usize), right: (usize, usize)) -> Self {
        NnError::ShapeMismatch { op, left, right }
    }
}
