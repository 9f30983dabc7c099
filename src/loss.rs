//! Error measure reported by a training step.
use crate::element::Element;
use crate::error::Result;
use crate::matrix::Matrix;

/// Squared error `‖target - pred‖²`.
pub fn squared_error<F: Element>(pred: &Matrix<F>, target: &Matrix<F>) -> Result<F> {
    Ok(target.try_sub(pred)?.squared_norm())
}
