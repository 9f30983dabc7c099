//! The sigmoid activation and its inverse.
use crate::element::Element;
use crate::error::{NnError, Result};
use crate::matrix::Matrix;
use std::fmt;

/// Trait for activation functions.
pub trait Activation: fmt::Debug + Send + Sync {
    fn apply<F: Element>(&self, x: F) -> F;

    /// Derivative expressed through the activation's own output `y = apply(x)`.
    fn derivative_from_output<F: Element>(&self, y: F) -> F;

    /// Inverse of `apply`; fails outside the activation's range.
    fn inverse<F: Element>(&self, y: F) -> Result<F>;

    fn apply_matrix<F: Element>(&self, m: &Matrix<F>) -> Matrix<F> {
        m.map(|x| self.apply(x))
    }

    /// Applies `inverse` elementwise. The whole matrix is validated before any
    /// value is computed.
    fn inverse_matrix<F: Element>(&self, m: &Matrix<F>) -> Result<Matrix<F>>;
}

/// Sigmoid: 1 / (1 + exp(-x))
#[derive(Debug, Clone, Copy, Default)]
pub struct Sigmoid;

impl Sigmoid {
    fn in_range<F: Element>(y: F) -> bool {
        y > F::zero() && y < F::one()
    }
}

impl Activation for Sigmoid {
    #[inline]
    fn apply<F: Element>(&self, x: F) -> F {
        F::one() / (F::one() + (-x).exp())
    }

    #[inline]
    fn derivative_from_output<F: Element>(&self, y: F) -> F {
        y * (F::one() - y)
    }

    /// Logit: ln(y / (1 - y))
    fn inverse<F: Element>(&self, y: F) -> Result<F> {
        if !Self::in_range(y) {
            return Err(NnError::NumericDomain { value: y.as_f64() });
        }
        Ok((y / (F::one() - y)).ln())
    }

    fn inverse_matrix<F: Element>(&self, m: &Matrix<F>) -> Result<Matrix<F>> {
        if let Some(&bad) = m.iter().find(|&&y| !Self::in_range(y)) {
            return Err(NnError::NumericDomain { value: bad.as_f64() });
        }
        Ok(m.map(|y| (y / (F::one() - y)).ln()))
    }
}
