//! Layer composition: validated layer widths, weight construction, and the
//! forward/backward folds every network pass is built from.
use crate::element::Element;
use crate::error::{NnError, Result};
use crate::matrix::Matrix;
use std::fmt;

/// Ordered layer widths: input first, output last, hidden layers between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSizes(Vec<usize>);

impl LayerSizes {
    /// Requires at least two entries, all positive.
    pub fn new(sizes: &[usize]) -> Result<Self> {
        if sizes.len() < 2 {
            return Err(NnError::InvalidLayers(format!(
                "expected at least 2 layer sizes (input and output), got {}",
                sizes.len()
            )));
        }
        if let Some(i) = sizes.iter().position(|&s| s == 0) {
            return Err(NnError::InvalidLayers(format!("layer {} has width 0", i)));
        }
        Ok(Self(sizes.to_vec()))
    }

    pub fn input(&self) -> usize {
        self.0[0]
    }

    pub fn output(&self) -> usize {
        self.0[self.0.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Never true for a validated value; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// `(rows, cols)` of each weight matrix: rows are the next layer's width,
    /// columns the current one's, so `next = W · current`.
    pub fn weight_shapes(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.0.windows(2).map(|w| (w[1], w[0]))
    }
}

impl fmt::Display for LayerSizes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Zeroed weight matrices, one per pair of adjacent layers.
pub fn build_weights<F: Element>(sizes: &LayerSizes) -> Result<Vec<Matrix<F>>> {
    sizes
        .weight_shapes()
        .map(|(rows, cols)| Matrix::zeros(rows, cols))
        .collect()
}

/// Which fold results to hand back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retain {
    /// Only the value produced by the final step.
    Last,
    /// Every step's value, in traversal order. The seed is not included.
    All,
}

fn fold<'w, F, I, S>(
    steps: I,
    seed: &Matrix<F>,
    retain: Retain,
    mut step: S,
) -> Result<Vec<Matrix<F>>>
where
    F: Element,
    I: ExactSizeIterator<Item = &'w Matrix<F>>,
    S: FnMut(&Matrix<F>, &Matrix<F>) -> Result<Matrix<F>>,
{
    let mut kept = Vec::with_capacity(match retain {
        Retain::All => steps.len(),
        Retain::Last => 1,
    });
    let mut current: Option<Matrix<F>> = None;
    for w in steps {
        let next = step(w, current.as_ref().unwrap_or(seed))?;
        if let Some(prev) = current.replace(next) {
            if retain == Retain::All {
                kept.push(prev);
            }
        }
    }
    match (current, retain) {
        (Some(last), _) => kept.push(last),
        (None, Retain::Last) => kept.push(seed.clone()),
        (None, Retain::All) => {}
    }
    Ok(kept)
}

/// Walks `weights` from index 0 upward. `step(weight, previous)` yields the
/// next value; the first step sees `input` as `previous`.
///
/// With an empty weight slice `Retain::All` yields nothing and `Retain::Last`
/// yields the seed unchanged.
pub fn fold_forward<F, S>(
    weights: &[Matrix<F>],
    input: &Matrix<F>,
    retain: Retain,
    step: S,
) -> Result<Vec<Matrix<F>>>
where
    F: Element,
    S: FnMut(&Matrix<F>, &Matrix<F>) -> Result<Matrix<F>>,
{
    fold(weights.iter(), input, retain, step)
}

/// Same traversal as [`fold_forward`] but from the last weight down to index 0.
pub fn fold_backward<F, S>(
    weights: &[Matrix<F>],
    seed: &Matrix<F>,
    retain: Retain,
    step: S,
) -> Result<Vec<Matrix<F>>>
where
    F: Element,
    S: FnMut(&Matrix<F>, &Matrix<F>) -> Result<Matrix<F>>,
{
    fold(weights.iter().rev(), seed, retain, step)
}
