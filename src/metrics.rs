//! Recognition reporting and evaluation metrics.
use crate::datasets::Sample;
use crate::element::Element;
use crate::error::Result;
use crate::matrix::Matrix;
use crate::network::Network;
use std::fmt;

/// Predicted class of an output vector and the activation that won.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recognition<F: Element = f64> {
    pub index: usize,
    pub confidence: F,
}

impl<F: Element> fmt::Display for Recognition<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value: {}; with float = {:.6}", self.index, self.confidence)
    }
}

/// Arg-max over all elements; the first maximum wins ties. `None` for an empty matrix.
pub fn argmax<F: Element>(output: &Matrix<F>) -> Option<Recognition<F>> {
    let first = *output.as_slice().first()?;
    let (index, confidence) = output
        .iter()
        .enumerate()
        .skip(1)
        .fold((0usize, first), |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) });
    Some(Recognition { index, confidence })
}

/// Accuracy
pub fn accuracy<F: Element>(network: &Network<F>, samples: &[Sample<F>]) -> Result<f64> {
    if samples.is_empty() {
        return Ok(0.0);
    }
    let mut correct = 0usize;
    for sample in samples {
        let out = network.query(&sample.input)?;
        if argmax(&out).map(|r| r.index) == Some(sample.label) {
            correct += 1;
        }
    }
    Ok(correct as f64 / samples.len() as f64)
}

/// Confusion matrix indexed `[expected][predicted]`. Labels outside
/// `num_classes` are ignored.
pub fn confusion_matrix<F: Element>(
    network: &Network<F>,
    samples: &[Sample<F>],
    num_classes: usize,
) -> Result<Vec<Vec<usize>>> {
    let mut cm = vec![vec![0; num_classes]; num_classes];
    for sample in samples {
        let out = network.query(&sample.input)?;
        if let Some(pred) = argmax(&out) {
            if sample.label < num_classes && pred.index < num_classes {
                cm[sample.label][pred.index] += 1;
            }
        }
    }
    Ok(cm)
}
