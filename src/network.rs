//! Layered feedforward network with a fixed sigmoid activation, trained by
//! online backpropagation.
use crate::activations::{Activation, Sigmoid};
use crate::element::Element;
use crate::error::{NnError, Result};
use crate::layers::{build_weights, fold_backward, fold_forward, LayerSizes, Retain};
use crate::loss::squared_error;
use crate::matrix::Matrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use std::fmt;
use tracing::debug;

/// Range reverse-query intermediates are rescaled into, matching the input
/// normalization so every inverse step stays inside the sigmoid's range.
const RECONSTRUCT_LOW: f64 = 0.01;
const RECONSTRUCT_HIGH: f64 = 0.99;

/// Which initial weight draws get thrown away and redrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightRejection {
    /// `|v| < 0.001 && |v| > 0.999`. No magnitude satisfies both bounds, so
    /// every draw is kept. Default until the intended rule is decided.
    #[default]
    Literal,
    /// `|v| < 0.001 || |v| > 0.999`: keep only magnitudes in `[0.001, 0.999]`.
    Truncated,
}

impl WeightRejection {
    const LOW: f64 = 0.001;
    const HIGH: f64 = 0.999;

    pub fn rejects(self, v: f64) -> bool {
        let a = v.abs();
        match self {
            WeightRejection::Literal => a < Self::LOW && a > Self::HIGH,
            WeightRejection::Truncated => a < Self::LOW || a > Self::HIGH,
        }
    }
}

/// Network
#[derive(Debug, Clone)]
pub struct Network<F: Element = f64> {
    sizes: LayerSizes,
    /// `weights[i]` maps layer `i` to layer `i + 1`.
    weights: Vec<Matrix<F>>,
    rejection: WeightRejection,
}

impl<F: Element> Network<F> {
    /// Builds a network with all-zero weights. `sizes` lists the input width,
    /// any hidden widths, then the output width.
    pub fn new(sizes: &[usize]) -> Result<Self> {
        let sizes = LayerSizes::new(sizes)?;
        let weights = build_weights(&sizes)?;
        Ok(Self {
            sizes,
            weights,
            rejection: WeightRejection::default(),
        })
    }

    pub fn with_rejection(mut self, rejection: WeightRejection) -> Self {
        self.rejection = rejection;
        self
    }

    pub fn layer_sizes(&self) -> &LayerSizes {
        &self.sizes
    }

    pub fn input_width(&self) -> usize {
        self.sizes.input()
    }

    pub fn output_width(&self) -> usize {
        self.sizes.output()
    }

    pub fn weights(&self) -> &[Matrix<F>] {
        &self.weights
    }

    /// Replaces `weights[index]`; the new matrix must have the same shape.
    pub fn set_weights(&mut self, index: usize, weights: Matrix<F>) -> Result<()> {
        let slot = self.weights.get_mut(index).ok_or_else(|| {
            NnError::InvalidLayers(format!("no weight matrix at index {}", index))
        })?;
        if slot.shape() != weights.shape() {
            return Err(NnError::shape("set_weights", slot.shape(), weights.shape()));
        }
        *slot = weights;
        Ok(())
    }

    /// Randomizes every weight from an entropy-seeded generator.
    pub fn random_weights(&mut self) -> &mut Self {
        let mut rng = StdRng::from_entropy();
        self.random_weights_with(&mut rng)
    }

    /// Reproducible initialization.
    pub fn random_weights_seeded(&mut self, seed: u64) -> &mut Self {
        let mut rng = StdRng::seed_from_u64(seed);
        self.random_weights_with(&mut rng)
    }

    /// Draws each entry from `N(0, 1/sqrt(rows))`, where rows is the width of
    /// the layer the matrix feeds. Can be called any number of times.
    pub fn random_weights_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> &mut Self {
        let rejection = self.rejection;
        for w in &mut self.weights {
            let sdev = (w.rows() as f64).powf(-0.5);
            for v in w.as_mut_slice() {
                *v = loop {
                    let z: f64 = rng.sample(StandardNormal);
                    let draw = z * sdev;
                    if !rejection.rejects(draw) {
                        break F::of(draw);
                    }
                };
            }
            debug!(rows = w.rows(), cols = w.cols(), sdev, "randomized weight matrix");
        }
        self
    }

    fn expect_column(op: &'static str, m: &Matrix<F>, width: usize) -> Result<()> {
        if m.shape() != (width, 1) {
            return Err(NnError::shape(op, (width, 1), m.shape()));
        }
        Ok(())
    }

    fn forward_step(w: &Matrix<F>, x: &Matrix<F>) -> Result<Matrix<F>> {
        Ok(Sigmoid.apply_matrix(&w.dot(x)?))
    }

    /// Forward inference: `σ(W · x)` through every layer.
    pub fn query(&self, input: &Matrix<F>) -> Result<Matrix<F>> {
        Self::expect_column("query", input, self.input_width())?;
        let mut last = fold_forward(&self.weights, input, Retain::Last, Self::forward_step)?;
        Ok(last.remove(0))
    }

    /// Forward inference keeping every layer's output, first hidden layer
    /// first and the network output last. The input itself is not included.
    pub fn query_all(&self, input: &Matrix<F>) -> Result<Vec<Matrix<F>>> {
        Self::expect_column("query", input, self.input_width())?;
        fold_forward(&self.weights, input, Retain::All, Self::forward_step)
    }

    fn reverse_step(w: &Matrix<F>, y: &Matrix<F>) -> Result<Matrix<F>> {
        let x = Sigmoid.inverse_matrix(y)?;
        let mut back = w.transpose()?.dot(&x)?;
        rescale(&mut back, F::of(RECONSTRUCT_LOW), F::of(RECONSTRUCT_HIGH));
        Ok(back)
    }

    /// Best-effort reconstruction of an input that would produce `output`.
    ///
    /// Each layer applies the inverse sigmoid, multiplies by the transposed
    /// weights and rescales into `[0.01, 0.99]`. This is not an exact inverse.
    /// Every component of `output` must lie strictly inside `(0, 1)`.
    pub fn reverse_query(&self, output: &Matrix<F>) -> Result<Matrix<F>> {
        Self::expect_column("reverse_query", output, self.output_width())?;
        let mut last = fold_backward(&self.weights, output, Retain::Last, Self::reverse_step)?;
        Ok(last.remove(0))
    }

    /// Like [`reverse_query`](Self::reverse_query), keeping each layer's
    /// reconstruction from the last hidden layer down to the input.
    pub fn reverse_query_all(&self, output: &Matrix<F>) -> Result<Vec<Matrix<F>>> {
        Self::expect_column("reverse_query", output, self.output_width())?;
        fold_backward(&self.weights, output, Retain::All, Self::reverse_step)
    }

    /// One online gradient-descent step on a single `(input, target)` pair.
    ///
    /// Returns the squared error `‖target - output‖²` of the forward pass
    /// made before the update. Shapes, the learning rate and every input and
    /// target value are checked before any weight changes; NaN or infinite
    /// values fail with [`NnError::NonFinite`].
    pub fn train(
        &mut self,
        learning_rate: F,
        input: &Matrix<F>,
        target: &Matrix<F>,
    ) -> Result<F> {
        Self::expect_column("train input", input, self.input_width())?;
        Self::expect_column("train target", target, self.output_width())?;
        if !learning_rate.is_finite() {
            return Err(NnError::NonFinite {
                what: "learning rate",
                value: learning_rate.as_f64(),
            });
        }
        Self::expect_finite("train input", input)?;
        Self::expect_finite("train target", target)?;

        let outputs = self.query_all(input)?;
        let Some(output) = outputs.last() else {
            return Err(NnError::InvalidLayers("network has no weights".into()));
        };
        let error = squared_error(output, target)?;
        let output_error = target.try_sub(output)?;

        // Error terms, output side first; no derivative is applied while propagating.
        let propagated = fold_backward(
            &self.weights[1..],
            &output_error,
            Retain::All,
            |w, e| w.transpose()?.dot(e),
        )?;
        let errors = std::iter::once(output_error).chain(propagated);

        let n = self.weights.len();
        let deltas = errors
            .enumerate()
            .map(|(j, err)| -> Result<(usize, Matrix<F>)> {
                let i = n - 1 - j;
                let out = &outputs[i];
                let prev = if i == 0 { input } else { &outputs[i - 1] };
                // err ⊙ o ⊙ (1 - o)
                let grad = err.try_mul(&out.map(|y| Sigmoid.derivative_from_output(y)))?;
                let mut delta = grad.dot(&prev.transpose()?)?;
                delta *= learning_rate;
                Ok((i, delta))
            })
            .collect::<Result<Vec<_>>>()?;

        for (i, delta) in deltas {
            self.weights[i].try_add_assign(&delta)?;
        }
        Ok(error)
    }

    fn expect_finite(what: &'static str, m: &Matrix<F>) -> Result<()> {
        match m.iter().find(|v| !v.is_finite()) {
            Some(&bad) => Err(NnError::NonFinite {
                what,
                value: bad.as_f64(),
            }),
            None => Ok(()),
        }
    }
}

/// Min-max rescale into `[low, high]`. A constant vector maps to the midpoint.
fn rescale<F: Element>(m: &mut Matrix<F>, low: F, high: F) {
    let Some((min, max)) = m.min_max() else {
        return;
    };
    let range = max - min;
    if range > F::zero() {
        m.map_inplace(|v| (v - min) / range * (high - low) + low);
    } else {
        m.fill((low + high) / F::of(2.0));
    }
}

impl<F: Element> fmt::Display for Network<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Network: {}", self.sizes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sigmoid(x: f64) -> f64 {
        1.0 / (1.0 + (-x).exp())
    }

    #[test]
    fn new_network_is_zeroed() {
        let nn = Network::<f32>::new(&[4, 3, 2]).unwrap();
        assert_eq!(nn.weights().len(), 2);
        assert_eq!(nn.weights()[0].shape(), (3, 4));
        assert!(nn.weights().iter().all(|w| w.iter().all(|&v| v == 0.0)));
        let out = nn.query(&Matrix::filled(4, 1, 0.7).unwrap()).unwrap();
        assert!(out.iter().all(|&v| v == 0.5));
        assert_eq!(nn.to_string(), "Network: [4, 3, 2]");
    }

    #[test]
    fn invalid_sizes_fail() {
        assert!(Network::<f64>::new(&[5]).is_err());
        assert!(Network::<f64>::new(&[5, 0]).is_err());
    }

    #[test]
    fn golden_forward_pass() {
        let mut nn = Network::<f64>::new(&[2, 2, 1]).unwrap();
        nn.set_weights(0, Matrix::identity(2).unwrap()).unwrap();
        nn.set_weights(1, Matrix::from_rows(1, 2, &[[1.0, 1.0]]).unwrap())
            .unwrap();
        let input = Matrix::column(&[0.0, 1.0]).unwrap();
        let out = nn.query(&input).unwrap();

        let expected = sigmoid(sigmoid(0.0) + sigmoid(1.0));
        assert_eq!(out.shape(), (1, 1));
        assert_eq!(out[(0, 0)], expected);

        let all = nn.query_all(&input).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].as_slice(), &[0.5, sigmoid(1.0)]);
        assert_eq!(all[1], out);
    }

    #[test]
    fn set_weights_checks_shape_and_index() {
        let mut nn = Network::<f64>::new(&[2, 3]).unwrap();
        assert!(matches!(
            nn.set_weights(0, Matrix::zeros(2, 3).unwrap()),
            Err(NnError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            nn.set_weights(1, Matrix::zeros(3, 2).unwrap()),
            Err(NnError::InvalidLayers(_))
        ));
    }

    #[test]
    fn wrong_widths_are_rejected_before_training() {
        let mut nn = Network::<f64>::new(&[3, 2]).unwrap();
        nn.random_weights_seeded(1);
        let before = nn.weights()[0].clone();
        let good_in = Matrix::filled(3, 1, 0.5).unwrap();
        let bad_in = Matrix::filled(2, 1, 0.5).unwrap();
        let good_target = Matrix::filled(2, 1, 0.5).unwrap();
        let bad_target = Matrix::filled(3, 1, 0.5).unwrap();

        assert!(matches!(
            nn.train(0.1, &bad_in, &good_target),
            Err(NnError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            nn.train(0.1, &good_in, &bad_target),
            Err(NnError::ShapeMismatch { .. })
        ));
        assert!(nn.query(&bad_in).is_err());
        assert!(nn.query(&Matrix::filled(1, 3, 0.5).unwrap()).is_err());
        assert_eq!(nn.weights()[0], before);
    }

    #[test]
    fn single_layer_step_matches_hand_computation() {
        let mut nn = Network::<f64>::new(&[2, 1]).unwrap();
        nn.set_weights(0, Matrix::from_rows(1, 2, &[[0.5, -0.25]]).unwrap())
            .unwrap();
        let input = Matrix::column(&[0.2, 0.8]).unwrap();
        let target = Matrix::column(&[0.9]).unwrap();
        let lr = 0.3;

        let o = sigmoid(0.5 * 0.2 - 0.25 * 0.8);
        let e = 0.9 - o;
        let g = e * o * (1.0 - o);
        let expected = [0.5 + lr * g * 0.2, -0.25 + lr * g * 0.8];

        let sq = nn.train(lr, &input, &target).unwrap();
        assert_relative_eq!(sq, e * e, epsilon = 1e-15);
        let w = &nn.weights()[0];
        assert_relative_eq!(w[(0, 0)], expected[0], epsilon = 1e-12);
        assert_relative_eq!(w[(0, 1)], expected[1], epsilon = 1e-12);
    }

    #[test]
    fn hidden_layer_errors_use_pre_update_weights() {
        let mut nn = Network::<f64>::new(&[1, 1, 1]).unwrap();
        nn.set_weights(0, Matrix::filled(1, 1, 0.4).unwrap()).unwrap();
        nn.set_weights(1, Matrix::filled(1, 1, -0.7).unwrap()).unwrap();
        let (x, t, lr) = (0.6, 0.2, 0.5);

        let h = sigmoid(0.4 * x);
        let o = sigmoid(-0.7 * h);
        let e_out = t - o;
        let e_hidden = -0.7 * e_out;
        let w1 = -0.7 + lr * e_out * o * (1.0 - o) * h;
        let w0 = 0.4 + lr * e_hidden * h * (1.0 - h) * x;

        nn.train(
            lr,
            &Matrix::column(&[x]).unwrap(),
            &Matrix::column(&[t]).unwrap(),
        )
        .unwrap();
        assert_relative_eq!(nn.weights()[1][(0, 0)], w1, epsilon = 1e-12);
        assert_relative_eq!(nn.weights()[0][(0, 0)], w0, epsilon = 1e-12);
    }

    #[test]
    fn seeded_initialization_is_reproducible() {
        let mut a = Network::<f32>::new(&[5, 4, 3]).unwrap();
        let mut b = Network::<f32>::new(&[5, 4, 3]).unwrap();
        a.random_weights_seeded(42);
        b.random_weights_seeded(42);
        assert_eq!(a.weights(), b.weights());
        a.random_weights_seeded(43);
        assert_ne!(a.weights(), b.weights());
    }

    #[test]
    fn random_weights_spread_matches_fan_in() {
        let mut nn = Network::<f64>::new(&[200, 100]).unwrap();
        nn.random_weights_seeded(7);
        let w = &nn.weights()[0];
        assert!(w.len() >= 10_000);
        let n = w.len() as f64;
        let mean = w.sum() / n;
        let var = w.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n;
        let expected = 1.0 / (w.rows() as f64).sqrt();
        assert!(mean.abs() < 0.01, "mean {}", mean);
        assert!((var.sqrt() - expected).abs() < 0.05 * expected, "std {}", var.sqrt());
    }

    #[test]
    fn literal_rejection_never_rejects() {
        for v in [-2.0, -0.5, 0.0, 0.0005, 0.5, 0.9995, 3.0] {
            assert!(!WeightRejection::Literal.rejects(v));
        }
        assert!(WeightRejection::Truncated.rejects(0.0005));
        assert!(WeightRejection::Truncated.rejects(-1.5));
        assert!(!WeightRejection::Truncated.rejects(-0.5));
    }

    #[test]
    fn truncated_rejection_bounds_magnitudes() {
        let mut nn = Network::<f64>::new(&[30, 1])
            .unwrap()
            .with_rejection(WeightRejection::Truncated);
        nn.random_weights_seeded(3);
        assert!(nn.weights()[0]
            .iter()
            .all(|v| (0.001..=0.999).contains(&v.abs())));
    }

    #[test]
    fn reverse_query_stays_in_input_range() {
        let mut nn = Network::<f64>::new(&[6, 4, 3]).unwrap();
        nn.random_weights_seeded(11);
        let target = Matrix::column(&[0.01, 0.99, 0.01]).unwrap();
        let all = nn.reverse_query_all(&target).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].shape(), (4, 1));
        let input = nn.reverse_query(&target).unwrap();
        assert_eq!(input.shape(), (6, 1));
        assert_eq!(input, all[1]);
        let (lo, hi) = input.min_max().unwrap();
        assert_relative_eq!(lo, 0.01, epsilon = 1e-12);
        assert_relative_eq!(hi, 0.99, epsilon = 1e-12);
    }

    #[test]
    fn reverse_query_rejects_saturated_outputs() {
        let nn = Network::<f64>::new(&[3, 2]).unwrap();
        let err = nn
            .reverse_query(&Matrix::column(&[1.0, 0.5]).unwrap())
            .unwrap_err();
        assert_eq!(err, NnError::NumericDomain { value: 1.0 });
        assert!(nn.reverse_query(&Matrix::column(&[0.5]).unwrap()).is_err());
    }

    #[test]
    fn reverse_query_single_layer_by_hand() {
        let mut nn = Network::<f64>::new(&[3, 1]).unwrap();
        nn.set_weights(0, Matrix::from_rows(1, 3, &[[1.0, -2.0, 0.25]]).unwrap())
            .unwrap();

        // logit(0.75) = ln 3 = L, so Wᵀ·L = [L, -2L, L/4]; min -2L, range 3L.
        let back = nn.reverse_query(&Matrix::column(&[0.75]).unwrap()).unwrap();
        assert_eq!(back.shape(), (3, 1));
        assert_relative_eq!(back[(0, 0)], 0.99, epsilon = 1e-12);
        assert_relative_eq!(back[(1, 0)], 0.01, epsilon = 1e-12);
        assert_relative_eq!(back[(2, 0)], 0.75 * 0.98 + 0.01, epsilon = 1e-12);

        // logit(0.25) = -L flips every sign: [-L, 2L, -L/4].
        let back = nn.reverse_query(&Matrix::column(&[0.25]).unwrap()).unwrap();
        assert_relative_eq!(back[(0, 0)], 0.01, epsilon = 1e-12);
        assert_relative_eq!(back[(1, 0)], 0.99, epsilon = 1e-12);
        assert_relative_eq!(back[(2, 0)], 0.25 * 0.98 + 0.01, epsilon = 1e-12);
    }

    #[test]
    fn reverse_query_feeds_rescaled_layer_into_next_inverse() {
        let mut nn = Network::<f64>::new(&[2, 3, 1]).unwrap();
        let w0 = Matrix::from_rows(3, 2, &[[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]).unwrap();
        nn.set_weights(0, w0).unwrap();
        nn.set_weights(1, Matrix::from_rows(1, 3, &[[1.0, -2.0, 0.25]]).unwrap())
            .unwrap();

        let all = nn.reverse_query_all(&Matrix::column(&[0.75]).unwrap()).unwrap();
        let hidden = [0.99, 0.01, 0.745];
        for (i, h) in hidden.iter().enumerate() {
            assert_relative_eq!(all[0][(i, 0)], *h, epsilon = 1e-12);
        }

        let logit = |y: f64| (y / (1.0 - y)).ln();
        let (a, b, c) = (logit(0.99), logit(0.01), logit(0.745));
        let raw = [a + c, b + c];
        let (lo, hi) = (raw[0].min(raw[1]), raw[0].max(raw[1]));
        for (i, r) in raw.iter().enumerate() {
            let expected = (r - lo) / (hi - lo) * 0.98 + 0.01;
            assert_relative_eq!(all[1][(i, 0)], expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn non_finite_training_values_are_rejected() {
        let mut nn = Network::<f64>::new(&[2, 2]).unwrap();
        nn.random_weights_seeded(4);
        let before = nn.weights()[0].clone();
        let input = Matrix::column(&[0.2, 0.5]).unwrap();
        let target = Matrix::column(&[0.9, 0.1]).unwrap();
        let bad_input = Matrix::column(&[f64::NAN, 0.5]).unwrap();
        let bad_target = Matrix::column(&[0.9, f64::NEG_INFINITY]).unwrap();

        assert!(matches!(
            nn.train(0.3, &bad_input, &target),
            Err(NnError::NonFinite { what: "train input", .. })
        ));
        assert_eq!(
            nn.train(0.3, &input, &bad_target).unwrap_err(),
            NnError::NonFinite {
                what: "train target",
                value: f64::NEG_INFINITY
            }
        );
        assert_eq!(
            nn.train(f64::INFINITY, &input, &target).unwrap_err(),
            NnError::NonFinite {
                what: "learning rate",
                value: f64::INFINITY
            }
        );
        assert!(nn.train(f64::NAN, &input, &target).is_err());
        assert_eq!(nn.weights()[0], before);
        assert!(nn.train(0.3, &input, &target).unwrap().is_finite());
    }

    #[test]
    fn rescale_constant_vector_uses_midpoint() {
        let mut m = Matrix::filled(3, 1, 4.0f64).unwrap();
        rescale(&mut m, 0.01, 0.99);
        assert!(m.iter().all(|&v| v == 0.5));
    }
}
