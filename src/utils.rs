//! Console summaries and synthetic data for demos and tests.
use crate::datasets::Sample;
use crate::element::Element;
use crate::matrix::Matrix;
use crate::metrics::argmax;
use crate::network::Network;
use anyhow::{anyhow, Result};
use rand::Rng;

/// Print model summary
pub fn print_model_summary<F: Element>(network: &Network<F>) {
    println!("Model Summary:\n{}", network);
    for (i, w) in network.weights().iter().enumerate() {
        println!("  weights[{}]: {} x {}", i, w.rows(), w.cols());
    }
}

/// Print simple table for per-epoch values
pub fn print_summary_table(values: &[f64], title: &str) {
    println!("\n{} Summary Table:", title);
    println!("+----------------+------------+");
    println!("| Epoch          | Value      |");
    println!("+----------------+------------+");
    for (i, v) in values.iter().enumerate() {
        println!("| {:<14} | {:>10.6} |", i + 1, v);
    }
    if !values.is_empty() {
        let avg = values.iter().sum::<f64>() / values.len() as f64;
        println!("+----------------+------------+");
        println!("| {:<14} | {:>10.6} |", "Average", avg);
    }
    println!("+----------------+------------+");
}

/// Generate synthetic data: inputs and targets drawn from `[0.01, 0.99)`,
/// labelled with the target's arg-max.
pub fn generate_synthetic_data<F: Element, R: Rng + ?Sized>(
    n_samples: usize,
    input_size: usize,
    output_size: usize,
    rng: &mut R,
) -> Result<Vec<Sample<F>>> {
    if input_size == 0 || output_size == 0 {
        return Err(anyhow!("synthetic data needs non-empty inputs and outputs"));
    }
    let mut draw = |n: usize| -> Result<Matrix<F>> {
        let values: Vec<F> = (0..n).map(|_| F::of(rng.gen_range(0.01..0.99))).collect();
        Ok(Matrix::column(&values)?)
    };
    (0..n_samples)
        .map(|_| {
            let input = draw(input_size)?;
            let target = draw(output_size)?;
            let label = argmax(&target).map_or(0, |r| r.index);
            Ok(Sample { input, target, label })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn synthetic_values_stay_in_sigmoid_range() {
        let mut rng = StdRng::seed_from_u64(3);
        let data = generate_synthetic_data::<f64, _>(20, 5, 3, &mut rng).unwrap();
        assert_eq!(data.len(), 20);
        for s in &data {
            assert_eq!(s.input.shape(), (5, 1));
            assert_eq!(s.target.shape(), (3, 1));
            assert!(s.input.iter().chain(s.target.iter()).all(|&v| v > 0.0 && v < 1.0));
            assert_eq!(argmax(&s.target).unwrap().index, s.label);
        }
    }

    #[test]
    fn synthetic_data_rejects_empty_shapes() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(generate_synthetic_data::<f32, _>(1, 0, 2, &mut rng).is_err());
    }
}
