//! A small layered neural network crate: aligned dense matrices with
//! parallel products, a fully connected sigmoid network trained by
//! per-sample gradient descent, and the plumbing to feed it MNIST.
//!
//! - `Matrix` with checked and panicking arithmetic, rayon-backed `dot`
//! - `Network` with query, reverse query and training
//! - MNIST loaders (CSV/IDX), metrics and a threaded trainer

pub mod activations;
pub mod aligned;
pub mod config;
pub mod datasets;
pub mod element;
pub mod error;
pub mod layers;
pub mod loss;
pub mod matrix;
pub mod metrics;
pub mod network;
pub mod queue;
pub mod runner;
pub mod trainer;
pub mod utils;

pub use activations::{Activation, Sigmoid};
pub use config::TrainConfig;
pub use datasets::{load_mnist_csv, load_mnist_idx, Sample};
pub use element::Element;
pub use error::{NnError, Result};
pub use layers::{fold_backward, fold_forward, LayerSizes, Retain};
pub use loss::squared_error;
pub use matrix::{Matrix, ParallelPolicy};
pub use metrics::{accuracy, argmax, confusion_matrix, Recognition};
pub use network::{Network, WeightRejection};
pub use queue::WorkQueue;
pub use runner::{Runner, StopFlag};
pub use trainer::{TrainReport, Trainer};
pub use utils::{generate_synthetic_data, print_model_summary, print_summary_table};
