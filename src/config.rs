//! Training configuration, loadable from JSON.
use crate::layers::LayerSizes;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Everything a training run needs besides the data itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Input width, hidden widths, output width.
    pub layers: Vec<usize>,
    pub learning_rate: f64,
    pub epochs: usize,
    /// Shuffle sample order every epoch.
    pub shuffle: bool,
    /// Seeds both weight initialization and shuffling when set.
    pub seed: Option<u64>,
    pub train_path: Option<PathBuf>,
    pub test_path: Option<PathBuf>,
    /// Work items buffered between the producer thread and the trainer.
    pub queue_capacity: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            layers: vec![784, 200, 200, 10],
            learning_rate: 0.3,
            epochs: 5,
            shuffle: false,
            seed: None,
            train_path: None,
            test_path: None,
            queue_capacity: 1024,
        }
    }
}

impl TrainConfig {
    /// Reads a JSON config; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let cfg: Self = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        LayerSizes::new(&self.layers)?;
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(anyhow!(
                "learning_rate must be finite and positive, got {}",
                self.learning_rate
            ));
        }
        if self.queue_capacity == 0 {
            return Err(anyhow!("queue_capacity must be at least 1"));
        }
        Ok(())
    }
}
