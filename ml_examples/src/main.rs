// ml_examples/src/main.rs
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use layered_nn::datasets::{MNIST_INPUTS, MNIST_OUTPUTS, TARGET_HIGH, TARGET_LOW};
use layered_nn::{
    accuracy, argmax, confusion_matrix, load_mnist_csv, load_mnist_idx, print_model_summary,
    print_summary_table, Matrix, Network, Sample, StopFlag, TrainConfig, Trainer,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Train a layered sigmoid network on MNIST and report what it recognizes.
#[derive(Debug, Parser)]
#[command(name = "ml_examples", version)]
struct Args {
    /// JSON training config; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Training CSV (`label,p0..p783` per row).
    #[arg(long)]
    train: Option<PathBuf>,

    /// Test CSV.
    #[arg(long)]
    test: Option<PathBuf>,

    /// Training set as a gzipped IDX image/label pair.
    #[arg(long, num_args = 2, value_names = ["IMAGES", "LABELS"], conflicts_with = "train")]
    train_idx: Option<Vec<PathBuf>>,

    /// Test set as a gzipped IDX image/label pair.
    #[arg(long, num_args = 2, value_names = ["IMAGES", "LABELS"], conflicts_with = "test")]
    test_idx: Option<Vec<PathBuf>>,

    /// Layer widths, e.g. `784,200,200,10`.
    #[arg(long, value_delimiter = ',')]
    layers: Option<Vec<usize>>,

    #[arg(long)]
    learning_rate: Option<f64>,

    #[arg(long)]
    epochs: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    shuffle: bool,

    /// Feed samples from a producer thread through a bounded queue.
    #[arg(long)]
    concurrent: bool,

    /// Only print the first N `Expected`/`Recognized` pairs.
    #[arg(long)]
    show: Option<usize>,

    /// Print a reverse query of every class as ASCII art.
    #[arg(long)]
    reverse: bool,
}

impl Args {
    fn config(&self) -> Result<TrainConfig> {
        let mut cfg = match &self.config {
            Some(path) => TrainConfig::from_json_file(path)?,
            None => TrainConfig::default(),
        };
        if let Some(layers) = &self.layers {
            cfg.layers = layers.clone();
        }
        if let Some(lr) = self.learning_rate {
            cfg.learning_rate = lr;
        }
        if let Some(epochs) = self.epochs {
            cfg.epochs = epochs;
        }
        if self.seed.is_some() {
            cfg.seed = self.seed;
        }
        if self.shuffle {
            cfg.shuffle = true;
        }
        if self.train.is_some() {
            cfg.train_path = self.train.clone();
        }
        if self.test.is_some() {
            cfg.test_path = self.test.clone();
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn load(csv: Option<&PathBuf>, idx: Option<&[PathBuf]>, what: &str) -> Result<Vec<Sample>> {
    let samples = match (idx, csv) {
        (Some([images, labels]), _) => load_mnist_idx(images, labels),
        (Some(_), _) => Err(anyhow!("--{}-idx takes an image file and a label file", what)),
        (None, Some(path)) => load_mnist_csv(path),
        (None, None) => Err(anyhow!("no {} data given (use --{} or --{}-idx)", what, what, what)),
    };
    samples.with_context(|| format!("Failed to load {} data", what))
}

/// Renders a reconstructed 28x28 image with a coarse ASCII ramp.
fn ascii_digit(image: &Matrix) -> String {
    const RAMP: &[u8] = b" .:-=+*#%@";
    let mut out = String::new();
    for row in image.as_slice().chunks(28) {
        for &v in row {
            let level = ((v.clamp(0.0, 1.0)) * (RAMP.len() - 1) as f64).round() as usize;
            out.push(RAMP[level] as char);
        }
        out.push('\n');
    }
    out
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let cfg = args.config()?;

    let train = load(cfg.train_path.as_ref(), args.train_idx.as_deref(), "train")?;
    let test = load(cfg.test_path.as_ref(), args.test_idx.as_deref(), "test")?;

    let mut network = Network::<f64>::new(&cfg.layers)?;
    match cfg.seed {
        Some(seed) => network.random_weights_seeded(seed),
        None => network.random_weights(),
    };
    print_model_summary(&network);

    let trainer = Trainer::from_config(&cfg);
    let report = if args.concurrent {
        trainer.fit_concurrent(&mut network, &train, &StopFlag::new())?
    } else {
        trainer.fit(&mut network, &train)?
    };
    info!(steps = report.steps, final_error = ?report.final_error(), "training finished");

    let shown = args.show.unwrap_or(test.len());
    for sample in test.iter().take(shown) {
        let out = network.query(&sample.input)?;
        let expected = argmax(&sample.target).ok_or_else(|| anyhow!("empty target"))?;
        let recognized = argmax(&out).ok_or_else(|| anyhow!("empty output"))?;
        println!("Expected:   {}", expected);
        println!("Recognized: {}", recognized);
    }

    let acc = accuracy(&network, &test)?;
    println!("Accuracy: {:.2}%", acc * 100.0);
    print_summary_table(&report.epoch_errors, "Training Error");

    if network.output_width() == MNIST_OUTPUTS {
        let cm = confusion_matrix(&network, &test, MNIST_OUTPUTS)?;
        println!("\nConfusion matrix (rows expected, columns recognized):");
        for (label, row) in cm.iter().enumerate() {
            let cells: Vec<String> = row.iter().map(|c| format!("{:>5}", c)).collect();
            println!("{}: {}", label, cells.join(""));
        }
    }

    if args.reverse {
        if network.input_width() != MNIST_INPUTS {
            return Err(anyhow!("--reverse needs a {}-pixel input layer", MNIST_INPUTS));
        }
        for label in 0..network.output_width() {
            let mut target = Matrix::filled(network.output_width(), 1, TARGET_LOW)?;
            target.set(label, 0, TARGET_HIGH)?;
            let image = network.reverse_query(&target)?;
            println!("\nReverse query for {}:\n{}", label, ascii_digit(&image));
        }
    }

    Ok(())
}
