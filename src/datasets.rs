//! MNIST loaders (CSV and gzipped IDX) producing normalized samples.
use crate::element::Element;
use crate::matrix::Matrix;
use anyhow::{anyhow, Context, Result};
use byteorder::{BigEndian, ReadBytesExt};
use csv::ReaderBuilder;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::{info, warn};

pub const MNIST_INPUTS: usize = 28 * 28;
pub const MNIST_OUTPUTS: usize = 10;

/// Target value for the inactive classes.
pub const TARGET_LOW: f64 = 0.001;
/// Target value for the active class.
pub const TARGET_HIGH: f64 = 0.999;

/// One training example: input and target column vectors plus the class label.
#[derive(Debug, Clone)]
pub struct Sample<F: Element = f64> {
    pub input: Matrix<F>,
    pub target: Matrix<F>,
    pub label: usize,
}

impl<F: Element> Sample<F> {
    /// Pairs `input` with the target vector for `label` out of `classes`.
    pub fn new(input: Matrix<F>, label: usize, classes: usize) -> Result<Self> {
        Ok(Self {
            input,
            target: target_vector(label, classes)?,
            label,
        })
    }
}

/// Maps a pixel byte into `[0.01, 1.0]`, keeping inputs off zero.
pub fn normalize_pixel<F: Element>(pixel: u8) -> F {
    F::of(pixel as f64 / 255.0 * 0.99 + 0.01)
}

/// One-hot-like target: `TARGET_HIGH` at `label`, `TARGET_LOW` elsewhere.
pub fn target_vector<F: Element>(label: usize, classes: usize) -> Result<Matrix<F>> {
    if label >= classes {
        return Err(anyhow!("label {} outside {} classes", label, classes));
    }
    let mut t = Matrix::filled(classes, 1, F::of(TARGET_LOW))?;
    t.set(label, 0, F::of(TARGET_HIGH))?;
    Ok(t)
}

fn pixels_to_input<F: Element>(pixels: &[u8]) -> Result<Matrix<F>> {
    let values: Vec<F> = pixels.iter().map(|&p| normalize_pixel(p)).collect();
    Ok(Matrix::column(&values)?)
}

/// Load MNIST from CSV rows of `label,p0,...,p783` (no header).
/// Malformed rows are skipped with a warning.
pub fn load_mnist_csv<F: Element>(path: impl AsRef<Path>) -> Result<Vec<Sample<F>>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);
    let mut samples = Vec::new();
    let mut skipped = 0usize;

    for (line, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("CSV parse error at row {}", line + 1))?;
        if record.len() != MNIST_INPUTS + 1 {
            warn!(row = line + 1, fields = record.len(), "skipping row with wrong field count");
            skipped += 1;
            continue;
        }
        let parsed: std::result::Result<Vec<u8>, _> =
            record.iter().map(|s| s.trim().parse::<u8>()).collect();
        let Ok(values) = parsed else {
            warn!(row = line + 1, "skipping row with non-numeric field");
            skipped += 1;
            continue;
        };
        let label = values[0] as usize;
        if label >= MNIST_OUTPUTS {
            warn!(row = line + 1, label, "skipping row with out-of-range label");
            skipped += 1;
            continue;
        }
        let input = pixels_to_input(&values[1..])?;
        samples.push(Sample::new(input, label, MNIST_OUTPUTS)?);
    }
    if samples.is_empty() {
        return Err(anyhow!("No MNIST samples loaded from {}", path.display()));
    }
    info!(path = %path.display(), samples = samples.len(), skipped, "loaded MNIST CSV");
    Ok(samples)
}

/// Decoded IDX file
#[derive(Debug)]
struct IdxData {
    sizes: Vec<usize>,
    data: Vec<u8>,
}

impl IdxData {
    fn parse(contents: &[u8]) -> Result<Self> {
        let mut r = Cursor::new(contents);
        let magic = r.read_i32::<BigEndian>().context("Read magic")?;
        let dims = match magic {
            2049 => 1,
            2051 => 3,
            _ => return Err(anyhow!("Invalid magic: {}", magic)),
        };
        let mut sizes = Vec::with_capacity(dims);
        for _ in 0..dims {
            let d = r.read_i32::<BigEndian>().context("Read dimension")?;
            sizes.push(usize::try_from(d).map_err(|_| anyhow!("Negative dimension {}", d))?);
        }
        let expected = sizes
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| anyhow!("IDX dimensions overflow: {:?}", sizes))?;
        let mut data = Vec::new();
        r.read_to_end(&mut data).context("Read data")?;
        if data.len() < expected {
            return Err(anyhow!("IDX payload has {} bytes, expected {}", data.len(), expected));
        }
        Ok(Self { sizes, data })
    }

    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let mut gz = GzDecoder::new(file);
        let mut contents = Vec::new();
        gz.read_to_end(&mut contents)
            .with_context(|| format!("Gzip read error in {}", path.display()))?;
        Self::parse(&contents)
    }
}

/// Load MNIST from a gzipped IDX image/label pair, e.g.
/// `train-images-idx3-ubyte.gz` and `train-labels-idx1-ubyte.gz`.
pub fn load_mnist_idx<F: Element>(
    images: impl AsRef<Path>,
    labels: impl AsRef<Path>,
) -> Result<Vec<Sample<F>>> {
    let image_data = IdxData::open(images.as_ref())?;
    let label_data = IdxData::open(labels.as_ref())?;
    if image_data.sizes.len() != 3 || label_data.sizes.len() != 1 {
        return Err(anyhow!("Expected an idx3 image file and an idx1 label file"));
    }
    let image_size = image_data.sizes[1]
        .checked_mul(image_data.sizes[2])
        .ok_or_else(|| anyhow!("IDX dimensions overflow"))?;
    if image_size != MNIST_INPUTS {
        return Err(anyhow!("Expected 28x28 images, got {} pixels", image_size));
    }
    let count = label_data.sizes[0].min(image_data.sizes[0]);
    let mut samples = Vec::with_capacity(count);
    let mut skipped = 0usize;
    let images = image_data.data.chunks_exact(image_size).take(count);
    for (i, (pixels, &label)) in images.zip(&label_data.data).enumerate() {
        let label = label as usize;
        if label >= MNIST_OUTPUTS {
            warn!(item = i, label, "skipping image with out-of-range label");
            skipped += 1;
            continue;
        }
        samples.push(Sample::new(pixels_to_input(pixels)?, label, MNIST_OUTPUTS)?);
    }
    if samples.is_empty() {
        return Err(anyhow!("No MNIST data loaded"));
    }
    info!(samples = samples.len(), skipped, "loaded MNIST IDX");
    Ok(samples)
}
