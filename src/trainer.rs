//! Epoch loops around [`Network::train`]: a sequential one and a
//! producer/consumer one fed through a [`WorkQueue`].
use crate::config::TrainConfig;
use crate::datasets::Sample;
use crate::element::Element;
use crate::network::Network;
use crate::queue::WorkQueue;
use crate::runner::{Runner, StopFlag};
use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::{debug, info};

/// Per-epoch average squared error of a training run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainReport {
    pub epoch_errors: Vec<f64>,
    pub steps: usize,
    pub stopped_early: bool,
}

impl TrainReport {
    pub fn final_error(&self) -> Option<f64> {
        self.epoch_errors.last().copied()
    }
}

#[derive(Debug, Clone, Copy)]
struct WorkItem {
    epoch: usize,
    index: usize,
}

/// Trainer
#[derive(Debug, Clone)]
pub struct Trainer {
    learning_rate: f64,
    epochs: usize,
    shuffle: bool,
    seed: Option<u64>,
    queue_capacity: usize,
}

impl Trainer {
    pub fn new(learning_rate: f64, epochs: usize) -> Self {
        Self {
            learning_rate,
            epochs,
            shuffle: false,
            seed: None,
            queue_capacity: 1024,
        }
    }

    pub fn from_config(cfg: &TrainConfig) -> Self {
        Self {
            learning_rate: cfg.learning_rate,
            epochs: cfg.epochs,
            shuffle: cfg.shuffle,
            seed: cfg.seed,
            queue_capacity: cfg.queue_capacity,
        }
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Sample visiting order for every epoch, shuffled when enabled.
    fn schedule(shuffle: bool, len: usize, rng: &mut StdRng) -> Vec<usize> {
        let mut order: Vec<usize> = (0..len).collect();
        if shuffle {
            order.shuffle(rng);
        }
        order
    }

    /// Trains on the calling thread, one sample at a time.
    pub fn fit<F: Element>(
        &self,
        network: &mut Network<F>,
        samples: &[Sample<F>],
    ) -> Result<TrainReport> {
        if samples.is_empty() {
            return Err(anyhow!("Dataset is empty"));
        }
        let lr = F::of(self.learning_rate);
        let mut rng = self.rng();
        let mut report = TrainReport::default();
        for epoch in 0..self.epochs {
            let mut total = 0.0;
            for idx in Self::schedule(self.shuffle, samples.len(), &mut rng) {
                let sample = &samples[idx];
                total += network.train(lr, &sample.input, &sample.target)?.as_f64();
                report.steps += 1;
            }
            let avg = total / samples.len() as f64;
            info!(epoch = epoch + 1, avg_error = avg, "epoch finished");
            report.epoch_errors.push(avg);
        }
        Ok(report)
    }

    /// Trains while a producer thread schedules samples through a bounded
    /// queue. Raising `stop` ends training after the current step.
    pub fn fit_concurrent<F: Element>(
        &self,
        network: &mut Network<F>,
        samples: &[Sample<F>],
        stop: &StopFlag,
    ) -> Result<TrainReport> {
        if samples.is_empty() {
            return Err(anyhow!("Dataset is empty"));
        }
        let queue = Arc::new(WorkQueue::bounded(self.queue_capacity));
        let producer = {
            let queue = Arc::clone(&queue);
            let (epochs, shuffle, len) = (self.epochs, self.shuffle, samples.len());
            let mut rng = self.rng();
            Runner::spawn("sample-producer", move |halt| {
                'epochs: for epoch in 0..epochs {
                    for index in Self::schedule(shuffle, len, &mut rng) {
                        if halt.is_raised() || !queue.push(WorkItem { epoch, index }) {
                            break 'epochs;
                        }
                    }
                }
                queue.finish();
            })?
        };

        let result = self.consume(network, samples, &queue, stop);
        queue.finish();
        producer.stop();
        if producer.join().is_err() {
            return Err(anyhow!("sample producer panicked"));
        }
        result
    }

    fn consume<F: Element>(
        &self,
        network: &mut Network<F>,
        samples: &[Sample<F>],
        queue: &WorkQueue<WorkItem>,
        stop: &StopFlag,
    ) -> Result<TrainReport> {
        let lr = F::of(self.learning_rate);
        let mut report = TrainReport::default();
        let mut current = 0usize;
        let (mut total, mut count) = (0.0, 0usize);

        while let Some(item) = queue.pop_blocking() {
            if stop.is_raised() {
                report.stopped_early = true;
                break;
            }
            if item.epoch != current {
                let avg = total / count.max(1) as f64;
                info!(epoch = current + 1, avg_error = avg, "epoch finished");
                report.epoch_errors.push(avg);
                current = item.epoch;
                total = 0.0;
                count = 0;
            }
            let sample = &samples[item.index];
            let err = network.train(lr, &sample.input, &sample.target)?.as_f64();
            debug!(epoch = item.epoch + 1, index = item.index, err, "trained sample");
            total += err;
            count += 1;
            report.steps += 1;
        }
        if count > 0 {
            let avg = total / count as f64;
            info!(epoch = current + 1, avg_error = avg, "epoch finished");
            report.epoch_errors.push(avg);
        }
        Ok(report)
    }
}
