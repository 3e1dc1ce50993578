//! Dispatch configuration, the tuning derived from it, and the channels one run uses.

use crossbeam_channel::{Receiver, Sender, bounded};
use log::debug;
use std::time::Duration;

use crate::error::{ConfigError, PipelineError};
use crate::utils::config::{DEFAULT_BATCH_SIZE, UNBOUNDED_BATCH_CAP};

/// Collector batch threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchSize {
    Fixed(usize),
    /// Resolves to [`UNBOUNDED_BATCH_CAP`]; a batch is never truly unlimited.
    Unbounded,
}

impl Default for BatchSize {
    fn default() -> Self {
        BatchSize::Fixed(DEFAULT_BATCH_SIZE)
    }
}

/// Caller-facing configuration for a [`Dispatcher`](super::Dispatcher).
#[derive(Clone, Debug, Default)]
pub struct DispatchConfig {
    /// Worker thread count. When None, available parallelism (rayon's thread count).
    pub workers: Option<usize>,
    pub batch_size: BatchSize,
    /// Fixed interval the producer waits before each push. Throttles the feed, not the workers.
    pub rate_limit: Option<Duration>,
}

/// Validated values a run actually uses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineTuning {
    pub workers: usize,
    pub batch_size: usize,
    /// Output channel capacity: `batch_size / workers`, at least 1.
    pub output_cap: usize,
    pub rate_limit: Option<Duration>,
}

impl PipelineTuning {
    /// Validate `config`. Zero workers, a zero batch size or a zero interval are rejected.
    pub fn resolve(config: &DispatchConfig) -> Result<Self, ConfigError> {
        let workers = config.workers.unwrap_or_else(rayon::current_num_threads);
        if workers == 0 {
            return Err(ConfigError::new("workers", "must be at least 1"));
        }
        let batch_size = match config.batch_size {
            BatchSize::Fixed(0) => {
                return Err(ConfigError::new("batch_size", "must be at least 1"));
            }
            BatchSize::Fixed(n) if n > UNBOUNDED_BATCH_CAP => {
                debug!("Clamping batch size {} -> {}", n, UNBOUNDED_BATCH_CAP);
                UNBOUNDED_BATCH_CAP
            }
            BatchSize::Fixed(n) => n,
            BatchSize::Unbounded => UNBOUNDED_BATCH_CAP,
        };
        if config.rate_limit.is_some_and(|interval| interval.is_zero()) {
            return Err(ConfigError::new(
                "rate_limit",
                "interval must be greater than zero",
            ));
        }
        Ok(Self {
            workers,
            batch_size,
            output_cap: (batch_size / workers).max(1),
            rate_limit: config.rate_limit,
        })
    }
}

/// Counters for one finished run. Printing a summary is up to the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Items the producer pushed into the input channel.
    pub dispatched: usize,
    /// Items a worker turned into a result.
    pub processed: usize,
    /// Items a worker consumed without producing a result (e.g. cache hits).
    pub skipped: usize,
    /// Items whose worker call returned an error.
    pub failed: usize,
    /// Flushes performed, the terminal one included.
    pub batches: usize,
    /// Results inside batches the sink accepted.
    pub flushed_items: usize,
    /// Flushes the sink rejected.
    pub write_failures: usize,
    /// Errors seen by the drain (item failures plus write failures).
    pub errors: usize,
}

impl DispatchStats {
    /// Items with a known fate; equals `dispatched` after every run.
    pub fn accounted(&self) -> usize {
        self.processed + self.skipped + self.failed
    }
}

/// Channels for one run. The producer gets `in_tx`; workers get `in_rx`, `out_tx`, `err_tx`;
/// the collector gets `out_rx` and an `err_tx` clone; the drain gets `err_rx`.
pub struct PipelineChannels<T, E> {
    pub in_tx: Sender<T>,
    pub in_rx: Receiver<T>,
    pub out_tx: Sender<E>,
    pub out_rx: Receiver<E>,
    pub err_tx: Sender<PipelineError>,
    pub err_rx: Receiver<PipelineError>,
}

/// Input is a rendezvous channel so the producer never runs ahead of the workers; output is
/// bounded by `output_cap`; the error channel holds one pending error per worker.
pub fn create_pipeline_channels<T, E>(tuning: &PipelineTuning) -> PipelineChannels<T, E> {
    let (in_tx, in_rx) = bounded::<T>(0);
    let (out_tx, out_rx) = bounded::<E>(tuning.output_cap);
    let (err_tx, err_rx) = bounded::<PipelineError>(tuning.workers);
    PipelineChannels {
        in_tx,
        in_rx,
        out_tx,
        out_rx,
        err_tx,
        err_rx,
    }
}
