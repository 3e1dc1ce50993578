use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread;

use crate::error::{ConfigError, PipelineError};

use super::collector::{Batch, CollectorCounts, run_batch_collector};
use super::context::{
    DispatchConfig, DispatchStats, PipelineChannels, PipelineTuning, create_pipeline_channels,
};
use super::error_handler::{ErrorHook, drain_errors};
use super::producer::run_feed_loop;
use super::worker::{WorkerCounts, spawn_workers};

/// Bounded producer → worker pool → batched collector engine.
///
/// ```ignore
/// let mut dispatcher = Dispatcher::new(&DispatchConfig::default())?;
/// let stats = dispatcher.dispatch(paths, |p| read_sbom(&p), |batch| store_batch(&batch.items));
/// ```
pub struct Dispatcher<'a> {
    tuning: PipelineTuning,
    stop: Option<Arc<AtomicBool>>,
    on_error: Option<Box<ErrorHook<'a>>>,
}

impl<'a> Dispatcher<'a> {
    /// Validate `config`. This is the only place a run can fail.
    pub fn new(config: &DispatchConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            tuning: PipelineTuning::resolve(config)?,
            stop: None,
            on_error: None,
        })
    }

    pub fn tuning(&self) -> &PipelineTuning {
        &self.tuning
    }

    /// Once `stop` is raised the producer feeds no more items; in-flight items still drain.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Called by the error drain for every reported error.
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&PipelineError) + Send + 'a,
    {
        self.on_error = Some(Box::new(hook));
        self
    }

    /// Run `work` over every item of `producer` and hand results to `collector` in batches.
    /// Blocks until input is exhausted, every batch is flushed and every error drained.
    pub fn dispatch<T, E, I, W, C>(&mut self, producer: I, work: W, collector: C) -> DispatchStats
    where
        I: IntoIterator<Item = T>,
        T: Send,
        E: Send,
        W: Fn(T) -> Result<E, PipelineError> + Sync,
        C: FnMut(Batch<E>) -> Result<(), PipelineError> + Send,
    {
        let batch_size = self.tuning.batch_size;
        let work = |item: T| work(item).map(Some);
        run_stages(
            &self.tuning,
            self.stop.as_deref(),
            self.on_error.as_deref_mut(),
            producer,
            &work,
            move |out_rx, err_tx| run_batch_collector(out_rx, batch_size, err_tx, collector),
        )
    }
}

/// Wire the stages together and run them to completion on scoped threads.
///
/// Shutdown order: input closes when the producer is exhausted → workers joined → output
/// closed → collector joined → error channel closed → drain joined.
pub(crate) fn run_stages<T, E, I, W, S>(
    tuning: &PipelineTuning,
    stop: Option<&AtomicBool>,
    on_error: Option<&mut ErrorHook<'_>>,
    producer: I,
    work: &W,
    collect: S,
) -> DispatchStats
where
    I: IntoIterator<Item = T>,
    T: Send,
    E: Send,
    W: Fn(T) -> Result<Option<E>, PipelineError> + Sync,
    S: FnOnce(Receiver<E>, Sender<PipelineError>) -> CollectorCounts + Send,
{
    let PipelineChannels {
        in_tx,
        in_rx,
        out_tx,
        out_rx,
        err_tx,
        err_rx,
    } = create_pipeline_channels::<T, E>(tuning);

    debug!(
        "pipeline: {} workers, batch size {}, output cap {}, rate limit {:?}",
        tuning.workers, tuning.batch_size, tuning.output_cap, tuning.rate_limit
    );

    let stats = thread::scope(|scope| {
        let drain = scope.spawn(move || drain_errors(err_rx, on_error));
        let collector = {
            let err_tx = err_tx.clone();
            scope.spawn(move || collect(out_rx, err_tx))
        };
        let workers = spawn_workers(scope, tuning.workers, &in_rx, &out_tx, &err_tx, work);
        drop(in_rx);

        let dispatched = run_feed_loop(producer, in_tx, tuning.rate_limit, stop);
        debug!("pipeline: input closed after {} items", dispatched);

        let mut worked = WorkerCounts::default();
        for handle in workers {
            match handle.join() {
                Ok(counts) => worked.add(counts),
                Err(_) => error!("worker thread panicked"),
            }
        }
        drop(out_tx);

        let collected = collector.join().unwrap_or_else(|_| {
            error!("collector thread panicked");
            CollectorCounts::default()
        });
        drop(err_tx);

        let errors = drain.join().unwrap_or_else(|_| {
            error!("error drain thread panicked");
            0
        });

        DispatchStats {
            dispatched,
            processed: worked.processed,
            skipped: worked.skipped,
            failed: worked.failed,
            batches: collected.batches,
            flushed_items: collected.flushed_items,
            write_failures: collected.write_failures,
            errors,
        }
    });

    info!(
        "Dispatched {} items: {} processed, {} skipped, {} failed; {} batches ({} items) written, {} write failures",
        stats.dispatched,
        stats.processed,
        stats.skipped,
        stats.failed,
        stats.batches - stats.write_failures,
        stats.flushed_items,
        stats.write_failures
    );
    stats
}
