//! Batched collector: accumulate results, flush at the threshold, flush once more at the end.

use crossbeam_channel::{Receiver, Sender};
use log::debug;

use crate::error::PipelineError;

/// Results handed to the sink in one flush.
///
/// Every batch but the terminal one holds exactly the configured batch size. The terminal
/// batch is delivered exactly once per run and may be smaller, or empty.
#[derive(Debug)]
pub struct Batch<E> {
    pub items: Vec<E>,
    /// 0-based flush number within the run.
    pub sequence: usize,
    pub terminal: bool,
}

impl<E> Batch<E> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Flush bookkeeping for one collector.
#[derive(Clone, Copy, Debug, Default)]
pub struct CollectorCounts {
    pub batches: usize,
    pub flushed_items: usize,
    pub write_failures: usize,
}

impl CollectorCounts {
    /// Record the outcome of one flush of `n` items; rejected flushes go to `err_tx`.
    pub fn record(
        &mut self,
        n: usize,
        outcome: Result<(), PipelineError>,
        err_tx: &Sender<PipelineError>,
    ) {
        self.batches += 1;
        match outcome {
            Ok(()) => self.flushed_items += n,
            Err(err) => {
                self.write_failures += 1;
                let _ = err_tx.send(err);
            }
        }
    }
}

/// Receive until the output channel closes, handing full batches to `sink`, then hand over
/// the terminal batch. A failed flush is reported and the next batch is still attempted.
pub fn run_batch_collector<E, C>(
    out_rx: Receiver<E>,
    batch_size: usize,
    err_tx: Sender<PipelineError>,
    mut sink: C,
) -> CollectorCounts
where
    C: FnMut(Batch<E>) -> Result<(), PipelineError>,
{
    let mut counts = CollectorCounts::default();
    let mut items = Vec::with_capacity(batch_size);

    while let Ok(result) = out_rx.recv() {
        items.push(result);
        if items.len() >= batch_size {
            let full = std::mem::replace(&mut items, Vec::with_capacity(batch_size));
            flush_batch(&mut sink, full, false, &mut counts, &err_tx);
        }
    }

    debug!("collector: output closed, final flush of {} items", items.len());
    flush_batch(&mut sink, items, true, &mut counts, &err_tx);
    counts
}

fn flush_batch<E, C>(
    sink: &mut C,
    items: Vec<E>,
    terminal: bool,
    counts: &mut CollectorCounts,
    err_tx: &Sender<PipelineError>,
) where
    C: FnMut(Batch<E>) -> Result<(), PipelineError>,
{
    let n = items.len();
    let batch = Batch {
        items,
        sequence: counts.batches,
        terminal,
    };
    counts.record(n, sink(batch), err_tx);
}
