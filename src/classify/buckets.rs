//! Per-outcome accumulators owned by the single classify collector.

use crossbeam_channel::{Receiver, Sender};
use log::debug;

use crate::Record;
use crate::error::PipelineError;
use crate::pipeline::CollectorCounts;
use crate::store::DocumentStore;

use super::outcome::{Classified, Outcome, OutcomeSinks};

/// One accumulating batch per outcome, each with its own flush trigger.
#[derive(Debug)]
pub struct OutcomeBuckets {
    threshold: usize,
    pending: [Vec<Record>; 3],
    routed: [usize; 3],
}

impl OutcomeBuckets {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold: threshold.max(1),
            pending: Default::default(),
            routed: [0; 3],
        }
    }

    /// Add one item. Returns the bucket's contents when it reaches the threshold.
    pub fn push(&mut self, item: Classified) -> Option<(Outcome, Vec<Record>)> {
        let idx = item.outcome.index();
        self.routed[idx] += 1;
        let bucket = &mut self.pending[idx];
        bucket.push(item.record);
        if bucket.len() >= self.threshold {
            let full = std::mem::replace(bucket, Vec::with_capacity(self.threshold));
            return Some((item.outcome, full));
        }
        None
    }

    /// Take what is left in every bucket, in [`Outcome::ALL`] order, skipping empty ones.
    pub fn drain(&mut self) -> Vec<(Outcome, Vec<Record>)> {
        Outcome::ALL
            .into_iter()
            .filter_map(|outcome| {
                let bucket = std::mem::take(&mut self.pending[outcome.index()]);
                (!bucket.is_empty()).then_some((outcome, bucket))
            })
            .collect()
    }

    pub fn pending(&self, outcome: Outcome) -> usize {
        self.pending[outcome.index()].len()
    }

    /// Items routed to `outcome` so far, flushed or not.
    pub fn routed(&self, outcome: Outcome) -> usize {
        self.routed[outcome.index()]
    }
}

/// Receive classified items until the output closes, flushing each bucket to its sink at the
/// threshold, then flush every non-empty bucket in sequence.
pub(crate) fn run_bucket_collector<S>(
    out_rx: Receiver<Classified>,
    buckets: &mut OutcomeBuckets,
    store: &S,
    sinks: &OutcomeSinks,
    err_tx: Sender<PipelineError>,
) -> CollectorCounts
where
    S: DocumentStore + ?Sized,
{
    let mut counts = CollectorCounts::default();
    let flush = |outcome: Outcome, records: Vec<Record>, counts: &mut CollectorCounts| {
        let collection = sinks.collection(outcome);
        debug!("Flushing {} {} records to {}", records.len(), outcome.label(), collection);
        let result = store
            .insert_many(collection, &records)
            .map(|_| ())
            .map_err(PipelineError::from);
        counts.record(records.len(), result, &err_tx);
    };

    while let Ok(item) = out_rx.recv() {
        if let Some((outcome, full)) = buckets.push(item) {
            flush(outcome, full, &mut counts);
        }
    }
    for (outcome, rest) in buckets.drain() {
        flush(outcome, rest, &mut counts);
    }
    counts
}
