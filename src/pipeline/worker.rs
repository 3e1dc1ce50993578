use crossbeam_channel::{Receiver, Sender};
use std::thread::{Scope, ScopedJoinHandle};

use crate::error::PipelineError;

/// What one worker did with the items it pulled.
#[derive(Clone, Copy, Debug, Default)]
pub struct WorkerCounts {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl WorkerCounts {
    pub fn add(&mut self, other: WorkerCounts) {
        self.processed += other.processed;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Single worker: pull until the input closes. `Ok(Some)` goes to the output, `Ok(None)` is
/// a skip, `Err` goes to the error channel and the loop carries on.
fn worker_loop<T, E, W>(
    in_rx: Receiver<T>,
    out_tx: Sender<E>,
    err_tx: Sender<PipelineError>,
    work: &W,
) -> WorkerCounts
where
    W: Fn(T) -> Result<Option<E>, PipelineError>,
{
    let mut counts = WorkerCounts::default();
    while let Ok(item) = in_rx.recv() {
        match work(item) {
            Ok(Some(result)) => {
                counts.processed += 1;
                if out_tx.send(result).is_err() {
                    break;
                }
            }
            Ok(None) => counts.skipped += 1,
            Err(err) => {
                counts.failed += 1;
                let _ = err_tx.send(err);
            }
        }
    }
    counts
}

/// Spawn `count` workers on `scope`, each holding its own clones of the channel ends.
/// The caller keeps the originals and drops them to drive shutdown.
pub fn spawn_workers<'scope, T, E, W>(
    scope: &'scope Scope<'scope, '_>,
    count: usize,
    in_rx: &Receiver<T>,
    out_tx: &Sender<E>,
    err_tx: &Sender<PipelineError>,
    work: &'scope W,
) -> Vec<ScopedJoinHandle<'scope, WorkerCounts>>
where
    T: Send + 'scope,
    E: Send + 'scope,
    W: Fn(T) -> Result<Option<E>, PipelineError> + Sync,
{
    (0..count)
        .map(|_| {
            let in_rx = in_rx.clone();
            let out_tx = out_tx.clone();
            let err_tx = err_tx.clone();
            scope.spawn(move || worker_loop(in_rx, out_tx, err_tx, work))
        })
        .collect()
}
