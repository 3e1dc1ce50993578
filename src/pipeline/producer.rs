//! Feed loop: pulls from the external producer and pushes into the input channel.

use crossbeam_channel::Sender;
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Push every item of `items` into `in_tx`, waiting on a fixed-interval tick before each push
/// when `rate_limit` is set. Stops early when `stop` is raised or every worker is gone.
/// Drops `in_tx` when done (closes the input). Returns the number of items pushed.
pub fn run_feed_loop<I, T>(
    items: I,
    in_tx: Sender<T>,
    rate_limit: Option<Duration>,
    stop: Option<&AtomicBool>,
) -> usize
where
    I: IntoIterator<Item = T>,
{
    let ticker = rate_limit.map(crossbeam_channel::tick);
    let mut count = 0_usize;
    for item in items {
        if stop.is_some_and(|s| s.load(Ordering::Relaxed)) {
            info!("Stop requested; no further items fed after {}", count);
            break;
        }
        if let Some(ref ticker) = ticker
            && ticker.recv().is_err()
        {
            break;
        }
        if in_tx.send(item).is_err() {
            debug!("input channel closed by workers after {} items", count);
            break;
        }
        count += 1;
    }
    drop(in_tx);
    count
}
