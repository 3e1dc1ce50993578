use crossbeam_channel::Receiver;
use log::warn;

use crate::error::PipelineError;

/// Hook the drain calls for every error, after logging it.
pub type ErrorHook<'a> = dyn FnMut(&PipelineError) + Send + 'a;

/// Consume the error channel until every sender is gone: log each error, pass it to
/// `on_error`, count it. Never influences control flow. Returns the count.
pub fn drain_errors(
    err_rx: Receiver<PipelineError>,
    mut on_error: Option<&mut ErrorHook<'_>>,
) -> usize {
    let mut count = 0_usize;
    for err in err_rx.iter() {
        count += 1;
        warn!("{} error: {}", err.kind(), err);
        if let Some(hook) = on_error.as_deref_mut() {
            hook(&err);
        }
    }
    if count > 0 {
        warn!("{} error(s) reported during this run", count);
    }
    count
}
