//! Dispatcher tests: accounting, batching, error routing, configuration, stop flag, throttle.

use sbomflow::pipeline::{Batch, PipelineTuning};
use sbomflow::{
    BatchSize, DispatchConfig, Dispatcher, ParseError, PersistenceError, PipelineError,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

fn config(workers: usize, batch: usize) -> DispatchConfig {
    DispatchConfig {
        workers: Some(workers),
        batch_size: BatchSize::Fixed(batch),
        rate_limit: None,
    }
}

/// (len, sequence, terminal) per flush.
fn shape<E>(batch: &Batch<E>) -> (usize, usize, bool) {
    (batch.len(), batch.sequence, batch.terminal)
}

// --- accounting and batching ---

#[test]
fn test_every_item_processed_exactly_once() {
    const N: u32 = 101;
    for workers in [1, 2, 3, 8] {
        for batch in [1, 7, 13, 200] {
            let mut dispatcher = Dispatcher::new(&config(workers, batch)).unwrap();
            let mut seen = Vec::new();
            let stats = dispatcher.dispatch(
                0..N,
                |n: u32| Ok(n * 2),
                |batch| {
                    seen.extend(batch.items);
                    Ok(())
                },
            );
            let case = format!("workers={workers} batch={batch}");
            assert_eq!(stats.dispatched, N as usize, "{case}");
            assert_eq!(stats.processed, N as usize, "{case}");
            assert_eq!(stats.accounted(), stats.dispatched, "{case}");
            assert_eq!(stats.flushed_items, N as usize, "{case}");
            assert_eq!(stats.errors, 0, "{case}");
            assert_eq!(stats.batches, N as usize / batch + 1, "{case}");

            let unique: HashSet<u32> = seen.iter().copied().collect();
            assert_eq!(seen.len(), N as usize, "{case}");
            assert_eq!(unique, (0..N).map(|n| n * 2).collect(), "{case}");
        }
    }
}

#[test]
fn test_batches_are_full_until_terminal() {
    let mut dispatcher = Dispatcher::new(&config(2, 3)).unwrap();
    let mut shapes = Vec::new();
    let stats = dispatcher.dispatch(
        0..10,
        |n: i32| Ok(n),
        |batch| {
            shapes.push(shape(&batch));
            Ok(())
        },
    );
    assert_eq!(
        shapes,
        vec![(3, 0, false), (3, 1, false), (3, 2, false), (1, 3, true)]
    );
    assert_eq!(stats.batches, 4);
}

#[test]
fn test_exact_multiple_still_gets_empty_terminal_flush() {
    let mut dispatcher = Dispatcher::new(&config(3, 5)).unwrap();
    let mut shapes = Vec::new();
    dispatcher.dispatch(
        0..10,
        |n: i32| Ok(n),
        |batch| {
            shapes.push(shape(&batch));
            Ok(())
        },
    );
    assert_eq!(shapes, vec![(5, 0, false), (5, 1, false), (0, 2, true)]);
}

#[test]
fn test_empty_producer_flushes_once() {
    let mut dispatcher = Dispatcher::new(&DispatchConfig::default()).unwrap();
    let mut shapes = Vec::new();
    let stats = dispatcher.dispatch(
        Vec::<String>::new(),
        |s: String| Ok(s.len()),
        |batch| {
            shapes.push(shape(&batch));
            Ok(())
        },
    );
    assert_eq!(shapes, vec![(0, 0, true)]);
    assert_eq!(stats.dispatched, 0);
    assert_eq!(stats.batches, 1);
}

#[test]
fn test_single_worker_single_item_batch() {
    let mut dispatcher = Dispatcher::new(&config(1, 1)).unwrap();
    let mut shapes = Vec::new();
    dispatcher.dispatch(
        ["only"],
        |s: &str| Ok(s.to_uppercase()),
        |batch| {
            shapes.push(shape(&batch));
            Ok(())
        },
    );
    assert_eq!(shapes, vec![(1, 0, false), (0, 1, true)]);
}

// --- errors ---

#[test]
fn test_worker_errors_are_drained_and_run_continues() {
    let reported = Mutex::new(Vec::new());
    let mut dispatcher = Dispatcher::new(&config(3, 4))
        .unwrap()
        .on_error(|err| reported.lock().unwrap().push(err.kind()));
    let mut written = 0;
    let stats = dispatcher.dispatch(
        0..20,
        |n: i32| {
            if n % 5 == 0 {
                Err(ParseError::record(format!("item-{n}"), "divisible by five").into())
            } else {
                Ok(n)
            }
        },
        |batch| {
            written += batch.len();
            Ok(())
        },
    );
    assert_eq!(stats.failed, 4);
    assert_eq!(stats.processed, 16);
    assert_eq!(stats.errors, 4);
    assert_eq!(written, 16);
    assert_eq!(*reported.lock().unwrap(), vec!["parse"; 4]);
}

#[test]
fn test_failed_write_is_reported_and_later_batches_still_run() {
    let reported = AtomicUsize::new(0);
    let mut dispatcher = Dispatcher::new(&config(2, 2))
        .unwrap()
        .on_error(|err| {
            assert!(matches!(err, PipelineError::Persistence(_)));
            reported.fetch_add(1, Ordering::Relaxed);
        });
    let mut attempts = 0;
    let stats = dispatcher.dispatch(
        0..6,
        |n: i32| Ok(n),
        |_batch| {
            attempts += 1;
            if attempts == 1 {
                Err(PersistenceError::Poisoned.into())
            } else {
                Ok(())
            }
        },
    );
    // 3 full batches + terminal
    assert_eq!(attempts, 4);
    assert_eq!(stats.batches, 4);
    assert_eq!(stats.write_failures, 1);
    assert_eq!(stats.flushed_items, 4);
    assert_eq!(stats.errors, 1);
    assert_eq!(reported.load(Ordering::Relaxed), 1);
}

// --- configuration ---

#[test]
fn test_zero_workers_rejected() {
    let err = Dispatcher::new(&config(0, 10)).err().unwrap();
    assert_eq!(err.field, "workers");
}

#[test]
fn test_zero_batch_size_rejected() {
    let err = Dispatcher::new(&config(2, 0)).err().unwrap();
    assert_eq!(err.field, "batch_size");
}

#[test]
fn test_zero_rate_limit_rejected() {
    let cfg = DispatchConfig {
        rate_limit: Some(Duration::ZERO),
        ..config(2, 10)
    };
    let err = Dispatcher::new(&cfg).err().unwrap();
    assert_eq!(err.field, "rate_limit");
}

#[test]
fn test_output_buffer_is_batch_over_workers() {
    let tuning = PipelineTuning::resolve(&config(4, 200)).unwrap();
    assert_eq!(tuning.output_cap, 50);
    let tuning = PipelineTuning::resolve(&config(8, 3)).unwrap();
    assert_eq!(tuning.output_cap, 1);
}

#[test]
fn test_unbounded_and_oversized_batches_resolve_to_cap() {
    let unbounded = DispatchConfig {
        batch_size: BatchSize::Unbounded,
        ..config(2, 1)
    };
    assert_eq!(PipelineTuning::resolve(&unbounded).unwrap().batch_size, 10_000);
    assert_eq!(
        PipelineTuning::resolve(&config(2, usize::MAX)).unwrap().batch_size,
        10_000
    );
}

#[test]
fn test_default_config_uses_available_parallelism() {
    let tuning = PipelineTuning::resolve(&DispatchConfig::default()).unwrap();
    assert!(tuning.workers >= 1);
    assert_eq!(tuning.batch_size, 200);
    assert_eq!(tuning.rate_limit, None);
}

// --- stop flag and throttle ---

#[test]
fn test_stop_flag_raised_before_run_feeds_nothing() {
    let stop = Arc::new(AtomicBool::new(true));
    let mut dispatcher = Dispatcher::new(&config(2, 5))
        .unwrap()
        .with_stop_flag(stop);
    let mut shapes = Vec::new();
    let stats = dispatcher.dispatch(
        0..50,
        |n: i32| Ok(n),
        |batch| {
            shapes.push(shape(&batch));
            Ok(())
        },
    );
    assert_eq!(stats.dispatched, 0);
    assert_eq!(shapes, vec![(0, 0, true)]);
}

#[test]
fn test_stop_flag_raised_mid_run_drains_in_flight() {
    let stop = Arc::new(AtomicBool::new(false));
    let mut dispatcher = Dispatcher::new(&config(2, 4))
        .unwrap()
        .with_stop_flag(Arc::clone(&stop));
    let mut written = 0;
    let stats = dispatcher.dispatch(
        0..1_000,
        |n: i32| {
            if n == 10 {
                stop.store(true, Ordering::Relaxed);
            }
            Ok(n)
        },
        |batch| {
            written += batch.len();
            Ok(())
        },
    );
    assert!(stats.dispatched < 1_000);
    assert_eq!(stats.accounted(), stats.dispatched);
    assert_eq!(written, stats.dispatched);
}

#[test]
fn test_rate_limit_spaces_out_the_feed() {
    let cfg = DispatchConfig {
        rate_limit: Some(Duration::from_millis(20)),
        ..config(4, 10)
    };
    let mut dispatcher = Dispatcher::new(&cfg).unwrap();
    let start = Instant::now();
    let stats = dispatcher.dispatch(0..5, |n: i32| Ok(n), |_batch| Ok(()));
    assert_eq!(stats.processed, 5);
    assert!(start.elapsed() >= Duration::from_millis(80));
}
