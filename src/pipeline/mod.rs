//! Pipeline components: context, feed loop, workers, batched collector, error drain.

pub mod collector;
pub mod context;
pub mod error_handler;
pub mod orchestrator;
pub mod producer;
pub mod worker;

pub use collector::{Batch, CollectorCounts, run_batch_collector};
pub use context::{
    BatchSize, DispatchConfig, DispatchStats, PipelineChannels, PipelineTuning,
    create_pipeline_channels,
};
pub use error_handler::{ErrorHook, drain_errors};
pub use orchestrator::Dispatcher;
pub(crate) use orchestrator::run_stages;
pub use producer::run_feed_loop;
pub use worker::{WorkerCounts, spawn_workers};
