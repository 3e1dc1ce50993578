use log::{debug, info};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crate::error::{ConfigError, PersistenceError, PipelineError};
use crate::pipeline::{BatchSize, DispatchConfig, PipelineTuning, run_stages};
use crate::source::{MetadataSource, SearchResponse};
use crate::store::DocumentStore;
use crate::utils::config::{BUCKET_THRESHOLD, CLASSIFY_WORKERS};
use crate::{ComponentRef, Record};

use super::buckets::{OutcomeBuckets, run_bucket_collector};
use super::outcome::{Classified, Outcome, OutcomeSinks, QueryFailurePolicy};

/// Field every sink record carries and every sink is indexed on.
pub const COMPONENT_ID_FIELD: &str = "component_id";

#[derive(Clone, Debug)]
pub struct ClassifyConfig {
    pub workers: usize,
    /// Per-bucket flush threshold.
    pub bucket_threshold: usize,
    pub sinks: OutcomeSinks,
    pub query_failure: QueryFailurePolicy,
    pub rate_limit: Option<Duration>,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            workers: CLASSIFY_WORKERS,
            bucket_threshold: BUCKET_THRESHOLD,
            sinks: OutcomeSinks::default(),
            query_failure: QueryFailurePolicy::default(),
            rate_limit: None,
        }
    }
}

/// Counters for one [`ClassifyingCache::fill`] run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassifyStats {
    pub dispatched: usize,
    /// Cache hits: skipped without a query or a write.
    pub cached: usize,
    pub resolved: usize,
    pub ambiguous: usize,
    pub unresolved: usize,
    /// Lookup, query (under [`QueryFailurePolicy::Report`]) and write errors.
    pub errors: usize,
    /// Bucket flushes performed.
    pub batches: usize,
}

#[derive(Serialize)]
struct ResolvedEntry<'a> {
    component_id: &'a str,
    mvn_search_response: &'a SearchResponse,
}

#[derive(Serialize)]
struct ComponentEntry<'a> {
    component_id: &'a str,
}

/// Fan-out cache: each component is looked up in the three sinks, and on a miss searched for
/// and routed into the sink matching the hit count.
pub struct ClassifyingCache<S, M> {
    store: S,
    source: M,
    config: ClassifyConfig,
    tuning: PipelineTuning,
    stop: Option<Arc<AtomicBool>>,
}

impl<S, M> ClassifyingCache<S, M>
where
    S: DocumentStore,
    M: MetadataSource,
{
    pub fn new(store: S, source: M, config: ClassifyConfig) -> Result<Self, ConfigError> {
        if config.bucket_threshold == 0 {
            return Err(ConfigError::new("bucket_threshold", "must be at least 1"));
        }
        let tuning = PipelineTuning::resolve(&DispatchConfig {
            workers: Some(config.workers),
            batch_size: BatchSize::Fixed(config.bucket_threshold),
            rate_limit: config.rate_limit,
        })?;
        Ok(Self {
            store,
            source,
            config,
            tuning,
            stop: None,
        })
    }

    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn config(&self) -> &ClassifyConfig {
        &self.config
    }

    /// Index `component_id` on all three sinks. Returns how many indexes were created.
    pub fn ensure_indexes(&self) -> Result<usize, PersistenceError> {
        let mut created = 0;
        for outcome in Outcome::ALL {
            let sink = self.config.sinks.collection(outcome);
            if self.store.ensure_index(sink, COMPONENT_ID_FIELD)? {
                created += 1;
            }
        }
        Ok(created)
    }

    /// True if any sink already holds `component_id`.
    pub fn is_cached(&self, component_id: &str) -> Result<bool, PersistenceError> {
        for outcome in Outcome::ALL {
            if self
                .store
                .contains(self.config.sinks.collection(outcome), component_id)?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Classify one component. `Ok(None)` is a cache hit.
    pub fn classify(&self, item: &ComponentRef) -> Result<Option<Classified>, PipelineError> {
        if self.is_cached(&item.id)? {
            debug!("{} ({}) found in cache", item.id, item.name);
            return Ok(None);
        }

        let response = match self.source.query(&item.name) {
            Ok(response) => Some(response),
            Err(err) => match self.config.query_failure {
                QueryFailurePolicy::Unresolved => {
                    debug!("Query for {} failed, routing to unresolved: {}", item.name, err);
                    None
                }
                QueryFailurePolicy::Report => return Err(err.into()),
            },
        };

        let outcome = response
            .as_ref()
            .map_or(Outcome::Unresolved, |r| Outcome::from_count(r.num_found));
        let sink = self.config.sinks.collection(outcome);
        let record = match (outcome, &response) {
            (Outcome::Resolved, Some(found)) => Record::from_value(
                item.id.as_str(),
                &ResolvedEntry {
                    component_id: &item.id,
                    mvn_search_response: found,
                },
            ),
            _ => Record::from_value(
                item.id.as_str(),
                &ComponentEntry {
                    component_id: &item.id,
                },
            ),
        }
        .map_err(|e| PersistenceError::json(sink, e))?;

        Ok(Some(Classified { outcome, record }))
    }

    /// Run every component of `items` through the cache and write the outcomes.
    pub fn fill<I>(&self, items: I) -> ClassifyStats
    where
        I: IntoIterator<Item = ComponentRef>,
    {
        let mut buckets = OutcomeBuckets::new(self.config.bucket_threshold);
        let work = |item: ComponentRef| self.classify(&item);
        let store = &self.store;
        let sinks = &self.config.sinks;
        let bucket_ref = &mut buckets;

        let run = run_stages(
            &self.tuning,
            self.stop.as_deref(),
            None,
            items,
            &work,
            move |out_rx, err_tx| run_bucket_collector(out_rx, bucket_ref, store, sinks, err_tx),
        );

        let stats = ClassifyStats {
            dispatched: run.dispatched,
            cached: run.skipped,
            resolved: buckets.routed(Outcome::Resolved),
            ambiguous: buckets.routed(Outcome::Ambiguous),
            unresolved: buckets.routed(Outcome::Unresolved),
            errors: run.errors,
            batches: run.batches,
        };
        info!(
            "Classified {} components: {} cached, {} resolved, {} ambiguous, {} unresolved, {} errors",
            stats.dispatched,
            stats.cached,
            stats.resolved,
            stats.ambiguous,
            stats.unresolved,
            stats.errors
        );
        stats
    }
}
