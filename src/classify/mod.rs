//! Classifying cache: per-item cache check, external lookup, three-way routing, per-bucket
//! batched writes.

mod buckets;
mod cache;
mod outcome;

pub use buckets::OutcomeBuckets;
pub use cache::{COMPONENT_ID_FIELD, ClassifyConfig, ClassifyStats, ClassifyingCache};
pub use outcome::{Classified, Outcome, OutcomeSinks, QueryFailurePolicy};
