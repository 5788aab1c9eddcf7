//! Collector core: pure work-item model, retry planning, and batching.
mod batch;
mod item;
mod retry;

pub use batch::partition;
pub use item::{
    join_terms, CommitOutcome, ExtractionResult, ItemStatus, Resolution, RowRef, RunStats,
    StrategyKind, WorkItem, STATUS_COLLECTED, STATUS_ERROR, STATUS_FAILED,
};
pub use retry::{Backoff, RetryPolicy};
