use futures_util::{stream, StreamExt};
use tokio_util::sync::CancellationToken;

use collector_core::{partition, CommitOutcome, Resolution, RunStats, WorkItem, STATUS_ERROR};
use engine_logging::{engine_error, engine_info, engine_warn};

use crate::chain::StrategyChain;
use crate::ledger::{Ledger, LedgerError};
use crate::pacing::Pacer;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Items per batch. Kept small so the inter-batch pauses dominate the
    /// traffic pattern.
    pub batch_size: usize,
    /// Worker pool size within a batch; 1 means fully sequential.
    pub workers: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_size: 3,
            workers: 1,
        }
    }
}

/// Drive the whole run: scan the ledger, partition into batches, resolve
/// every item through the chain, and commit each outcome as it lands.
///
/// Batches are strictly sequential; only items inside one batch may overlap,
/// bounded by `workers`. A cancelled token finishes the in-flight batch and
/// skips the rest. The only error this returns is a failed initial ledger
/// scan; everything per-item is logged and absorbed.
pub async fn run(
    ledger: &dyn Ledger,
    chain: &StrategyChain,
    pacer: &Pacer,
    config: &SchedulerConfig,
    cancel: &CancellationToken,
) -> Result<RunStats, LedgerError> {
    let pending = ledger.list_pending().await?;
    if pending.is_empty() {
        engine_info!("No pending terms; nothing to do");
        return Ok(RunStats::default());
    }
    engine_info!(
        "Starting run: {} pending term(s), batch size {}, {} worker(s)",
        pending.len(),
        config.batch_size,
        config.workers
    );

    // Sequence numbers are fixed up front, in ledger order, so concurrent
    // completion order cannot perturb them.
    let numbered: Vec<(u32, WorkItem)> = pending
        .into_iter()
        .enumerate()
        .map(|(idx, item)| (idx as u32 + 1, item))
        .collect();
    let batches = partition(numbered, config.batch_size);
    let batch_count = batches.len();

    let mut stats = RunStats::default();
    for (batch_index, batch) in batches.into_iter().enumerate() {
        if cancel.is_cancelled() {
            engine_warn!(
                "Cancellation requested; skipping remaining {} batch(es)",
                batch_count - batch_index
            );
            break;
        }

        run_batch(ledger, chain, config.workers, batch, &mut stats).await;

        let is_last = batch_index + 1 == batch_count;
        if !is_last && !cancel.is_cancelled() {
            pacer.batch_pause().await;
        }
    }

    engine_info!(
        "Run complete: {} processed, {} collected, {} failed",
        stats.processed,
        stats.succeeded,
        stats.failed
    );
    Ok(stats)
}

async fn run_batch(
    ledger: &dyn Ledger,
    chain: &StrategyChain,
    workers: usize,
    batch: Vec<(u32, WorkItem)>,
    stats: &mut RunStats,
) {
    let workers = workers.max(1);
    let mut outcomes = stream::iter(batch.into_iter().map(|(sequence, item)| async move {
        let resolution = chain.resolve(&item.term).await;
        (sequence, item, resolution)
    }))
    .buffer_unordered(workers);

    // Commits happen here, one at a time, so no two tasks ever write the
    // same row and the ledger client needs no internal locking.
    while let Some((sequence, item, resolution)) = outcomes.next().await {
        stats.record(&resolution);
        commit_outcome(ledger, sequence, &item, &resolution).await;
    }
}

async fn commit_outcome(
    ledger: &dyn Ledger,
    sequence: u32,
    item: &WorkItem,
    resolution: &Resolution,
) {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let outcome = CommitOutcome::from_resolution(resolution, sequence, timestamp.clone());
    if let Err(err) = ledger.commit(item.row, &outcome).await {
        // One row's write failure must not stop the run.
        engine_error!(
            "Failed to commit {} for term {:?}: {err}",
            item.row,
            item.term
        );
        // Best effort: leave an error mark so the row is visibly faulted
        // rather than silently unresolved.
        let error_mark = CommitOutcome {
            results: None,
            status: STATUS_ERROR.to_string(),
            timestamp,
            sequence,
        };
        if let Err(err) = ledger.commit(item.row, &error_mark).await {
            engine_error!("Could not even mark {} as errored: {err}", item.row);
        }
    }
}
