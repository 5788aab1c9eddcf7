use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use collector_core::{CommitOutcome, RowRef, WorkItem};

/// Data row of the ledger starts here; row 1 is the header.
pub const FIRST_DATA_ROW: u32 = 2;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger transport error: {0}")]
    Transport(String),
    #[error("ledger request failed with http status {0}")]
    Status(u16),
    #[error("required column {0:?} not found in header row")]
    MissingColumn(String),
    #[error("malformed ledger payload: {0}")]
    Malformed(String),
    #[error("no such ledger row: {0}")]
    UnknownRow(RowRef),
}

/// Column headers the pipeline reads and writes, resolved by name so the
/// sheet layout can move around without code changes.
#[derive(Debug, Clone)]
pub struct ColumnNames {
    pub sequence: String,
    pub timestamp: String,
    pub term: String,
    pub results: String,
    pub status: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            sequence: "No".to_string(),
            timestamp: "수집일시".to_string(),
            term: "키워드".to_string(),
            results: "연관키워드".to_string(),
            status: "수집상태".to_string(),
        }
    }
}

/// The external work ledger.
///
/// `list_pending` applies the canonical "already collected" gate: rows with
/// a non-empty results cell or an empty term never come back. `commit` is
/// called at most once per row per run by the scheduler and is last-write-
/// wins at the ledger, so a repeated commit with the same outcome is
/// harmless.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn list_pending(&self) -> Result<Vec<WorkItem>, LedgerError>;

    async fn commit(&self, row: RowRef, outcome: &CommitOutcome) -> Result<(), LedgerError>;
}

/// One row of the in-memory ledger, mirroring the sheet columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryRow {
    pub term: String,
    pub results: Option<String>,
    pub status: Option<String>,
    pub timestamp: Option<String>,
    pub sequence: Option<u32>,
}

impl MemoryRow {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            ..Self::default()
        }
    }

    pub fn resolved(term: impl Into<String>, results: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            results: Some(results.into()),
            ..Self::default()
        }
    }
}

/// In-process ledger used for offline runs and tests. Rows occupy sheet
/// positions starting at [`FIRST_DATA_ROW`].
#[derive(Debug, Default)]
pub struct MemoryLedger {
    rows: Mutex<Vec<MemoryRow>>,
}

impl MemoryLedger {
    pub fn new(rows: Vec<MemoryRow>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }

    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(terms.into_iter().map(MemoryRow::new).collect())
    }

    /// Snapshot of the current rows, for assertions and run summaries.
    pub fn rows(&self) -> Vec<MemoryRow> {
        self.rows.lock().expect("ledger lock").clone()
    }

    fn index_of(&self, row: RowRef) -> Option<usize> {
        (row.0 >= FIRST_DATA_ROW).then(|| (row.0 - FIRST_DATA_ROW) as usize)
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn list_pending(&self) -> Result<Vec<WorkItem>, LedgerError> {
        let rows = self.rows.lock().expect("ledger lock");
        Ok(rows
            .iter()
            .enumerate()
            .filter(|(_, row)| {
                let done = row
                    .results
                    .as_deref()
                    .is_some_and(|r| !r.trim().is_empty());
                !done && !row.term.trim().is_empty()
            })
            .map(|(idx, row)| {
                WorkItem::pending(RowRef(FIRST_DATA_ROW + idx as u32), row.term.trim())
            })
            .collect())
    }

    async fn commit(&self, row: RowRef, outcome: &CommitOutcome) -> Result<(), LedgerError> {
        let idx = self.index_of(row).ok_or(LedgerError::UnknownRow(row))?;
        let mut rows = self.rows.lock().expect("ledger lock");
        let slot = rows.get_mut(idx).ok_or(LedgerError::UnknownRow(row))?;
        if let Some(results) = &outcome.results {
            slot.results = Some(results.clone());
        }
        slot.status = Some(outcome.status.clone());
        slot.timestamp = Some(outcome.timestamp.clone());
        slot.sequence = Some(outcome.sequence);
        Ok(())
    }
}
