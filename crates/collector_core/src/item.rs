use std::fmt;

/// Status cell value written for a successfully resolved item.
pub const STATUS_COLLECTED: &str = "collected";
/// Status cell value written when every strategy round came up empty.
pub const STATUS_FAILED: &str = "failed";
/// Status cell value marking a row whose outcome commit itself failed.
pub const STATUS_ERROR: &str = "error";

/// Stable 1-based row index into the ledger, header row excluded from data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowRef(pub u32);

impl fmt::Display for RowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}", self.0)
    }
}

/// One pending unit of work scanned out of the ledger.
///
/// The term is immutable once created; status transitions are owned by the
/// pipeline, never by the ledger reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub row: RowRef,
    pub term: String,
    pub existing_result: Option<String>,
}

impl WorkItem {
    pub fn pending(row: RowRef, term: impl Into<String>) -> Self {
        Self {
            row,
            term: term.into(),
            existing_result: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Pending,
    Done,
    Failed,
}

/// Which fetch strategy produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Http,
    Api,
    Browser,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Http => write!(f, "http"),
            StrategyKind::Api => write!(f, "api"),
            StrategyKind::Browser => write!(f, "browser"),
        }
    }
}

/// Successful strategy output. Non-empty `terms` is the success criterion;
/// an empty vector never reaches this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub terms: Vec<String>,
    pub strategy: StrategyKind,
    /// 1-based retry round that produced the result.
    pub round: u32,
}

/// Terminal outcome of the strategy chain for one term.
///
/// The chain resolves every term to one of these; it never propagates an
/// error upward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Collected(ExtractionResult),
    Exhausted,
}

impl Resolution {
    pub fn status(&self) -> ItemStatus {
        match self {
            Resolution::Collected(_) => ItemStatus::Done,
            Resolution::Exhausted => ItemStatus::Failed,
        }
    }
}

/// Cell values for one ledger commit, already formatted.
///
/// `results` is `None` for failures so the results column is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    pub results: Option<String>,
    pub status: String,
    pub timestamp: String,
    pub sequence: u32,
}

impl CommitOutcome {
    /// Build the commit payload for a resolution. `sequence` is the row's
    /// 1-based position among the rows processed this run; `timestamp` is
    /// preformatted `YYYY-MM-DD HH:MM:SS`.
    pub fn from_resolution(resolution: &Resolution, sequence: u32, timestamp: String) -> Self {
        match resolution {
            Resolution::Collected(result) => Self {
                results: Some(join_terms(&result.terms)),
                status: STATUS_COLLECTED.to_string(),
                timestamp,
                sequence,
            },
            Resolution::Exhausted => Self {
                results: None,
                status: STATUS_FAILED.to_string(),
                timestamp,
                sequence,
            },
        }
    }
}

/// Comma-join related terms the way the ledger stores them.
pub fn join_terms(terms: &[String]) -> String {
    terms.join(", ")
}

/// Per-run counters aggregated by the scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub processed: u32,
    pub succeeded: u32,
    pub failed: u32,
}

impl RunStats {
    pub fn record(&mut self, resolution: &Resolution) {
        self.processed += 1;
        match resolution {
            Resolution::Collected(_) => self.succeeded += 1,
            Resolution::Exhausted => self.failed += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_outcome_joins_terms_for_success() {
        let resolution = Resolution::Collected(ExtractionResult {
            terms: vec!["스마트워치 추천".to_string(), "갤럭시워치".to_string()],
            strategy: StrategyKind::Api,
            round: 1,
        });
        let outcome =
            CommitOutcome::from_resolution(&resolution, 3, "2026-08-30 12:00:00".to_string());
        assert_eq!(
            outcome.results.as_deref(),
            Some("스마트워치 추천, 갤럭시워치")
        );
        assert_eq!(outcome.status, STATUS_COLLECTED);
        assert_eq!(outcome.sequence, 3);
    }

    #[test]
    fn commit_outcome_omits_results_for_exhaustion() {
        let outcome = CommitOutcome::from_resolution(
            &Resolution::Exhausted,
            1,
            "2026-08-30 12:00:00".to_string(),
        );
        assert_eq!(outcome.results, None);
        assert_eq!(outcome.status, STATUS_FAILED);
    }

    #[test]
    fn run_stats_track_both_outcomes() {
        let mut stats = RunStats::default();
        stats.record(&Resolution::Exhausted);
        stats.record(&Resolution::Collected(ExtractionResult {
            terms: vec!["a".to_string()],
            strategy: StrategyKind::Http,
            round: 2,
        }));
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.failed, 1);
    }
}
