//! Collector engine: fetch strategies, retry chain, pacing, and ledger sync.
mod chain;
mod ledger;
mod pacing;
mod scheduler;
mod selectors;
mod sheets;
mod strategy;
mod types;

pub use chain::{Sleeper, StrategyChain, TokioSleeper};
pub use ledger::{ColumnNames, Ledger, LedgerError, MemoryLedger, MemoryRow, FIRST_DATA_ROW};
pub use pacing::{BrowserIdentity, Pacer, PacerConfig};
pub use scheduler::{run, SchedulerConfig};
pub use selectors::SelectorSet;
pub use sheets::{SheetsLedger, SheetsSettings};
pub use strategy::{
    ApiSettings, ApiStrategy, BrowserSettings, BrowserStrategy, FetchStrategy, HttpSettings,
    HttpStrategy,
};
pub use types::{FailureKind, FetchError};
