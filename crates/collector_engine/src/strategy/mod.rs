mod api;
mod browser;
mod http;

pub use api::{ApiSettings, ApiStrategy};
pub use browser::{BrowserSettings, BrowserStrategy};
pub use http::{HttpSettings, HttpStrategy};

use async_trait::async_trait;
use collector_core::StrategyKind;

use crate::types::FetchError;

/// One self-contained way of obtaining related terms for a term.
///
/// An `Ok` with an empty vector means "upstream answered but had nothing for
/// us"; `Err` is reserved for transport-level faults. The chain treats both
/// the same way, but the distinction keeps logs honest.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn fetch(&self, term: &str) -> Result<Vec<String>, FetchError>;
}
