use std::time::Duration;

use async_trait::async_trait;

use collector_core::{ExtractionResult, Resolution, RetryPolicy};
use engine_logging::{engine_debug, engine_info, engine_warn};

use crate::strategy::FetchStrategy;

/// Injectable sleep so retry timing is testable without elapsed wall time.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Ordered strategy composition plus the retry controller.
///
/// Per term the chain runs up to `policy.max_rounds` rounds. Within a round
/// strategies run strictly in their configured priority order and the first
/// non-empty result wins. A strategy error is logged and counts as empty;
/// the chain's contract is a terminal [`Resolution`] for every term, never a
/// propagated error.
pub struct StrategyChain {
    strategies: Vec<Box<dyn FetchStrategy>>,
    policy: RetryPolicy,
    sleeper: Box<dyn Sleeper>,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Box<dyn FetchStrategy>>, policy: RetryPolicy) -> Self {
        Self::with_sleeper(strategies, policy, Box::new(TokioSleeper))
    }

    pub fn with_sleeper(
        strategies: Vec<Box<dyn FetchStrategy>>,
        policy: RetryPolicy,
        sleeper: Box<dyn Sleeper>,
    ) -> Self {
        Self {
            strategies,
            policy,
            sleeper,
        }
    }

    pub async fn resolve(&self, term: &str) -> Resolution {
        for round in 1..=self.policy.max_rounds.max(1) {
            for strategy in &self.strategies {
                let kind = strategy.kind();
                match strategy.fetch(term).await {
                    Ok(terms) if !terms.is_empty() => {
                        engine_info!(
                            "Resolved {term:?} via {kind} on round {round} ({} term(s))",
                            terms.len()
                        );
                        return Resolution::Collected(ExtractionResult {
                            terms,
                            strategy: kind,
                            round,
                        });
                    }
                    Ok(_) => {
                        engine_debug!("{kind} strategy empty for {term:?} (round {round})");
                    }
                    Err(err) => {
                        // Transport faults are equivalent to empty here.
                        engine_warn!("{kind} strategy failed for {term:?} (round {round}): {err}");
                    }
                }
            }
            if self.policy.has_rounds_after(round) {
                let delay = self.policy.delay_after_round(round);
                engine_debug!("Round {round} exhausted for {term:?}; backing off {delay:?}");
                self.sleeper.sleep(delay).await;
            }
        }
        engine_warn!(
            "All strategies exhausted for {term:?} after {} round(s)",
            self.policy.max_rounds.max(1)
        );
        Resolution::Exhausted
    }
}
