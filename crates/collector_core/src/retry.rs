use std::time::Duration;

/// How the inter-round delay grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `base * round`.
    Linear,
    /// `base * 2^(round - 1)`.
    Exponential,
}

/// Bounded retry plan for one term: up to `max_rounds` full passes over the
/// strategy chain, with a growing pause between passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_rounds: u32,
    pub base_delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            base_delay: Duration::from_secs(5),
            backoff: Backoff::Linear,
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep after an exhausted round, before the next one starts.
    /// `round` is 1-based. Non-decreasing in `round` for a fixed policy.
    pub fn delay_after_round(&self, round: u32) -> Duration {
        let round = round.max(1);
        match self.backoff {
            Backoff::Linear => self.base_delay.saturating_mul(round),
            Backoff::Exponential => self
                .base_delay
                .saturating_mul(2u32.saturating_pow(round - 1)),
        }
    }

    /// True while another round may be attempted after `round` exhausted.
    pub fn has_rounds_after(&self, round: u32) -> bool {
        round < self.max_rounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_backoff_grows_with_round() {
        let policy = RetryPolicy {
            max_rounds: 3,
            base_delay: Duration::from_secs(2),
            backoff: Backoff::Linear,
        };
        assert_eq!(policy.delay_after_round(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after_round(2), Duration::from_secs(4));
        assert_eq!(policy.delay_after_round(3), Duration::from_secs(6));
    }

    #[test]
    fn exponential_backoff_doubles() {
        let policy = RetryPolicy {
            max_rounds: 4,
            base_delay: Duration::from_secs(1),
            backoff: Backoff::Exponential,
        };
        assert_eq!(policy.delay_after_round(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after_round(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after_round(3), Duration::from_secs(4));
    }

    #[test]
    fn backoff_is_non_decreasing() {
        for backoff in [Backoff::Linear, Backoff::Exponential] {
            let policy = RetryPolicy {
                max_rounds: 6,
                base_delay: Duration::from_millis(250),
                backoff,
            };
            let mut last = Duration::ZERO;
            for round in 1..=6 {
                let delay = policy.delay_after_round(round);
                assert!(delay >= last, "round {round} shrank the delay");
                last = delay;
            }
        }
    }

    #[test]
    fn rounds_are_bounded() {
        let policy = RetryPolicy::default();
        assert!(policy.has_rounds_after(1));
        assert!(policy.has_rounds_after(2));
        assert!(!policy.has_rounds_after(3));
    }
}
