use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use engine_logging::engine_debug;

/// Delay windows for humanized pacing. All windows are uniform random.
#[derive(Debug, Clone)]
pub struct PacerConfig {
    /// Minimum/maximum pause before every outbound request.
    pub request_delay: (Duration, Duration),
    /// Minimum/maximum pause between batches. Materially larger than the
    /// per-request window.
    pub batch_delay: (Duration, Duration),
    /// Minimum/maximum settle wait after a browser navigation.
    pub settle_delay: (Duration, Duration),
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            request_delay: (Duration::from_secs(2), Duration::from_secs(6)),
            batch_delay: (Duration::from_secs(15), Duration::from_secs(45)),
            settle_delay: (Duration::from_millis(1500), Duration::from_millis(4000)),
        }
    }
}

/// Cross-cutting pacing and identity policy, one instance per run.
///
/// Every strategy invocation calls [`Pacer::pre_request`] before touching the
/// network. The last-request instant is behind a mutex held across the sleep,
/// so concurrent fetches observe a coherent sequence of delay windows instead
/// of computing overlapping ones from a stale timestamp.
#[derive(Debug)]
pub struct Pacer {
    config: PacerConfig,
    last_request: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(config: PacerConfig) -> Self {
        Self {
            config,
            last_request: Mutex::new(None),
        }
    }

    /// Sleep until at least a jittered request delay has passed since the
    /// previous request, then claim the current instant.
    pub async fn pre_request(&self) {
        let mut last = self.last_request.lock().await;
        let delay = jitter(self.config.request_delay);
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < delay {
                tokio::time::sleep(delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Longer pause applied between batches. Does not touch the per-request
    /// timestamp.
    pub async fn batch_pause(&self) {
        let pause = jitter(self.config.batch_delay);
        engine_debug!("Inter-batch pause of {pause:?}");
        tokio::time::sleep(pause).await;
    }

    /// Randomized settle wait used after browser navigation.
    pub async fn settle(&self) {
        tokio::time::sleep(jitter(self.config.settle_delay)).await;
    }

    /// A fresh randomized-but-consistent client identity.
    pub fn identity(&self) -> BrowserIdentity {
        BrowserIdentity::random()
    }
}

fn jitter((min, max): (Duration, Duration)) -> Duration {
    if max <= min {
        return min;
    }
    let span = (max - min).as_millis() as u64;
    min + Duration::from_millis(fastrand::u64(0..=span))
}

/// A plausible browser fingerprint: user-agent with randomized version
/// components and platform metadata that agrees with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserIdentity {
    pub user_agent: String,
    /// `sec-ch-ua-platform` value matching the user-agent's OS token.
    pub platform: &'static str,
    pub accept_language: &'static str,
}

const OS_TOKENS: &[(&str, &str)] = &[
    ("Windows NT 10.0; Win64; x64", "\"Windows\""),
    ("Macintosh; Intel Mac OS X 10_15_7", "\"macOS\""),
    ("X11; Linux x86_64", "\"Linux\""),
];

const ACCEPT_LANGUAGES: &[&str] = &["ko-KR,ko;q=0.9,en-US;q=0.6", "ko,en-US;q=0.8,en;q=0.6"];

impl BrowserIdentity {
    pub fn random() -> Self {
        let (os_token, platform) = OS_TOKENS[fastrand::usize(0..OS_TOKENS.len())];
        let major = fastrand::u32(122..=131);
        let build = fastrand::u32(6200..=6900);
        let patch = fastrand::u32(40..=220);
        let user_agent = format!(
            "Mozilla/5.0 ({os_token}) AppleWebKit/537.36 (KHTML, like Gecko) \
             Chrome/{major}.0.{build}.{patch} Safari/537.36"
        );
        Self {
            user_agent,
            platform,
            accept_language: ACCEPT_LANGUAGES[fastrand::usize(0..ACCEPT_LANGUAGES.len())],
        }
    }

    /// The first language tag of the Accept-Language string, without any
    /// quality weight. This is what `--lang` and similar locale flags take.
    pub fn primary_language(&self) -> &str {
        let first = self
            .accept_language
            .split(',')
            .next()
            .unwrap_or(self.accept_language);
        first.split(';').next().unwrap_or(first).trim()
    }
}
