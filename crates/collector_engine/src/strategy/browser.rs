use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures_util::StreamExt;
use tokio::task::JoinHandle;

use collector_core::StrategyKind;
use engine_logging::{engine_debug, engine_warn};

use crate::pacing::{BrowserIdentity, Pacer};
use crate::selectors::SelectorSet;
use crate::strategy::FetchStrategy;
use crate::types::{FailureKind, FetchError};

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    /// Search endpoint the term is appended to as a `query` parameter.
    pub search_url: String,
    /// Neutral page visited before the query URL. Arriving via the landing
    /// page looks less like a deep-linking bot.
    pub landing_url: String,
    pub page_load_timeout: Duration,
    /// Explicit Chromium binary; `None` lets chromiumoxide auto-detect.
    pub chrome_executable: Option<PathBuf>,
    /// Scroll mid-page after settling, like a reader would.
    pub scroll: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            search_url: "https://search.shopping.naver.com/search/all".to_string(),
            landing_url: "https://shopping.naver.com/".to_string(),
            page_load_timeout: Duration::from_secs(30),
            chrome_executable: None,
            scroll: true,
        }
    }
}

/// Last-resort strategy: render the search page in headless Chromium.
///
/// Slowest and heaviest, but sees the DOM after JavaScript ran, which the
/// plain HTTP strategy never does. The session is acquired per fetch and
/// closed on every exit path before control returns to the chain.
pub struct BrowserStrategy {
    settings: BrowserSettings,
    selectors: SelectorSet,
    pacer: Arc<Pacer>,
}

impl BrowserStrategy {
    pub fn new(settings: BrowserSettings, selectors: SelectorSet, pacer: Arc<Pacer>) -> Self {
        Self {
            settings,
            selectors,
            pacer,
        }
    }

    fn query_url(&self, term: &str) -> Result<reqwest::Url, FetchError> {
        let mut url = reqwest::Url::parse(&self.settings.search_url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        url.query_pairs_mut().append_pair("query", term);
        Ok(url)
    }

    /// Navigation script run inside one live session. Kept separate from
    /// `fetch` so the session teardown wraps every early return in here.
    async fn drive(&self, session: &BrowserSession, term: &str) -> Result<Vec<String>, FetchError> {
        let query_url = self.query_url(term)?;

        session
            .navigate(&self.settings.landing_url, self.settings.page_load_timeout)
            .await?;
        self.pacer.settle().await;

        session
            .navigate(query_url.as_str(), self.settings.page_load_timeout)
            .await?;
        self.pacer.settle().await;

        if self.settings.scroll {
            // Best effort; a failed scroll is not worth aborting the fetch.
            if let Err(err) = session
                .evaluate("window.scrollTo(0, document.body.scrollHeight / 2)")
                .await
            {
                engine_debug!("browser scroll failed: {err}");
            }
        }

        let html = session.rendered_html().await?;
        Ok(self.selectors.extract(&html))
    }
}

#[async_trait]
impl FetchStrategy for BrowserStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Browser
    }

    async fn fetch(&self, term: &str) -> Result<Vec<String>, FetchError> {
        self.pacer.pre_request().await;
        let session = BrowserSession::launch(&self.settings, self.pacer.identity()).await?;
        let outcome = self.drive(&session, term).await;
        session.close().await;
        if let Ok(terms) = &outcome {
            engine_debug!("browser strategy found {} term(s) for {term:?}", terms.len());
        }
        outcome
    }
}

/// Scoped headless-browser session: one Chromium process, one page, plus the
/// CDP event pump. [`BrowserSession::close`] tears all of it down; `fetch`
/// calls it on every path so no session outlives its term.
struct BrowserSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl BrowserSession {
    async fn launch(
        settings: &BrowserSettings,
        identity: BrowserIdentity,
    ) -> Result<Self, FetchError> {
        let mut builder = BrowserConfig::builder()
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg(format!("--user-agent={}", identity.user_agent))
            // Chromium wants a bare locale here, not the Accept-Language header.
            .arg(format!("--lang={}", identity.primary_language()));
        if let Some(path) = &settings.chrome_executable {
            builder = builder.chrome_executable(path.clone());
        }
        let config = builder
            .build()
            .map_err(|err| FetchError::new(FailureKind::Automation, err))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| FetchError::new(FailureKind::Automation, err.to_string()))?;

        // Pump CDP events for the lifetime of the session.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                close_browser(browser, handler_task).await;
                return Err(FetchError::new(FailureKind::Automation, err.to_string()));
            }
        };

        Ok(Self {
            browser,
            page,
            handler_task,
        })
    }

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), FetchError> {
        // The navigation and the load wait share one budget; a page that
        // commits fast but never finishes loading still times out.
        let navigation = async {
            self.page.goto(url).await?;
            let _ = self.page.wait_for_navigation().await;
            Ok::<_, chromiumoxide::error::CdpError>(())
        };
        bounded(timeout, url, navigation).await
    }

    async fn evaluate(&self, script: &str) -> Result<(), FetchError> {
        self.page
            .evaluate(script)
            .await
            .map(|_| ())
            .map_err(|err| FetchError::new(FailureKind::Automation, err.to_string()))
    }

    async fn rendered_html(&self) -> Result<String, FetchError> {
        self.page
            .evaluate("document.documentElement.outerHTML")
            .await
            .map_err(|err| FetchError::new(FailureKind::Automation, err.to_string()))?
            .into_value::<String>()
            .map_err(|err| FetchError::new(FailureKind::Parse, err.to_string()))
    }

    async fn close(self) {
        close_browser(self.browser, self.handler_task).await;
    }
}

async fn close_browser(mut browser: Browser, handler_task: JoinHandle<()>) {
    if let Err(err) = browser.close().await {
        engine_warn!("browser close failed: {err}");
    }
    let _ = browser.wait().await;
    handler_task.abort();
}

async fn bounded<F>(timeout: Duration, url: &str, navigation: F) -> Result<(), FetchError>
where
    F: std::future::Future<Output = Result<(), chromiumoxide::error::CdpError>>,
{
    match tokio::time::timeout(timeout, navigation).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(FetchError::new(FailureKind::Automation, err.to_string())),
        Err(_) => Err(FetchError::new(
            FailureKind::Timeout,
            format!("page load exceeded {timeout:?} for {url}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chromiumoxide::error::CdpError;

    #[tokio::test(start_paused = true)]
    async fn navigation_budget_covers_the_post_commit_wait() {
        // Models a page that commits instantly but whose load wait drags on.
        let slow_wait = async {
            tokio::time::sleep(Duration::from_secs(120)).await;
            Ok::<_, CdpError>(())
        };
        let err = bounded(Duration::from_secs(30), "https://example.test/", slow_wait)
            .await
            .expect_err("must time out");
        assert_eq!(err.kind, FailureKind::Timeout);
    }

    #[tokio::test]
    async fn navigation_within_budget_passes_through() {
        let instant = async { Ok::<_, CdpError>(()) };
        bounded(Duration::from_secs(30), "https://example.test/", instant)
            .await
            .expect("fast navigation is fine");
    }
}
