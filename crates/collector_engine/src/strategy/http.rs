use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};

use collector_core::StrategyKind;
use engine_logging::engine_debug;

use crate::pacing::Pacer;
use crate::selectors::SelectorSet;
use crate::strategy::FetchStrategy;
use crate::types::{map_reqwest_error, FailureKind, FetchError};

#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Search endpoint the term is appended to as a `query` parameter.
    pub search_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            search_url: "https://search.shopping.naver.com/search/all".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(15),
        }
    }
}

/// Plain GET against the search page, parsed with the selector set.
///
/// Cheapest strategy, tried first. The upstream regularly answers such
/// requests with a 403 or a bot-wall page; both resolve to "nothing" here
/// and the chain moves on.
pub struct HttpStrategy {
    settings: HttpSettings,
    selectors: SelectorSet,
    pacer: Arc<Pacer>,
}

impl HttpStrategy {
    pub fn new(settings: HttpSettings, selectors: SelectorSet, pacer: Arc<Pacer>) -> Self {
        Self {
            settings,
            selectors,
            pacer,
        }
    }

    fn build_client(&self) -> Result<reqwest::Client, FetchError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
    }

    fn query_url(&self, term: &str) -> Result<reqwest::Url, FetchError> {
        let mut url = reqwest::Url::parse(&self.settings.search_url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        url.query_pairs_mut().append_pair("query", term);
        Ok(url)
    }
}

#[async_trait]
impl FetchStrategy for HttpStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Http
    }

    async fn fetch(&self, term: &str) -> Result<Vec<String>, FetchError> {
        self.pacer.pre_request().await;
        let url = self.query_url(term)?;
        let identity = self.pacer.identity();
        let client = self.build_client()?;

        let response = client
            .get(url)
            .header(USER_AGENT, identity.user_agent.as_str())
            .header(ACCEPT_LANGUAGE, identity.accept_language)
            .header(
                ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("sec-ch-ua-platform", identity.platform)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let body = response.text().await.map_err(map_reqwest_error)?;
        let terms = self.selectors.extract(&body);
        engine_debug!("http strategy found {} term(s) for {term:?}", terms.len());
        Ok(terms)
    }
}
