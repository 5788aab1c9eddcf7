use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde_json::Value;

use collector_core::StrategyKind;
use engine_logging::engine_debug;

use crate::pacing::Pacer;
use crate::strategy::FetchStrategy;
use crate::types::{map_reqwest_error, FailureKind, FetchError};

#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Autocomplete endpoint the term is appended to as a `q` parameter.
    pub autocomplete_url: String,
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            autocomplete_url: "https://ac.shopping.naver.com/ac".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Autocomplete JSON fetch.
///
/// The endpoint's response shape is not under our control and has shifted
/// before, so the walk over the payload is defensive at every step: any
/// shape surprise yields an empty result, never an error.
pub struct ApiStrategy {
    settings: ApiSettings,
    pacer: Arc<Pacer>,
}

impl ApiStrategy {
    pub fn new(settings: ApiSettings, pacer: Arc<Pacer>) -> Self {
        Self { settings, pacer }
    }

    fn query_url(&self, term: &str) -> Result<reqwest::Url, FetchError> {
        let mut url = reqwest::Url::parse(&self.settings.autocomplete_url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        url.query_pairs_mut().append_pair("q", term);
        Ok(url)
    }
}

#[async_trait]
impl FetchStrategy for ApiStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Api
    }

    async fn fetch(&self, term: &str) -> Result<Vec<String>, FetchError> {
        self.pacer.pre_request().await;
        let url = self.query_url(term)?;
        let identity = self.pacer.identity();

        let client = reqwest::Client::builder()
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;

        let response = client
            .get(url)
            .header(USER_AGENT, identity.user_agent.as_str())
            .header(ACCEPT, "application/json")
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
        let terms = match serde_json::from_str::<Value>(&body) {
            Ok(payload) => extract_suggestions(&payload),
            Err(err) => {
                engine_debug!("api strategy got non-JSON body for {term:?}: {err}");
                Vec::new()
            }
        };
        engine_debug!("api strategy found {} term(s) for {term:?}", terms.len());
        Ok(terms)
    }
}

/// Pull the first string out of each nested result group under `items`.
///
/// Accepted shapes per entry: `["kw", ...]`, `[["kw", ...], ...]` and plain
/// `"kw"`. Anything else is skipped.
fn extract_suggestions(payload: &Value) -> Vec<String> {
    let Some(groups) = payload.get("items").and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut terms = Vec::new();
    for group in groups {
        let Some(entries) = group.as_array() else {
            // A flat `items: ["kw", ...]` upstream variant.
            if let Some(text) = group.as_str() {
                push_trimmed(&mut terms, text);
            }
            continue;
        };
        for entry in entries {
            if let Some(text) = first_string(entry) {
                push_trimmed(&mut terms, text);
            }
        }
    }
    terms
}

fn first_string(entry: &Value) -> Option<&str> {
    match entry {
        Value::String(text) => Some(text),
        Value::Array(inner) => inner.iter().find_map(Value::as_str),
        _ => None,
    }
}

fn push_trimmed(terms: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        terms.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_first_string_of_each_entry() {
        let payload = json!({
            "query": "스마트워치",
            "items": [[["스마트워치 추천", 10], ["갤럭시워치", 3]]]
        });
        assert_eq!(
            extract_suggestions(&payload),
            vec!["스마트워치 추천", "갤럭시워치"]
        );
    }

    #[test]
    fn tolerates_flat_string_entries() {
        let payload = json!({ "items": [["a", "b"], "c"] });
        assert_eq!(extract_suggestions(&payload), vec!["a", "b", "c"]);
    }

    #[test]
    fn unexpected_shapes_yield_empty() {
        for payload in [
            json!({}),
            json!({ "items": "not an array" }),
            json!({ "items": [{"unexpected": true}, [42], [[42]]] }),
            json!(null),
        ] {
            assert!(extract_suggestions(&payload).is_empty(), "{payload}");
        }
    }
}
