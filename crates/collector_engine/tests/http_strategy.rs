use std::sync::Arc;
use std::time::Duration;

use collector_engine::{
    FailureKind, FetchStrategy, HttpSettings, HttpStrategy, Pacer, PacerConfig, SelectorSet,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn quiet_pacer() -> Arc<Pacer> {
    Arc::new(Pacer::new(PacerConfig {
        request_delay: (Duration::ZERO, Duration::ZERO),
        batch_delay: (Duration::ZERO, Duration::ZERO),
        settle_delay: (Duration::ZERO, Duration::ZERO),
    }))
}

fn strategy(server: &MockServer, patterns: &[&str]) -> HttpStrategy {
    let settings = HttpSettings {
        search_url: format!("{}/search/all", server.uri()),
        connect_timeout: Duration::from_secs(2),
        request_timeout: Duration::from_secs(2),
    };
    let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
    HttpStrategy::new(settings, SelectorSet::new(&patterns), quiet_pacer())
}

#[tokio::test]
async fn extracts_terms_from_search_page() {
    let server = MockServer::start().await;
    let page = r#"<html><body>
        <span class="keywordItem_text">스마트워치 추천</span>
        <span class="keywordItem_text">갤럭시워치</span>
    </body></html>"#;
    Mock::given(method("GET"))
        .and(path("/search/all"))
        .and(query_param("query", "스마트워치"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(page, "text/html; charset=utf-8"))
        .mount(&server)
        .await;

    let strategy = strategy(&server, &["span.keywordItem_text"]);
    let terms = strategy.fetch("스마트워치").await.expect("fetch ok");
    assert_eq!(terms, vec!["스마트워치 추천", "갤럭시워치"]);
}

#[tokio::test]
async fn forbidden_status_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/all"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let strategy = strategy(&server, &["span.keywordItem_text"]);
    let err = strategy.fetch("스마트워치").await.expect_err("403 must fail");
    assert_eq!(err.kind, FailureKind::HttpStatus(403));
}

#[tokio::test]
async fn page_without_matches_yields_empty_not_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/all"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><body>captcha wall</body></html>", "text/html"),
        )
        .mount(&server)
        .await;

    let strategy = strategy(&server, &["span.keywordItem_text"]);
    let terms = strategy.fetch("xyz123").await.expect("fetch ok");
    assert!(terms.is_empty());
}

#[tokio::test]
async fn sends_a_plausible_browser_identity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/all"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"))
        .mount(&server)
        .await;

    let strategy = strategy(&server, &["span.x"]);
    strategy.fetch("keyboard").await.expect("fetch ok");

    let requests = server.received_requests().await.expect("recording on");
    let request = &requests[0];
    let user_agent = request
        .headers
        .get("user-agent")
        .expect("user-agent set")
        .to_str()
        .unwrap();
    assert!(user_agent.contains("Chrome/"), "got {user_agent}");
    assert!(request.headers.get("sec-ch-ua-platform").is_some());
    assert!(request.headers.get("accept-language").is_some());
}

#[tokio::test]
async fn request_timeout_maps_to_timeout_kind() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/all"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let settings = HttpSettings {
        search_url: format!("{}/search/all", server.uri()),
        connect_timeout: Duration::from_millis(500),
        request_timeout: Duration::from_millis(500),
    };
    let strategy = HttpStrategy::new(
        settings,
        SelectorSet::new(&["span.x".to_string()]),
        quiet_pacer(),
    );
    let err = strategy.fetch("keyboard").await.expect_err("must time out");
    assert_eq!(err.kind, FailureKind::Timeout);
}
