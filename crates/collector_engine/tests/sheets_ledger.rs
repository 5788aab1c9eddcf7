use std::time::Duration;

use collector_core::{CommitOutcome, RowRef, STATUS_COLLECTED};
use collector_engine::{Ledger, LedgerError, SheetsLedger, SheetsSettings};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(server: &MockServer) -> SheetsSettings {
    let mut settings = SheetsSettings::new("sheet-1", "Sheet1");
    settings.base_url = server.uri();
    settings.bearer_token = Some("test-token".to_string());
    settings.request_timeout = Duration::from_secs(2);
    settings
}

fn sheet_payload() -> Value {
    json!({
        "range": "Sheet1!A1:E6",
        "values": [
            ["No", "수집일시", "키워드", "연관키워드", "수집상태"],
            ["1", "2026-08-01 09:00:00", "노트북", "노트북 추천", "collected"],
            ["", "", "스마트워치", "", ""],
            ["", "", "", "", ""],
            ["", "", "키보드", "", ""],
        ]
    })
}

#[tokio::test]
async fn list_pending_excludes_resolved_and_blank_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-1/values/Sheet1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sheet_payload()))
        .mount(&server)
        .await;

    let ledger = SheetsLedger::new(settings(&server)).expect("client builds");
    let pending = ledger.list_pending().await.expect("scan ok");

    let summary: Vec<(u32, &str)> = pending
        .iter()
        .map(|item| (item.row.0, item.term.as_str()))
        .collect();
    // Row 2 already has results, row 4 has no term.
    assert_eq!(summary, vec![(3, "스마트워치"), (5, "키보드")]);
}

#[tokio::test]
async fn empty_sheet_yields_header_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-1/values/Sheet1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"range": "Sheet1"})))
        .mount(&server)
        .await;

    let ledger = SheetsLedger::new(settings(&server)).expect("client builds");
    assert!(matches!(
        ledger.list_pending().await,
        Err(LedgerError::Malformed(_))
    ));
}

#[tokio::test]
async fn missing_required_column_fails_the_scan() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-1/values/Sheet1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [["No", "키워드"]]
        })))
        .mount(&server)
        .await;

    let ledger = SheetsLedger::new(settings(&server)).expect("client builds");
    assert!(matches!(
        ledger.list_pending().await,
        Err(LedgerError::MissingColumn(_))
    ));
}

#[tokio::test]
async fn denied_scan_surfaces_the_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-1/values/Sheet1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let ledger = SheetsLedger::new(settings(&server)).expect("client builds");
    assert!(matches!(
        ledger.list_pending().await,
        Err(LedgerError::Status(401))
    ));
}

#[tokio::test]
async fn commit_batches_every_cell_into_one_update() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-1/values/Sheet1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sheet_payload()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v4/spreadsheets/sheet-1/values:batchUpdate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"totalUpdatedCells": 4})))
        .expect(1)
        .mount(&server)
        .await;

    let ledger = SheetsLedger::new(settings(&server)).expect("client builds");
    // Resolves and caches column positions.
    ledger.list_pending().await.expect("scan ok");

    let outcome = CommitOutcome {
        results: Some("스마트워치 추천, 갤럭시워치".to_string()),
        status: STATUS_COLLECTED.to_string(),
        timestamp: "2026-08-30 12:34:56".to_string(),
        sequence: 1,
    };
    ledger.commit(RowRef(3), &outcome).await.expect("commit ok");

    let requests = server.received_requests().await.expect("recording on");
    let update = requests
        .iter()
        .find(|r| r.url.path().ends_with("values:batchUpdate"))
        .expect("batchUpdate was called");
    let body: Value = serde_json::from_slice(&update.body).expect("json body");

    assert_eq!(body["valueInputOption"], "RAW");
    let ranges: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["range"].as_str().unwrap())
        .collect();
    // Results=D, status=E, timestamp=B, sequence=A, all on row 3.
    assert_eq!(ranges, vec!["Sheet1!D3", "Sheet1!E3", "Sheet1!B3", "Sheet1!A3"]);

    let values: Vec<&Value> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| &entry["values"][0][0])
        .collect();
    assert_eq!(values[0], "스마트워치 추천, 갤럭시워치");
    assert_eq!(values[1], "collected");
    assert_eq!(values[2], "2026-08-30 12:34:56");
    assert_eq!(values[3], 1);
}

#[tokio::test]
async fn failed_commit_skips_the_results_cell() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-1/values/Sheet1!1:1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [["No", "수집일시", "키워드", "연관키워드", "수집상태"]]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v4/spreadsheets/sheet-1/values:batchUpdate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"totalUpdatedCells": 3})))
        .mount(&server)
        .await;

    let ledger = SheetsLedger::new(settings(&server)).expect("client builds");
    // Commit without a prior scan forces a header-row fetch.
    let outcome = CommitOutcome {
        results: None,
        status: "failed".to_string(),
        timestamp: "2026-08-30 12:34:56".to_string(),
        sequence: 2,
    };
    ledger.commit(RowRef(5), &outcome).await.expect("commit ok");

    let requests = server.received_requests().await.expect("recording on");
    let update = requests
        .iter()
        .find(|r| r.url.path().ends_with("values:batchUpdate"))
        .expect("batchUpdate was called");
    let body: Value = serde_json::from_slice(&update.body).expect("json body");
    let ranges: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["range"].as_str().unwrap())
        .collect();
    assert_eq!(ranges, vec!["Sheet1!E5", "Sheet1!B5", "Sheet1!A5"]);
}
