use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use url::Url;

use collector_core::{CommitOutcome, RowRef, WorkItem};
use engine_logging::engine_info;

use crate::ledger::{ColumnNames, Ledger, LedgerError, FIRST_DATA_ROW};

#[derive(Debug, Clone)]
pub struct SheetsSettings {
    /// API origin; overridable so tests can point at a local mock.
    pub base_url: String,
    pub spreadsheet_id: String,
    pub worksheet: String,
    pub bearer_token: Option<String>,
    pub columns: ColumnNames,
    pub request_timeout: Duration,
}

impl SheetsSettings {
    pub fn new(spreadsheet_id: impl Into<String>, worksheet: impl Into<String>) -> Self {
        Self {
            base_url: "https://sheets.googleapis.com".to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            worksheet: worksheet.into(),
            bearer_token: None,
            columns: ColumnNames::default(),
            request_timeout: Duration::from_secs(20),
        }
    }
}

/// Positions of the required columns, resolved once per run from the header
/// row.
#[derive(Debug, Clone, Copy)]
struct ColumnIndexes {
    sequence: usize,
    timestamp: usize,
    term: usize,
    results: usize,
    status: usize,
}

/// Ledger backed by the Google Sheets v4 values API.
///
/// Columns are located by header name, not position. Each commit is a single
/// `values:batchUpdate` call covering every touched cell, so a row is either
/// fully written or untouched.
pub struct SheetsLedger {
    settings: SheetsSettings,
    client: reqwest::Client,
    columns: OnceCell<ColumnIndexes>,
}

impl SheetsLedger {
    pub fn new(settings: SheetsSettings) -> Result<Self, LedgerError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| LedgerError::Transport(err.to_string()))?;
        Ok(Self {
            settings,
            client,
            columns: OnceCell::new(),
        })
    }

    fn values_url(&self, range: &str) -> Result<Url, LedgerError> {
        let mut url = Url::parse(&self.settings.base_url)
            .map_err(|err| LedgerError::Transport(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| LedgerError::Transport("base url cannot carry a path".to_string()))?
            .extend([
                "v4",
                "spreadsheets",
                self.settings.spreadsheet_id.as_str(),
                "values",
                range,
            ]);
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.settings.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, LedgerError> {
        let url = self.values_url(range)?;
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|err| LedgerError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::Status(status.as_u16()));
        }
        let body = response
            .text()
            .await
            .map_err(|err| LedgerError::Transport(err.to_string()))?;
        let payload: Value = serde_json::from_str(&body)
            .map_err(|err| LedgerError::Malformed(err.to_string()))?;

        let Some(rows) = payload.get("values").and_then(Value::as_array) else {
            // An entirely empty sheet has no `values` key.
            return Ok(Vec::new());
        };
        Ok(rows
            .iter()
            .map(|row| {
                row.as_array()
                    .map(|cells| cells.iter().map(cell_text).collect())
                    .unwrap_or_default()
            })
            .collect())
    }

    async fn resolve_columns(&self) -> Result<ColumnIndexes, LedgerError> {
        let header = self
            .get_values(&format!("{}!1:1", self.settings.worksheet))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LedgerError::Malformed("header row is empty".to_string()))?;
        columns_from_header(&header, &self.settings.columns)
    }

    async fn columns(&self) -> Result<ColumnIndexes, LedgerError> {
        self.columns
            .get_or_try_init(|| self.resolve_columns())
            .await
            .copied()
    }
}

#[async_trait]
impl Ledger for SheetsLedger {
    async fn list_pending(&self) -> Result<Vec<WorkItem>, LedgerError> {
        let rows = self.get_values(&self.settings.worksheet).await?;
        let mut iter = rows.into_iter();
        let header = iter
            .next()
            .ok_or_else(|| LedgerError::Malformed("sheet has no header row".to_string()))?;
        let columns = columns_from_header(&header, &self.settings.columns)?;
        // Cache for commits; first resolution wins.
        let _ = self.columns.set(columns);

        let mut pending = Vec::new();
        for (offset, row) in iter.enumerate() {
            let term = row.get(columns.term).map(String::as_str).unwrap_or("").trim();
            let results = row
                .get(columns.results)
                .map(String::as_str)
                .unwrap_or("")
                .trim();
            if term.is_empty() || !results.is_empty() {
                continue;
            }
            pending.push(WorkItem::pending(
                RowRef(FIRST_DATA_ROW + offset as u32),
                term,
            ));
        }
        engine_info!(
            "Ledger scan: {} pending row(s) in {:?}",
            pending.len(),
            self.settings.worksheet
        );
        Ok(pending)
    }

    async fn commit(&self, row: RowRef, outcome: &CommitOutcome) -> Result<(), LedgerError> {
        if row.0 < FIRST_DATA_ROW {
            return Err(LedgerError::UnknownRow(row));
        }
        let columns = self.columns().await?;
        let worksheet = &self.settings.worksheet;

        let mut data = Vec::with_capacity(4);
        let mut push_cell = |column: usize, value: Value| {
            data.push(json!({
                "range": format!("{worksheet}!{}{}", column_letter(column), row.0),
                "values": [[value]],
            }));
        };
        if let Some(results) = &outcome.results {
            push_cell(columns.results, json!(results));
        }
        push_cell(columns.status, json!(outcome.status));
        push_cell(columns.timestamp, json!(outcome.timestamp));
        push_cell(columns.sequence, json!(outcome.sequence));

        let body = json!({
            "valueInputOption": "RAW",
            "data": data,
        });

        let url = self.values_url("")?;
        // `values:batchUpdate` shares the `values` path prefix with reads.
        let url = Url::parse(&format!("{}:batchUpdate", url.as_str().trim_end_matches('/')))
            .map_err(|err| LedgerError::Transport(err.to_string()))?;

        let response = self
            .authorize(self.client.post(url))
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .send()
            .await
            .map_err(|err| LedgerError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::Status(status.as_u16()));
        }
        Ok(())
    }
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn columns_from_header(
    header: &[String],
    names: &ColumnNames,
) -> Result<ColumnIndexes, LedgerError> {
    let find = |name: &str| {
        header
            .iter()
            .position(|cell| cell.trim() == name)
            .ok_or_else(|| LedgerError::MissingColumn(name.to_string()))
    };
    Ok(ColumnIndexes {
        sequence: find(&names.sequence)?,
        timestamp: find(&names.timestamp)?,
        term: find(&names.term)?,
        results: find(&names.results)?,
        status: find(&names.status)?,
    })
}

/// 0-based column index to A1 letters (0 -> A, 25 -> Z, 26 -> AA).
fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).expect("ascii letters")
}
