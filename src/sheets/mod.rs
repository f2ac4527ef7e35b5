use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::fmt;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::model::COLUMNS;

pub mod model;

pub use model::RangeWrite;
use model::{AppendValuesResponse, BatchUpdateValuesResponse, UpdateValuesResponse, ValueRange};

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/";
const VALUE_INPUT_OPTION: &str = "USER_ENTERED";
const LAST_COLUMN: char = (b'A' + COLUMNS.len() as u8 - 1) as char;

static A1_ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"![A-Z]+(\d+)(?::[A-Z]+\d+)?$").expect("valid regex"));

/// Tabular store holding the product list and the sales entries.
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Every row of a sheet as returned by the store, header included.
    async fn read_all_values(&self, sheet: &str) -> Result<Vec<Vec<Value>>>;

    async fn update_range(&self, range: &str, rows: Vec<Vec<Value>>) -> Result<()>;

    /// Append after the last non-empty row. Returns the 1-based row written
    /// when the store reports it.
    async fn append_row(&self, sheet: &str, row: Vec<Value>) -> Result<Option<u32>>;

    async fn batch_update(&self, writes: Vec<RangeWrite>) -> Result<()>;

    /// Rows after the header, keyed by header name.
    async fn read_records(&self, sheet: &str) -> Result<Vec<Map<String, Value>>> {
        let values = self.read_all_values(sheet).await?;
        Ok(rows_to_records(&values))
    }
}

#[derive(Clone)]
pub struct SheetsClient {
    http: Client,
    base_url: Url,
    token: String,
    spreadsheet_id: String,
}

impl fmt::Debug for SheetsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheetsClient")
            .field("base_url", &self.base_url)
            .field("spreadsheet_id", &self.spreadsheet_id)
            .finish_non_exhaustive()
    }
}

impl SheetsClient {
    pub fn new(token: String, spreadsheet_id: String) -> Result<Self> {
        let base_url = Url::parse(SHEETS_API_BASE).context("invalid default Sheets URL")?;
        Self::with_base_url(token, spreadsheet_id, base_url)
    }

    pub fn with_base_url(token: String, spreadsheet_id: String, base_url: Url) -> Result<Self> {
        let http = Client::builder()
            .user_agent("graolar-sales/0.1")
            .no_proxy()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url,
            token,
            spreadsheet_id,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let base_url =
            Url::parse(&cfg.sheets.base_url).context("invalid sheets.base_url")?;
        Self::with_base_url(
            cfg.sheets.access_token.clone(),
            cfg.sheets.spreadsheet_id.clone(),
            base_url,
        )
    }

    /// `v4/spreadsheets/{id}/values/{segment}` with the segment percent-encoded.
    fn values_url(&self, segment: Option<&str>) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&format!("v4/spreadsheets/{}/", self.spreadsheet_id))
            .context("invalid Sheets base URL")?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow!("Sheets base URL cannot be a base"))?;
            segments.pop_if_empty();
            match segment {
                Some(s) => {
                    segments.push("values").push(s);
                }
                None => {
                    segments.push("values:batchUpdate");
                }
            }
        }
        Ok(url)
    }

    pub fn build_request(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<reqwest::Request> {
        let mut builder = self.http.request(method, url).bearer_auth(&self.token);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        builder.build().context("failed to build Sheets request")
    }

    async fn execute<T: DeserializeOwned>(&self, request: reqwest::Request) -> Result<T> {
        debug!(method = %request.method(), url = %request.url(), "sheets request");
        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach Google Sheets")?;

        let status = res.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = res.text().await.unwrap_or_default();
            warn!("Rate limited by Google Sheets: {}", body);
            return Err(anyhow!("received 429 from Google Sheets: {}", body));
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(%status, "Google Sheets API error: {}", body);
            return Err(anyhow!("sheets error {}: {}", status, body));
        }

        let body = res.text().await.context("failed to read Sheets response")?;
        debug!(body = %body, "sheets response");
        serde_json::from_str(&body).context("invalid Sheets response JSON")
    }
}

#[async_trait]
impl SheetStore for SheetsClient {
    async fn read_all_values(&self, sheet: &str) -> Result<Vec<Vec<Value>>> {
        let url = self.values_url(Some(&quote_sheet(sheet)))?;
        let request = self.build_request(Method::GET, url, None)?;
        let range: ValueRange = self.execute(request).await?;
        debug!(range = %range.range, rows = range.values.len(), "read sheet values");
        Ok(range.values)
    }

    async fn update_range(&self, range: &str, rows: Vec<Vec<Value>>) -> Result<()> {
        let mut url = self.values_url(Some(range))?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", VALUE_INPUT_OPTION);
        let body = build_update_body(range, rows);
        let request = self.build_request(Method::PUT, url, Some(&body))?;
        let res: UpdateValuesResponse = self.execute(request).await?;
        info!(range, updated = ?res.updated_range, "updated range");
        Ok(())
    }

    async fn append_row(&self, sheet: &str, row: Vec<Value>) -> Result<Option<u32>> {
        let range = format!("{}!A1", quote_sheet(sheet));
        let mut url = self.values_url(Some(&format!("{range}:append")))?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", VALUE_INPUT_OPTION)
            .append_pair("insertDataOption", "INSERT_ROWS");
        let body = json!({ "majorDimension": "ROWS", "values": [row] });
        let request = self.build_request(Method::POST, url, Some(&body))?;
        let res: AppendValuesResponse = self.execute(request).await?;
        info!(sheet, updated = ?res.updates.updated_range, "appended row");
        Ok(res.updates.updated_range.as_deref().and_then(row_from_a1))
    }

    async fn batch_update(&self, writes: Vec<RangeWrite>) -> Result<()> {
        let url = self.values_url(None)?;
        let body = build_batch_update_body(&writes);
        let request = self.build_request(Method::POST, url, Some(&body))?;
        let res: BatchUpdateValuesResponse = self.execute(request).await?;
        info!(ranges = writes.len(), rows = ?res.total_updated_rows, "batch update done");
        Ok(())
    }
}

/// Quote a sheet name for A1 notation when it is not a plain identifier.
pub fn quote_sheet(sheet: &str) -> String {
    if !sheet.is_empty() && sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        sheet.to_string()
    } else {
        format!("'{}'", sheet.replace('\'', "''"))
    }
}

/// The seven-column range of one 1-based row, e.g. `ENTRADAS!A7:G7`.
pub fn a1_row_range(sheet: &str, row: u32) -> String {
    format!("{}!A{row}:{LAST_COLUMN}{row}", quote_sheet(sheet))
}

/// Starting row of an A1 range such as `ENTRADAS!A12:G12`.
pub fn row_from_a1(range: &str) -> Option<u32> {
    A1_ROW
        .captures(range)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

pub fn build_update_body(range: &str, rows: Vec<Vec<Value>>) -> Value {
    json!({
        "range": range,
        "majorDimension": "ROWS",
        "values": rows,
    })
}

pub fn build_batch_update_body(writes: &[RangeWrite]) -> Value {
    let data: Vec<Value> = writes
        .iter()
        .map(|w| {
            json!({
                "range": w.range,
                "majorDimension": "ROWS",
                "values": w.values,
            })
        })
        .collect();
    json!({
        "valueInputOption": VALUE_INPUT_OPTION,
        "data": data,
    })
}

/// Header-keyed records, the way a spreadsheet "get all records" call reads
/// them. Short rows are padded with empty strings; fully empty rows are
/// skipped.
pub fn rows_to_records(values: &[Vec<Value>]) -> Vec<Map<String, Value>> {
    let Some((header, rows)) = values.split_first() else {
        return Vec::new();
    };
    let keys: Vec<String> = header
        .iter()
        .map(|h| h.as_str().map(str::to_string).unwrap_or_else(|| h.to_string()))
        .collect();

    rows.iter()
        .filter(|row| row.iter().any(|c| !is_blank(c)))
        .map(|row| {
            keys.iter()
                .enumerate()
                .map(|(i, k)| (k.clone(), row.get(i).cloned().unwrap_or_else(|| json!(""))))
                .collect()
        })
        .collect()
}

fn is_blank(cell: &Value) -> bool {
    match cell {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}
