//! Google Sheets v4 `values` API as a [`Datastore`].
//!
//! Row 1 of the sheet is the header; data row `i` lives on sheet row `i + 2`.
//! Authentication is a bearer token supplied by configuration.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::Datastore;
use crate::config::SheetsConfig;
use crate::error::DatastoreError;
use crate::state_machine::Row;

/// Request/response body of the `values` endpoints. Other fields of the
/// API's `ValueRange` are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

pub struct SheetsDatastore {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
    sheet_name: String,
    access_token: String,
    // Last header seen or written; used to place cells by column name.
    header: RwLock<Option<Vec<String>>>,
}

impl SheetsDatastore {
    pub fn new(config: &SheetsConfig, timeout: Duration) -> Result<Self, DatastoreError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            sheet_name: config.sheet_name.clone(),
            access_token: config.access_token.clone(),
            header: RwLock::new(None),
        })
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url, self.spreadsheet_id, range
        )
    }

    /// A1 range on this sheet, quoting the sheet name when needed.
    fn range(&self, cells: Option<&str>) -> String {
        let sheet = if self.sheet_name.chars().all(|c| c.is_ascii_alphanumeric()) {
            self.sheet_name.clone()
        } else {
            format!("'{}'", self.sheet_name.replace('\'', "''"))
        };
        match cells {
            Some(cells) => format!("{sheet}!{cells}"),
            None => sheet,
        }
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, DatastoreError> {
        let response = self
            .client
            .get(self.values_url(range))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let body: ValueRange = check(response).await?.json().await?;
        Ok(body.values)
    }

    async fn put_values(&self, range: &str, values: Vec<Vec<String>>) -> Result<(), DatastoreError> {
        let response = self
            .client
            .put(self.values_url(range))
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(&self.access_token)
            .json(&ValueRange { values })
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    fn remember_header(&self, header: &[String]) {
        *self.header.write().unwrap_or_else(PoisonError::into_inner) = Some(header.to_vec());
    }

    async fn cached_header(&self) -> Result<Vec<String>, DatastoreError> {
        let cached = self
            .header
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match cached {
            Some(header) => Ok(header),
            None => self.read_header().await,
        }
    }
}

async fn check(response: Response) -> Result<Response, DatastoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    if status == StatusCode::NOT_FOUND {
        Err(DatastoreError::NotFound(message))
    } else {
        Err(DatastoreError::Unavailable(format!(
            "sheets API returned status {}: {message}",
            status.as_u16()
        )))
    }
}

/// 0-based column index to A1 letters: 0 → A, 25 → Z, 26 → AA.
fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

impl Datastore for SheetsDatastore {
    async fn read_header(&self) -> Result<Vec<String>, DatastoreError> {
        let values = self.get_values(&self.range(Some("1:1"))).await?;
        let header = values.into_iter().next().unwrap_or_default();
        self.remember_header(&header);
        Ok(header)
    }

    async fn replace_header(&self, columns: &[String]) -> Result<(), DatastoreError> {
        self.put_values(&self.range(Some("1:1")), vec![columns.to_vec()])
            .await?;
        self.remember_header(columns);
        Ok(())
    }

    async fn read_all_rows(&self) -> Result<Vec<Row>, DatastoreError> {
        let mut values = self.get_values(&self.range(None)).await?.into_iter();
        let header = values.next().unwrap_or_default();
        self.remember_header(&header);

        // The API trims trailing empty cells; pad them back.
        Ok(values
            .map(|cells| {
                header
                    .iter()
                    .enumerate()
                    .map(|(i, column)| (column.clone(), cells.get(i).cloned().unwrap_or_default()))
                    .collect()
            })
            .collect())
    }

    async fn append_row(&self, row: &Row) -> Result<(), DatastoreError> {
        let header = self.cached_header().await?;
        if header.is_empty() {
            return Err(DatastoreError::Unavailable("sheet has no header row".into()));
        }
        let cells = header
            .iter()
            .map(|column| row.get(column).cloned().unwrap_or_default())
            .collect();

        // RAW keeps phones like `0911...` and timestamps as typed text so the
        // row decodes back unchanged.
        let url = format!("{}:append", self.values_url(&self.range(Some("A1"))));
        let response = self
            .client
            .post(url)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .bearer_auth(&self.access_token)
            .json(&ValueRange {
                values: vec![cells],
            })
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn write_cell(
        &self,
        row_index: usize,
        column: &str,
        value: &str,
    ) -> Result<(), DatastoreError> {
        let header = self.cached_header().await?;
        let position = header
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| DatastoreError::NotFound(format!("column {column}")))?;
        let cell = format!("{}{}", column_letter(position), row_index + 2);
        self.put_values(&self.range(Some(&cell)), vec![vec![value.to_string()]])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn datastore(server: &MockServer) -> SheetsDatastore {
        let config = SheetsConfig {
            base_url: server.uri(),
            spreadsheet_id: "sheet-id".into(),
            sheet_name: "Sheet1".into(),
            access_token: "token-123".into(),
        };
        SheetsDatastore::new(&config, Duration::from_secs(5)).unwrap()
    }

    fn values(rows: &[&[&str]]) -> serde_json::Value {
        serde_json::json!({
            "range": "Sheet1!A1:R10",
            "majorDimension": "ROWS",
            "values": rows,
        })
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(9), "J");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
    }

    #[tokio::test]
    async fn read_header_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-id/values/Sheet1!1:1"))
            .and(header("authorization", "Bearer token-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(values(&[&["id", "status"]])))
            .expect(1)
            .mount(&server)
            .await;

        let header = datastore(&server).read_header().await.unwrap();
        assert_eq!(header, vec!["id", "status"]);
    }

    #[tokio::test]
    async fn read_header_of_empty_sheet() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-id/values/Sheet1!1:1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"range": "Sheet1!1:1"})),
            )
            .mount(&server)
            .await;

        assert!(datastore(&server).read_header().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_all_rows_pads_trimmed_cells() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-id/values/Sheet1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(values(&[
                &["id", "status", "rating"],
                &["a", "COMPLETED", "5"],
                &["b", "AVAILABLE"],
            ])))
            .mount(&server)
            .await;

        let rows = datastore(&server).read_all_rows().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["rating"], "5");
        assert_eq!(rows[1]["id"], "b");
        assert_eq!(rows[1]["rating"], "");
    }

    #[tokio::test]
    async fn append_orders_cells_by_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-id/values/Sheet1!1:1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(values(&[&["id", "status"]])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v4/spreadsheets/sheet-id/values/Sheet1!A1:append"))
            .and(query_param("valueInputOption", "RAW"))
            .and(query_param("insertDataOption", "INSERT_ROWS"))
            .and(body_json(serde_json::json!({"values": [["job-1", "AVAILABLE"]]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let row: Row = [("status", "AVAILABLE"), ("id", "job-1")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        datastore(&server).append_row(&row).await.unwrap();
    }

    #[tokio::test]
    async fn write_cell_targets_sheet_row_below_header() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v4/spreadsheets/sheet-id/values/Sheet1!1:1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/v4/spreadsheets/sheet-id/values/Sheet1!B4"))
            .and(query_param("valueInputOption", "RAW"))
            .and(body_json(serde_json::json!({"values": [["IN_PROGRESS"]]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let store = datastore(&server);
        store
            .replace_header(&["id".to_string(), "status".to_string()])
            .await
            .unwrap();
        store.write_cell(2, "status", "IN_PROGRESS").await.unwrap();
    }

    #[tokio::test]
    async fn write_cell_unknown_column_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-id/values/Sheet1!1:1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(values(&[&["id"]])))
            .mount(&server)
            .await;

        let err = datastore(&server).write_cell(0, "status", "X").await.unwrap_err();
        assert!(matches!(err, DatastoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn server_errors_are_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("backend error"))
            .mount(&server)
            .await;

        let err = datastore(&server).read_all_rows().await.unwrap_err();
        assert_eq!(
            err,
            DatastoreError::Unavailable("sheets API returned status 503: backend error".into())
        );
    }

    #[tokio::test]
    async fn missing_spreadsheet_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such spreadsheet"))
            .mount(&server)
            .await;

        let err = datastore(&server).read_header().await.unwrap_err();
        assert!(matches!(err, DatastoreError::NotFound(_)));
    }
}
