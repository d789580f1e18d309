//! BigQuery streaming-insert adapter (`tabledata.insertAll`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::http_client;
use crate::error::WarehouseError;
use crate::traits::{RowError, Warehouse};

#[derive(Debug, Clone)]
pub struct BigQueryConfig {
    pub base_url: String,
    pub project: String,
    pub dataset: String,
    /// OAuth2 bearer token with BigQuery insert scope.
    pub access_token: String,
    pub timeout_secs: Option<u64>,
}

impl Default for BigQueryConfig {
    fn default() -> Self {
        Self {
            base_url: "https://bigquery.googleapis.com/bigquery/v2".to_string(),
            project: String::new(),
            dataset: String::new(),
            access_token: String::new(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BigQueryWarehouse {
    config: BigQueryConfig,
    client: reqwest::blocking::Client,
}

impl BigQueryWarehouse {
    pub fn new(config: BigQueryConfig) -> Result<Self, reqwest::Error> {
        let client = http_client(config.timeout_secs, None)?;
        Ok(Self { config, client })
    }

    fn insert_url(&self, table: &str) -> String {
        format!(
            "{}/projects/{}/datasets/{}/tables/{}/insertAll",
            self.config.base_url.trim_end_matches('/'),
            self.config.project,
            self.config.dataset,
            table
        )
    }
}

impl Warehouse for BigQueryWarehouse {
    fn insert_rows(&self, table: &str, rows: &[Value]) -> Result<Vec<RowError>, WarehouseError> {
        let request = InsertAllRequest {
            kind: "bigquery#tableDataInsertAllRequest",
            rows: rows.iter().map(|json| InsertRow { json }).collect(),
        };

        let response = self
            .client
            .post(self.insert_url(table))
            .bearer_auth(&self.config.access_token)
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(WarehouseError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<InsertAllResponse>()?.row_errors())
    }
}

#[derive(Serialize)]
struct InsertAllRequest<'a> {
    kind: &'static str,
    rows: Vec<InsertRow<'a>>,
}

#[derive(Serialize)]
struct InsertRow<'a> {
    json: &'a Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<InsertError>,
}

#[derive(Debug, Deserialize)]
struct InsertError {
    index: usize,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
}

impl InsertAllResponse {
    fn row_errors(self) -> Vec<RowError> {
        self.insert_errors
            .into_iter()
            .map(|failure| RowError {
                index: failure.index,
                message: failure
                    .errors
                    .iter()
                    .map(|err| format!("{}: {}", err.reason, err.message))
                    .collect::<Vec<_>>()
                    .join("; "),
            })
            .collect()
    }
}
