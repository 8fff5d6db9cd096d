//! BigQuery `jobs.query` over REST.
//!
//! The SQL string is forwarded verbatim in the GoogleSQL dialect
//! (`useLegacySql: false`) at a fixed location, authorized with the caller's
//! own bearer token.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RelayError, Result};
use crate::provider::{AccessToken, Warehouse};
use crate::row::{reshape, FieldList, Row, TableRef, TableRow};

pub const BIGQUERY_BASE_URL: &str = "https://bigquery.googleapis.com";

/// Default processing location for queries.
pub const DEFAULT_LOCATION: &str = "US";

/// `SELECT <fields> FROM `project.dataset.table``, the full-table listing.
pub fn default_query(table: &TableRef, fields: &FieldList) -> String {
    format!("SELECT {} FROM {}", fields.joined(), table)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    query: &'a str,
    location: &'a str,
    use_legacy_sql: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: Option<bool>,
    // Absent when the query matched nothing.
    #[serde(default)]
    rows: Vec<TableRow>,
}

/// [`Warehouse`] backed by the BigQuery v2 REST API.
pub struct BigQueryRest {
    http: reqwest::Client,
    base_url: String,
    project: String,
    location: String,
    fields: FieldList,
}

impl BigQueryRest {
    pub fn new(http: reqwest::Client, project: impl Into<String>, fields: FieldList) -> Self {
        Self {
            http,
            base_url: BIGQUERY_BASE_URL.to_owned(),
            project: project.into(),
            location: DEFAULT_LOCATION.to_owned(),
            fields,
        }
    }

    /// Point at another API root (tests, emulators).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    fn queries_url(&self) -> String {
        format!(
            "{}/bigquery/v2/projects/{}/queries",
            self.base_url.trim_end_matches('/'),
            self.project
        )
    }
}

#[async_trait]
impl Warehouse for BigQueryRest {
    async fn run_query(&self, token: &AccessToken, sql: &str) -> Result<Vec<Row>> {
        let request = QueryRequest {
            query: sql,
            location: &self.location,
            use_legacy_sql: false,
        };

        let resp = self
            .http
            .post(self.queries_url())
            .bearer_auth(token.secret())
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(RelayError::upstream("bigquery", status, &text));
        }

        let body: QueryResponse = serde_json::from_str(&text)?;
        if body.job_complete == Some(false) {
            return Err(RelayError::InvalidResponse(
                "query did not complete within the request deadline".into(),
            ));
        }

        let rows = reshape(&body.rows, &self.fields)?;
        debug!(rows = rows.len(), "warehouse query finished");
        Ok(rows)
    }
}
