//! Neo4j client over the HTTP transactional endpoint
//! (`POST {uri}/db/{database}/tx/commit`).
//!
//! Each call is one auto-committed transaction holding a single statement.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, trace};

use super::{GraphError, Row};
use crate::config::Neo4jConfig;

#[derive(Debug, Clone)]
pub struct Neo4jClient {
    client: Client,
    endpoint: String,
    auth: Option<(String, String)>,
}

impl Neo4jClient {
    pub fn new(config: &Neo4jConfig) -> Result<Self, GraphError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| GraphError::Request(format!("failed to build HTTP client: {e}")))?;

        let auth = match (&config.username, &config.password) {
            (Some(u), Some(p)) => Some((u.clone(), p.clone())),
            _ => None,
        };

        Ok(Self {
            client,
            endpoint: format!(
                "{}/db/{}/tx/commit",
                config.uri.trim_end_matches('/'),
                config.database
            ),
            auth,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn query(&self, statement: &str, params: Value) -> Result<Vec<Row>, GraphError> {
        let parameters = match params {
            Value::Null => Value::Object(Default::default()),
            obj @ Value::Object(_) => obj,
            other => {
                return Err(GraphError::Request(format!(
                    "query parameters must be an object, got {other}"
                )));
            }
        };

        let payload = CommitRequest {
            statements: vec![Statement { statement, parameters }],
        };

        debug!(statement_len = statement.len(), "sending graph query");
        trace!(%statement, "full graph statement");

        let mut req = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&payload);
        if let Some((user, pass)) = &self.auth {
            req = req.basic_auth(user, Some(pass));
        }

        let response = req.send().await.map_err(|e| {
            error!(url = %self.endpoint, error = %e, "graph HTTP request failed (transport)");
            GraphError::Request(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read error body>".to_string());
            error!(%status, "graph request returned HTTP error");
            return Err(GraphError::Request(format!("HTTP {status}: {body}")));
        }

        let parsed = response
            .json::<CommitResponse>()
            .await
            .map_err(|e| GraphError::Decode(format!("failed to parse response body: {e}")))?;

        rows_from_response(parsed)
    }
}

/// Turn a transactional response into column-keyed rows, surfacing the first
/// Neo4j error if any.
fn rows_from_response(parsed: CommitResponse) -> Result<Vec<Row>, GraphError> {
    if let Some(err) = parsed.errors.into_iter().next() {
        error!(code = %err.code, "graph query rejected");
        return Err(GraphError::Query { code: err.code, message: err.message });
    }

    let Some(result) = parsed.results.into_iter().next() else {
        return Ok(Vec::new());
    };

    let rows: Vec<Row> = result
        .data
        .into_iter()
        .map(|d| result.columns.iter().cloned().zip(d.row).collect())
        .collect();

    debug!(rows = rows.len(), "graph query returned");
    Ok(rows)
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CommitRequest<'a> {
    statements: Vec<Statement<'a>>,
}

#[derive(Debug, Serialize)]
struct Statement<'a> {
    statement: &'a str,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<Neo4jError>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<DataRow>,
}

#[derive(Debug, Deserialize)]
struct DataRow {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Neo4jError {
    code: String,
    message: String,
}
