//! Graph database access.
//!
//! `GraphClient` is an enum over backends, dispatched the same way as
//! [`crate::llm::LlmProvider`]. The only production backend is Neo4j over its
//! HTTP transactional API; [`schema`] builds the structured schema on top of
//! plain [`GraphClient::query`] calls.

#[cfg(test)]
pub mod fixture;
pub mod neo4j;
pub mod schema;

pub use schema::{GraphSchema, Relationship};

use serde_json::{Map, Value};
use thiserror::Error;

/// One result row, keyed by column name.
pub type Row = Map<String, Value>;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph request failed: {0}")]
    Request(String),
    #[error("{code}: {message}")]
    Query { code: String, message: String },
    #[error("unexpected graph response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone)]
pub enum GraphClient {
    Neo4j(neo4j::Neo4jClient),
    #[cfg(test)]
    Fixture(fixture::FixtureGraph),
}

impl GraphClient {
    /// Run one Cypher statement with named parameters and collect its rows.
    ///
    /// `params` must be a JSON object (or `Value::Null` for none).
    pub async fn query(&self, statement: &str, params: Value) -> Result<Vec<Row>, GraphError> {
        match self {
            GraphClient::Neo4j(c) => c.query(statement, params).await,
            #[cfg(test)]
            GraphClient::Fixture(f) => f.query(statement, params),
        }
    }

    /// Introspect node labels, properties and relationship triples.
    pub async fn structured_schema(&self) -> Result<GraphSchema, GraphError> {
        schema::discover(self).await
    }

    pub fn name(&self) -> &'static str {
        match self {
            GraphClient::Neo4j(_) => "neo4j",
            #[cfg(test)]
            GraphClient::Fixture(_) => "fixture",
        }
    }
}
