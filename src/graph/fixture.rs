//! In-memory graph backend for tests: answers statements with canned rows
//! chosen by substring match and records every call.

use std::sync::{Arc, Mutex};

use serde_json::Value;

use super::{GraphError, Row};

#[derive(Debug, Clone)]
enum Reply {
    Rows(Vec<Row>),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Rule {
    needle: String,
    params: Option<Value>,
    reply: Reply,
}

#[derive(Debug, Clone, Default)]
pub struct FixtureGraph {
    rules: Vec<Rule>,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

impl FixtureGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statements containing `needle` return `rows` (each a JSON object).
    /// Rules are tried in insertion order; unmatched statements return no rows.
    pub fn on(self, needle: &str, rows: Vec<Value>) -> Self {
        self.rule(needle, None, Reply::Rows(to_rows(rows)))
    }

    /// Like [`on`](Self::on), but also requires the parameters to equal `params`.
    pub fn on_params(self, needle: &str, params: Value, rows: Vec<Value>) -> Self {
        self.rule(needle, Some(params), Reply::Rows(to_rows(rows)))
    }

    /// Statements containing `needle` fail with a Neo4j-style query error.
    pub fn fail_on(self, needle: &str, message: &str) -> Self {
        self.rule(needle, None, Reply::Fail(message.into()))
    }

    fn rule(mut self, needle: &str, params: Option<Value>, reply: Reply) -> Self {
        self.rules.push(Rule { needle: needle.into(), params, reply });
        self
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn query(&self, statement: &str, params: Value) -> Result<Vec<Row>, GraphError> {
        self.calls.lock().unwrap().push((statement.to_string(), params.clone()));
        let hit = self.rules.iter().find(|r| {
            statement.contains(&r.needle) && r.params.as_ref().is_none_or(|p| *p == params)
        });
        match hit.map(|r| &r.reply) {
            Some(Reply::Rows(rows)) => Ok(rows.clone()),
            Some(Reply::Fail(message)) => Err(GraphError::Query {
                code: "Neo.ClientError.Statement.SyntaxError".into(),
                message: message.clone(),
            }),
            None => Ok(Vec::new()),
        }
    }
}

fn to_rows(rows: Vec<Value>) -> Vec<Row> {
    rows.into_iter()
        .map(|v| match v {
            Value::Object(map) => map,
            other => panic!("fixture rows must be objects, got {other}"),
        })
        .collect()
}
