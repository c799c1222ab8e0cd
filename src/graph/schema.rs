//! Structured graph schema, discovered through `apoc.meta.data()`.
//!
//! The rendered text form is what query synthesis sees; the relationship
//! triples feed the Cypher direction check.

use std::fmt::Write as _;

use serde_json::Value;
use tracing::debug;

use super::{GraphClient, GraphError, Row};

const NODE_PROPERTIES_QUERY: &str = r#"
CALL apoc.meta.data()
YIELD label, other, elementType, type, property
WHERE NOT type = "RELATIONSHIP" AND elementType = "node"
WITH label AS nodeLabels, collect({property:property, type:type}) AS properties
RETURN {labels: nodeLabels, properties: properties} AS output
"#;

const REL_PROPERTIES_QUERY: &str = r#"
CALL apoc.meta.data()
YIELD label, other, elementType, type, property
WHERE NOT type = "RELATIONSHIP" AND elementType = "relationship"
WITH label AS relType, collect({property:property, type:type}) AS properties
RETURN {type: relType, properties: properties} AS output
"#;

const RELATIONSHIPS_QUERY: &str = r#"
CALL apoc.meta.data()
YIELD label, other, elementType, type, property
WHERE type = "RELATIONSHIP" AND elementType = "node"
UNWIND other AS other_node
RETURN {start: label, type: property, end: toString(other_node)} AS output
"#;

/// A `(start)-[type]->(end)` triple present in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub start: String,
    pub rel_type: String,
    pub end: String,
}

impl Relationship {
    pub fn new(start: &str, rel_type: &str, end: &str) -> Self {
        Self { start: start.into(), rel_type: rel_type.into(), end: end.into() }
    }
}

/// `(property name, property type)` pairs.
pub type Properties = Vec<(String, String)>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphSchema {
    pub node_properties: Vec<(String, Properties)>,
    pub rel_properties: Vec<(String, Properties)>,
    pub relationships: Vec<Relationship>,
}

impl GraphSchema {
    /// Text form handed to the query-synthesis prompt.
    pub fn render(&self) -> String {
        let mut out = String::from("Node properties are the following:\n");
        for (label, props) in &self.node_properties {
            let _ = writeln!(out, "{label} {{{}}}", join_props(props));
        }
        out.push_str("Relationship properties are the following:\n");
        for (rel, props) in &self.rel_properties {
            let _ = writeln!(out, "{rel} {{{}}}", join_props(props));
        }
        out.push_str("The relationships are the following:\n");
        for r in &self.relationships {
            let _ = writeln!(out, "(:{})-[:{}]->(:{})", r.start, r.rel_type, r.end);
        }
        out.trim_end().to_string()
    }
}

fn join_props(props: &Properties) -> String {
    props
        .iter()
        .map(|(name, ty)| format!("{name}: {ty}"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(super) async fn discover(graph: &GraphClient) -> Result<GraphSchema, GraphError> {
    let nodes = graph.query(NODE_PROPERTIES_QUERY, Value::Null).await?;
    let rels = graph.query(REL_PROPERTIES_QUERY, Value::Null).await?;
    let triples = graph.query(RELATIONSHIPS_QUERY, Value::Null).await?;

    let schema = GraphSchema {
        node_properties: labelled_properties(&nodes, "labels")?,
        rel_properties: labelled_properties(&rels, "type")?,
        relationships: triples
            .iter()
            .map(|row| {
                let out = output(row)?;
                Ok(Relationship {
                    start: str_field(out, "start")?,
                    rel_type: str_field(out, "type")?,
                    end: str_field(out, "end")?,
                })
            })
            .collect::<Result<_, GraphError>>()?,
    };

    debug!(
        labels = schema.node_properties.len(),
        relationships = schema.relationships.len(),
        "graph schema discovered"
    );
    Ok(schema)
}

fn output(row: &Row) -> Result<&serde_json::Map<String, Value>, GraphError> {
    row.get("output")
        .and_then(Value::as_object)
        .ok_or_else(|| GraphError::Decode("schema row without `output` map".into()))
}

fn str_field(obj: &serde_json::Map<String, Value>, key: &str) -> Result<String, GraphError> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| GraphError::Decode(format!("schema entry missing `{key}`")))
}

fn labelled_properties(rows: &[Row], key: &str) -> Result<Vec<(String, Properties)>, GraphError> {
    rows.iter()
        .map(|row| {
            let out = output(row)?;
            let name = str_field(out, key)?;
            let props = out
                .get("properties")
                .and_then(Value::as_array)
                .map(|arr| {
                    arr.iter()
                        .filter_map(|p| {
                            Some((
                                p.get("property")?.as_str()?.to_string(),
                                p.get("type")?.as_str()?.to_string(),
                            ))
                        })
                        .collect()
                })
                .unwrap_or_default();
            Ok((name, props))
        })
        .collect()
}
