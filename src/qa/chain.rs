//! The question-answering pipeline.
//!
//! `ask` runs five steps in order: entity extraction, entity mapping, query
//! synthesis, direction check + execution, and response synthesis. The graph
//! schema is read once at construction and cached; `refresh_schema` re-reads
//! it.

use std::sync::{Arc, RwLock};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::corrector::{CypherQueryCorrector, Validated};
use super::entities::{self, PaysokoEntities};
use super::{answer, cypher, mapping};
use crate::config::IndexNames;
use crate::error::AppError;
use crate::graph::{GraphClient, Row};
use crate::llm::LlmProvider;

/// Construction-time settings for [`QaChain`].
#[derive(Debug, Clone, Default)]
pub struct QaOptions {
    pub indexes: IndexNames,
}

/// Everything one question produced, for the caller and for logs.
#[derive(Debug, Clone, Serialize)]
pub struct QaAnswer {
    pub answer: String,
    /// The query that was run; `None` when the generated query was rejected.
    pub cypher: Option<String>,
    pub entities: PaysokoEntities,
    pub mapping: Option<String>,
    pub rows: Vec<Row>,
}

#[derive(Debug)]
struct SchemaState {
    text: String,
    corrector: CypherQueryCorrector,
}

#[derive(Debug)]
pub struct QaChain {
    llm: LlmProvider,
    graph: GraphClient,
    options: QaOptions,
    schema: RwLock<Arc<SchemaState>>,
}

impl QaChain {
    /// Read the graph schema and build the chain around it.
    pub async fn new(llm: LlmProvider, graph: GraphClient, options: QaOptions) -> Result<Self, AppError> {
        let state = load_schema(&graph).await?;
        info!(llm = llm.name(), graph = graph.name(), "qa chain ready");
        Ok(Self { llm, graph, options, schema: RwLock::new(Arc::new(state)) })
    }

    pub fn llm(&self) -> &LlmProvider {
        &self.llm
    }

    pub fn graph(&self) -> &GraphClient {
        &self.graph
    }

    /// Rendered schema text currently used for query synthesis.
    pub fn schema_text(&self) -> String {
        self.snapshot().text.clone()
    }

    /// Re-read the schema after the graph changed shape.
    pub async fn refresh_schema(&self) -> Result<(), AppError> {
        let state = load_schema(&self.graph).await?;
        match self.schema.write() {
            Ok(mut guard) => *guard = Arc::new(state),
            Err(poisoned) => *poisoned.into_inner() = Arc::new(state),
        }
        Ok(())
    }

    #[instrument(skip_all, fields(question_len = question.len()))]
    pub async fn ask(&self, question: &str, tone: &str) -> Result<QaAnswer, AppError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::Qa("question is empty".into()));
        }

        let entities = entities::extract(&self.llm, question).await?;
        let mapping = mapping::map_to_database(&self.graph, &self.options.indexes, &entities).await;

        let schema = self.snapshot();
        let generated = cypher::generate(&self.llm, &schema.text, mapping.as_deref(), question).await?;

        let validated = if generated.is_empty() {
            Validated::Rejected
        } else {
            schema.corrector.correct(&generated)
        };

        let (cypher, rows) = match validated {
            Validated::Accepted(query) => {
                if query != generated {
                    debug!("relationship direction corrected");
                }
                let rows = self.graph.query(&query, Value::Null).await?;
                (Some(query), rows)
            }
            Validated::Rejected => {
                warn!(query_len = generated.len(), "generated query does not fit the schema; answering without data");
                (None, Vec::new())
            }
        };

        let shown_query = cypher.as_deref().unwrap_or(&generated);
        let answer = answer::synthesize(&self.llm, question, shown_query, &rows, tone).await?;

        info!(entities = entities.count(), rows = rows.len(), executed = cypher.is_some(), "question answered");
        Ok(QaAnswer { answer, cypher, entities, mapping, rows })
    }

    fn snapshot(&self) -> Arc<SchemaState> {
        match self.schema.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }
}

async fn load_schema(graph: &GraphClient) -> Result<SchemaState, AppError> {
    let schema = graph.structured_schema().await?;
    Ok(SchemaState {
        text: schema.render(),
        corrector: CypherQueryCorrector::new(schema.relationships),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixture::FixtureGraph;
    use crate::llm::providers::scripted::ScriptedProvider;
    use serde_json::json;

    fn schema_fixture() -> FixtureGraph {
        FixtureGraph::new()
            .on(
                "elementType = \"node\"\nWITH",
                vec![json!({ "output": { "labels": "Services", "properties": [
                    { "property": "service_name", "type": "STRING" },
                    { "property": "cost", "type": "FLOAT" }
                ] } })],
            )
            .on(
                "UNWIND other",
                vec![json!({ "output": { "start": "OfficeLocation", "type": "OFFERS", "end": "Services" } })],
            )
    }

    async fn chain(script: &ScriptedProvider, graph: FixtureGraph) -> QaChain {
        QaChain::new(
            LlmProvider::Scripted(script.clone()),
            GraphClient::Fixture(graph),
            QaOptions::default(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn full_pipeline_runs_corrected_query() {
        let script = ScriptedProvider::new([
            r#"{"office_locations": ["CBD"], "services": ["Money Transfer"]}"#,
            "```cypher\nMATCH (s:Services)-[:OFFERS]->(l:OfficeLocation {location_name: 'Paysoko CBD'}) RETURN s.cost AS cost\n```",
            "A money transfer at **Paysoko CBD** costs 50.",
        ]);
        let graph = schema_fixture()
            .on_params(
                "queryNodes",
                json!({ "indexName": "locationIndex", "value": "CBD" }),
                vec![json!({ "result": "Paysoko CBD", "type": "OfficeLocation", "score": 1.5 })],
            )
            .on("RETURN s.cost", vec![json!({ "cost": 50.0 })]);
        let qa = chain(&script, graph.clone()).await;

        let out = qa.ask("  How much is a money transfer at CBD? ", "Brief and direct").await.unwrap();

        assert_eq!(out.answer, "A money transfer at **Paysoko CBD** costs 50.");
        assert_eq!(
            out.cypher.as_deref(),
            Some("MATCH (s:Services)<-[:OFFERS]-(l:OfficeLocation {location_name: 'Paysoko CBD'}) RETURN s.cost AS cost")
        );
        assert_eq!(out.entities.office_locations, vec!["CBD"]);
        let mapping = out.mapping.unwrap();
        assert!(mapping.contains("CBD maps to Paysoko CBD (OfficeLocation) with score 1.50"));
        assert!(mapping.contains("No match found for Money Transfer"));
        assert_eq!(out.rows.len(), 1);

        let requests = script.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[0].user.contains("How much is a money transfer at CBD?"));
        assert!(requests[1].user.contains("(:OfficeLocation)-[:OFFERS]->(:Services)"));
        assert!(requests[2].user.contains(r#"Database Response: [{"cost":50.0}]"#));
        assert!(requests[2].user.ends_with("Brief and direct"));

        let executed = graph.calls().last().cloned().unwrap();
        assert!(executed.0.contains("<-[:OFFERS]-"));
    }

    #[tokio::test]
    async fn rejected_query_is_never_executed() {
        let script = ScriptedProvider::new([
            "{}",
            "MATCH (s:Services)-[:BOOKED_AT]->(h:OfficeHour) RETURN h",
            "Sorry, I could not find that.",
        ]);
        let graph = schema_fixture();
        let qa = chain(&script, graph.clone()).await;
        let calls_before = graph.calls().len();

        let out = qa.ask("When are you open?", "Friendly and helpful").await.unwrap();
        assert!(out.cypher.is_none());
        assert!(out.rows.is_empty());
        assert!(out.mapping.is_none());
        assert_eq!(graph.calls().len(), calls_before);
        assert!(script.requests()[2].user.contains("Database Response: []"));
    }

    #[tokio::test]
    async fn empty_question_makes_no_calls() {
        let script = ScriptedProvider::new(Vec::<String>::new());
        let qa = chain(&script, schema_fixture()).await;
        let err = qa.ask("   ", "Brief and direct").await.unwrap_err();
        assert!(matches!(err, AppError::Qa(_)));
        assert!(script.requests().is_empty());
    }

    #[tokio::test]
    async fn graph_failure_propagates() {
        let script = ScriptedProvider::new(["{}", "MATCH (s:Services) RETURN s.bogus", "unused"]);
        let qa = chain(&script, schema_fixture().fail_on("s.bogus", "Invalid input")).await;
        let err = qa.ask("What services exist?", "Brief and direct").await.unwrap_err();
        assert!(matches!(err, AppError::Graph(_)));
    }

    #[tokio::test]
    async fn llm_failure_propagates() {
        let script = ScriptedProvider::new(Vec::<String>::new());
        script.push_error("upstream 529");
        let qa = chain(&script, schema_fixture()).await;
        let err = qa.ask("hi", "Brief and direct").await.unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));
    }

    #[tokio::test]
    async fn schema_failure_fails_construction() {
        let graph = FixtureGraph::new().fail_on("apoc.meta.data", "There is no procedure");
        let result = QaChain::new(
            LlmProvider::Scripted(ScriptedProvider::default()),
            GraphClient::Fixture(graph),
            QaOptions::default(),
        )
        .await;
        assert!(matches!(result, Err(AppError::Graph(_))));
    }

    #[tokio::test]
    async fn refresh_rereads_schema() {
        let graph = schema_fixture();
        let qa = chain(&ScriptedProvider::default(), graph.clone()).await;
        assert!(qa.schema_text().contains("Services {service_name: STRING, cost: FLOAT}"));
        let before = graph.calls().len();
        qa.refresh_schema().await.unwrap();
        assert_eq!(graph.calls().len(), before + 3);
    }
}
