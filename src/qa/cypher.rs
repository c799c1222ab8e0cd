//! Query synthesis: schema + mapped entities + question → one Cypher query.

use tracing::{debug, trace};

use super::prompt::{CYPHER_GENERATION, CYPHER_SYSTEM, PromptBuilder};
use crate::llm::{Completion, LlmProvider, ProviderError};

/// Generation stops before the model starts inventing a result section.
pub const STOP_SEQUENCE: &str = "\nResult:";

pub async fn generate(
    llm: &LlmProvider,
    schema: &str,
    mapping: Option<&str>,
    question: &str,
) -> Result<String, ProviderError> {
    let user = PromptBuilder::new()
        .append(CYPHER_GENERATION)
        .var("schema", schema)
        .var("entities_list", mapping.map(str::trim_end).unwrap_or("None"))
        .var("question", question)
        .build();
    let request = Completion::new(user)
        .with_system(CYPHER_SYSTEM.trim())
        .with_stop(STOP_SEQUENCE);

    let reply = llm.complete(&request).await?;
    let query = clean_query(&reply.text);
    debug!(query_len = query.len(), "cypher generated");
    trace!(%query, "generated cypher");
    Ok(query)
}

/// Drop a surrounding markdown fence and anything past the stop marker, for
/// providers that ignore stop sequences.
pub fn clean_query(text: &str) -> String {
    let text = match text.find(STOP_SEQUENCE) {
        Some(i) => &text[..i],
        None => text,
    };
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        body = rest
            .strip_prefix("cypher")
            .or_else(|| rest.strip_prefix("Cypher"))
            .unwrap_or(rest);
        body = body.strip_suffix("```").unwrap_or(body);
    }
    body.trim().to_string()
}
