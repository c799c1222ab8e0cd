//! Response synthesis: turn the query result into a markdown answer in the
//! requested tone.

use tracing::debug;

use super::prompt::{PromptBuilder, RESPONSE, RESPONSE_SYSTEM};
use crate::graph::Row;
use crate::llm::{Completion, LlmProvider, ProviderError};

pub async fn synthesize(
    llm: &LlmProvider,
    question: &str,
    query: &str,
    rows: &[Row],
    tone: &str,
) -> Result<String, ProviderError> {
    let response = serde_json::to_string(rows).unwrap_or_else(|_| "[]".to_string());
    let user = PromptBuilder::new()
        .append(RESPONSE)
        .var("question", question)
        .var("query", query)
        .var("response", response)
        .var("tone_of_voice", tone)
        .build();

    let reply = llm
        .complete(&Completion::new(user).with_system(RESPONSE_SYSTEM.trim()))
        .await?;
    if let Some(usage) = reply.usage {
        debug!(input_tokens = usage.input_tokens, output_tokens = usage.output_tokens, "answer synthesized");
    }
    Ok(reply.text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::scripted::ScriptedProvider;
    use serde_json::json;

    #[tokio::test]
    async fn prompt_carries_rows_query_and_tone() {
        let script = ScriptedProvider::new(["  **Paysoko CBD** opens at 08:00.\n"]);
        let llm = LlmProvider::Scripted(script.clone());
        let rows = vec![
            json!({ "opening_time": "08:00" }).as_object().cloned().unwrap_or_default(),
        ];
        let answer = synthesize(
            &llm,
            "When does CBD open?",
            "MATCH (h:OfficeHour) RETURN h.opening_time AS opening_time",
            &rows,
            "Brief and direct",
        )
        .await
        .unwrap();
        assert_eq!(answer, "**Paysoko CBD** opens at 08:00.");

        let sent = &script.requests()[0];
        assert!(sent.user.contains("Question: When does CBD open?"));
        assert!(sent.user.contains("Cypher query: MATCH (h:OfficeHour)"));
        assert!(sent.user.contains(r#"Database Response: [{"opening_time":"08:00"}]"#));
        assert!(sent.user.ends_with("Brief and direct"));
        assert!(sent.system.as_deref().unwrap_or_default().contains("customer service assistant"));
    }

    #[tokio::test]
    async fn empty_result_is_rendered_as_empty_list() {
        let script = ScriptedProvider::new(["I could not find that."]);
        let llm = LlmProvider::Scripted(script.clone());
        synthesize(&llm, "q", "", &[], "Friendly and helpful").await.unwrap();
        assert!(script.requests()[0].user.contains("Database Response: []"));
    }
}
