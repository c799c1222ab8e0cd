//! Entity extraction: the LLM lists the offices, services, appointments and
//! hours a question mentions, and the reply is parsed leniently into
//! [`PaysokoEntities`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::prompt::{ENTITY_EXTRACTION, ENTITY_SYSTEM, PromptBuilder};
use crate::llm::{Completion, LlmProvider, ProviderError};

/// Mentions pulled out of a customer question. Every list may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaysokoEntities {
    #[serde(default, deserialize_with = "lenient_list")]
    pub office_locations: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub services: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub appointments: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub office_hours: Vec<String>,
}

impl PaysokoEntities {
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn count(&self) -> usize {
        self.office_locations.len() + self.services.len() + self.appointments.len() + self.office_hours.len()
    }
}

/// Ask the model for the mentions in `question`.
///
/// An unparseable reply is not an error: it yields empty entities and the
/// pipeline carries on without a mapping.
pub async fn extract(llm: &LlmProvider, question: &str) -> Result<PaysokoEntities, ProviderError> {
    let user = PromptBuilder::new()
        .append(ENTITY_EXTRACTION)
        .var("question", question)
        .build();
    let reply = llm.complete(&Completion::new(user).with_system(ENTITY_SYSTEM.trim())).await?;

    match parse_reply(&reply.text) {
        Some(entities) => {
            debug!(entities = entities.count(), "entities extracted");
            Ok(entities)
        }
        None => {
            warn!(reply_len = reply.text.len(), "entity reply had no JSON object; continuing without entities");
            Ok(PaysokoEntities::default())
        }
    }
}

/// Parse an extraction reply. Code fences and chatter around the JSON object
/// are ignored; returns `None` when no object can be decoded.
pub fn parse_reply(reply: &str) -> Option<PaysokoEntities> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&reply[start..=end]).ok()
}

/// Accepts `null`, a JSON list, or a stringified list such as
/// `"['Paysoko CBD', 'Westlands']"`.
fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => split_list_literal(&s),
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Null => None,
                Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
                other => Some(other.to_string()),
            })
            .collect(),
        Some(other) => vec![other.to_string()],
    })
}

fn split_list_literal(s: &str) -> Vec<String> {
    s.trim()
        .trim_matches(|c| c == '[' || c == ']')
        .replace(['\'', '"'], "")
        .split(", ")
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
