//! Prompt templates and the builder that fills them.
//!
//! Templates live under `config/prompts/` and are compiled into the binary.
//! Variable substitution uses `{{key}}` syntax and runs once, in a single
//! pass, at [`build()`](PromptBuilder::build) time. Substituted values are
//! never rescanned, so user text containing `{{...}}` is left alone.

use std::collections::HashMap;

pub const ENTITY_SYSTEM: &str = include_str!("../../config/prompts/entity_system.md");
pub const ENTITY_EXTRACTION: &str = include_str!("../../config/prompts/entity_extraction.md");
pub const CYPHER_SYSTEM: &str = include_str!("../../config/prompts/cypher_system.md");
pub const CYPHER_GENERATION: &str = include_str!("../../config/prompts/cypher_generation.md");
pub const RESPONSE_SYSTEM: &str = include_str!("../../config/prompts/response_system.md");
pub const RESPONSE: &str = include_str!("../../config/prompts/response.md");
/// House style used by the `/chat` service endpoint.
pub const TONE_GUIDE: &str = include_str!("../../config/prompts/tone_guide.md");

const SEPARATOR: &str = "\n\n";

/// Fluent builder that assembles a prompt from text fragments.
///
/// ```rust
/// use paysoko_assistant::qa::prompt::PromptBuilder;
///
/// let prompt = PromptBuilder::new()
///     .append("User Question: {{question}}")
///     .var("question", "Where is the CBD office?")
///     .build();
/// assert_eq!(prompt, "User Question: Where is the CBD office?");
/// ```
#[derive(Debug, Default)]
pub struct PromptBuilder {
    parts: Vec<String>,
    vars: HashMap<String, String>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text fragment; blank fragments are skipped.
    pub fn append(mut self, text: impl Into<String>) -> Self {
        let s = text.into();
        let trimmed = s.trim();
        if !trimmed.is_empty() {
            self.parts.push(trimmed.to_string());
        }
        self
    }

    /// Register `{{key}}` → `value` substitution pairs applied at build time.
    pub fn with_vars<'a, I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (k, v) in vars {
            self.vars.insert(k.to_string(), v.to_string());
        }
        self
    }

    pub fn var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }

    /// Join fragments with blank lines and substitute known variables.
    /// Unknown placeholders are kept verbatim.
    pub fn build(self) -> String {
        let joined = self.parts.join(SEPARATOR);
        let mut out = String::with_capacity(joined.len());
        let mut rest = joined.as_str();

        while let Some(open) = rest.find("{{") {
            out.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            match after.find("}}") {
                Some(close) => {
                    let key = &after[..close];
                    match self.vars.get(key.trim()) {
                        Some(value) => out.push_str(value),
                        None => {
                            out.push_str("{{");
                            out.push_str(key);
                            out.push_str("}}");
                        }
                    }
                    rest = &after[close + 2..];
                }
                None => {
                    out.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}
