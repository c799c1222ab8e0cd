//! LLM provider abstraction.
//!
//! `LlmProvider` is an enum over concrete provider implementations.
//! Add a new variant + module in `providers/` for each additional backend.
//!
//! Provider instances are shared immutable capabilities; clone them freely.
//! Every call is a single round-trip; history, retries and tool loops are
//! not handled here.

pub mod providers;

use thiserror::Error;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("provider request failed: {0}")]
    Request(String),
}

// ── Request / response ────────────────────────────────────────────────────────

/// A single-turn completion request: optional system prompt, one user
/// message, and optional stop sequences.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub system: Option<String>,
    pub user: String,
    pub stop: Vec<String>,
}

impl Completion {
    pub fn new(user: impl Into<String>) -> Self {
        Self { user: user.into(), ..Default::default() }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_stop(mut self, stop: impl Into<String>) -> Self {
        self.stop.push(stop.into());
        self
    }
}

/// Token accounting reported by the provider, when available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LlmUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub usage: Option<LlmUsage>,
}

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available provider backends.
///
/// Enum dispatch avoids `dyn` trait objects and the `async-trait` dependency.
/// Adding a backend = new module + new variant + new `complete` arm.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    Dummy(providers::dummy::DummyProvider),
    Anthropic(providers::anthropic::AnthropicProvider),
    OpenAiCompatible(providers::openai_compatible::OpenAiCompatibleProvider),
    #[cfg(test)]
    Scripted(providers::scripted::ScriptedProvider),
}

impl LlmProvider {
    /// Send `request` to the provider and return its text reply.
    pub async fn complete(&self, request: &Completion) -> Result<LlmResponse, ProviderError> {
        match self {
            LlmProvider::Dummy(p) => p.complete(request).await,
            LlmProvider::Anthropic(p) => p.complete(request).await,
            LlmProvider::OpenAiCompatible(p) => p.complete(request).await,
            #[cfg(test)]
            LlmProvider::Scripted(p) => p.complete(request).await,
        }
    }

    /// Short backend name for logs and health output.
    pub fn name(&self) -> &'static str {
        match self {
            LlmProvider::Dummy(_) => "dummy",
            LlmProvider::Anthropic(_) => "anthropic",
            LlmProvider::OpenAiCompatible(_) => "openai-compatible",
            #[cfg(test)]
            LlmProvider::Scripted(_) => "scripted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_builder_collects_parts() {
        let c = Completion::new("question")
            .with_system("be brief")
            .with_stop("\nResult:");
        assert_eq!(c.user, "question");
        assert_eq!(c.system.as_deref(), Some("be brief"));
        assert_eq!(c.stop, vec!["\nResult:".to_string()]);
    }

    #[tokio::test]
    async fn enum_dispatches_to_dummy() {
        let p = LlmProvider::Dummy(providers::dummy::DummyProvider);
        let r = p.complete(&Completion::new("hi")).await.unwrap();
        assert_eq!(r.text, "[echo] hi");
        assert_eq!(p.name(), "dummy");
    }
}
