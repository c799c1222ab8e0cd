//! Dummy LLM provider: echoes the user message back prefixed with `[echo]`.
//! Lets the service start without an API key.

use crate::llm::{Completion, LlmResponse, ProviderError};

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    pub async fn complete(&self, request: &Completion) -> Result<LlmResponse, ProviderError> {
        Ok(LlmResponse {
            text: format!("[echo] {}", request.user),
            usage: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn complete_prefixes_echo() {
        let p = DummyProvider;
        assert_eq!(p.complete(&Completion::new("hello")).await.unwrap().text, "[echo] hello");
    }

    #[tokio::test]
    async fn complete_ignores_system_and_stop() {
        let p = DummyProvider;
        let req = Completion::new("").with_system("sys").with_stop("\nResult:");
        let r = p.complete(&req).await.unwrap();
        assert_eq!(r.text, "[echo] ");
        assert!(r.usage.is_none());
    }
}
