//! Scripted provider for tests: replays canned replies in order and records
//! every request it receives.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::llm::{Completion, LlmResponse, ProviderError};

#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    replies: Arc<Mutex<VecDeque<Result<String, String>>>>,
    requests: Arc<Mutex<Vec<Completion>>>,
}

impl ScriptedProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Arc::new(Mutex::new(replies.into_iter().map(|s| Ok(s.into())).collect())),
            requests: Arc::default(),
        }
    }

    /// Queue a failing reply.
    pub fn push_error(&self, message: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Err(message.into()));
    }

    /// Every request seen so far, in call order.
    pub fn requests(&self) -> Vec<Completion> {
        self.requests.lock().unwrap().clone()
    }

    pub async fn complete(&self, request: &Completion) -> Result<LlmResponse, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(LlmResponse { text, usage: None }),
            Some(Err(e)) => Err(ProviderError::Request(e)),
            None => Err(ProviderError::Request("script exhausted".into())),
        }
    }
}
