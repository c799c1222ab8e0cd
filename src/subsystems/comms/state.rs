//! Shared state for the comms subsystem: the capability boundary for
//! channels.
//!
//! Channels receive an `Arc<CommsState>` and are restricted to the typed
//! methods below. The QA chain and the interaction log are private, so every
//! answered question is logged no matter which channel asked it.
//!
//! # Intra-subsystem events
//!
//! [`CommsState::report_event`] lets a running channel signal the comms
//! manager (e.g. "I shut down", "new session started"). The manager owns the
//! receiver end.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::qa::{QaAnswer, QaChain};
use crate::qa_log::{LogEntry, QaLogger};

/// Tone choices offered by the interactive UIs.
pub const TONES: [&str; 4] = [
    "Professional and formal",
    "Friendly and helpful",
    "Brief and direct",
    "Detailed and explanatory",
];

// ── Events ────────────────────────────────────────────────────────────────────

/// Events a channel sends back to the comms manager.
#[derive(Debug)]
pub enum CommsEvent {
    /// Channel has stopped (clean exit or EOF).
    ChannelShutdown { channel_id: String },
    /// A new session/connection was established on the channel.
    SessionStarted { channel_id: String },
}

// ── State ─────────────────────────────────────────────────────────────────────

/// Shared state passed as `Arc<CommsState>` to every channel task.
pub struct CommsState {
    chain: Arc<QaChain>,
    logger: QaLogger,
    default_tone: String,
    /// Back-channel to the comms manager.
    event_tx: mpsc::Sender<CommsEvent>,
}

impl CommsState {
    pub fn new(
        chain: Arc<QaChain>,
        logger: QaLogger,
        default_tone: impl Into<String>,
        event_tx: mpsc::Sender<CommsEvent>,
    ) -> Self {
        Self { chain, logger, default_tone: default_tone.into(), event_tx }
    }

    /// Answer `question` in `tone` and record the exchange.
    ///
    /// Failed questions are not logged.
    pub async fn ask(&self, channel_id: &str, question: &str, tone: &str) -> Result<QaAnswer, AppError> {
        debug!(%channel_id, question_len = question.len(), %tone, "question received");
        let answer = self.chain.ask(question, tone).await?;
        self.logger.log_qa(question, &answer.answer);
        Ok(answer)
    }

    pub fn default_tone(&self) -> &str {
        &self.default_tone
    }

    pub fn log_entries(&self) -> Result<Vec<LogEntry>, AppError> {
        self.logger.entries()
    }

    /// Backend names for health output.
    pub fn backends(&self) -> (&'static str, &'static str) {
        (self.chain.llm().name(), self.chain.graph().name())
    }

    /// Report an event to the comms manager.
    ///
    /// Non-blocking: drops the event and logs a warning if the manager is not
    /// keeping up (channel full) or has already exited (closed).
    pub fn report_event(&self, event: CommsEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("comms event dropped: {e}");
        }
    }
}

/// Resolve a tone by 1-based index or case-insensitive name.
pub fn resolve_tone(choice: &str) -> Option<&'static str> {
    let choice = choice.trim();
    if let Ok(n) = choice.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| TONES.get(i)).copied();
    }
    TONES.iter().find(|t| t.eq_ignore_ascii_case(choice)).copied()
}

#[cfg(test)]
pub(crate) mod test_support {
    //! A `CommsState` wired to the scripted LLM and fixture graph.

    use super::*;
    use crate::graph::GraphClient;
    use crate::graph::fixture::FixtureGraph;
    use crate::llm::LlmProvider;
    use crate::llm::providers::scripted::ScriptedProvider;
    use crate::qa::QaOptions;
    use serde_json::json;

    pub fn graph() -> FixtureGraph {
        FixtureGraph::new()
            .on(
                "UNWIND other",
                vec![json!({ "output": { "start": "OfficeLocation", "type": "OFFERS", "end": "Services" } })],
            )
            .on("RETURN s.service_name", vec![json!({ "service": "Money Transfer" })])
    }

    /// Replies for one successful question.
    pub fn one_answer(answer: &str) -> Vec<String> {
        vec![
            r#"{"services": []}"#.to_string(),
            "MATCH (s:Services) RETURN s.service_name AS service".to_string(),
            answer.to_string(),
        ]
    }

    pub async fn state(
        script: ScriptedProvider,
        log_path: &std::path::Path,
    ) -> (Arc<CommsState>, mpsc::Receiver<CommsEvent>) {
        let chain = QaChain::new(
            LlmProvider::Scripted(script),
            GraphClient::Fixture(graph()),
            QaOptions::default(),
        )
        .await
        .unwrap();
        let logger = QaLogger::open(log_path).unwrap();
        let (tx, rx) = mpsc::channel(8);
        (Arc::new(CommsState::new(Arc::new(chain), logger, TONES[1], tx)), rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::scripted::ScriptedProvider;
    use tempfile::TempDir;

    #[test]
    fn tones_resolve_by_index_or_name() {
        assert_eq!(resolve_tone("1"), Some("Professional and formal"));
        assert_eq!(resolve_tone(" 4 "), Some("Detailed and explanatory"));
        assert_eq!(resolve_tone("brief and direct"), Some("Brief and direct"));
        assert_eq!(resolve_tone("0"), None);
        assert_eq!(resolve_tone("5"), None);
        assert_eq!(resolve_tone("sarcastic"), None);
    }

    #[tokio::test]
    async fn ask_logs_successful_exchanges() {
        let dir = TempDir::new().unwrap();
        let script = ScriptedProvider::new(test_support::one_answer("We offer **Money Transfer**."));
        let (state, _rx) = test_support::state(script, &dir.path().join("qa.csv")).await;

        let answer = state.ask("pty0", "What services do you offer?", TONES[2]).await.unwrap();
        assert_eq!(answer.answer, "We offer **Money Transfer**.");
        assert_eq!(answer.rows.len(), 1);

        let entries = state.log_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].question, "What services do you offer?");
        assert_eq!(entries[0].response, "We offer **Money Transfer**.");
    }

    #[tokio::test]
    async fn failed_questions_are_not_logged() {
        let dir = TempDir::new().unwrap();
        let (state, _rx) = test_support::state(ScriptedProvider::default(), &dir.path().join("qa.csv")).await;
        assert!(state.ask("pty0", "hello", TONES[0]).await.is_err());
        assert!(state.log_entries().unwrap().is_empty());
    }

    #[tokio::test]
    async fn events_reach_the_manager() {
        let dir = TempDir::new().unwrap();
        let (state, mut rx) = test_support::state(ScriptedProvider::default(), &dir.path().join("qa.csv")).await;
        state.report_event(CommsEvent::SessionStarted { channel_id: "http0".into() });
        assert!(matches!(rx.recv().await, Some(CommsEvent::SessionStarted { .. })));
        assert_eq!(state.default_tone(), "Friendly and helpful");
        assert_eq!(state.backends(), ("scripted", "fixture"));
    }
}
