//! Comms subsystem: the front-ends customers talk to.
//!
//! # Architecture
//!
//! Each channel (PTY console, axum HTTP server) implements
//! [`runtime::Component`](crate::subsystems::runtime::Component) and is
//! spawned as an independent task by [`start`]. Channels capture their shared
//! [`Arc<CommsState>`] at construction time.
//!
//! An intra-subsystem [`mpsc`] channel lets running channels signal the
//! comms manager (lifecycle events). It is drained in a short-lived
//! background task that dies when all channel senders are dropped.
//!
//! # Starting
//!
//! [`start`] is synchronous: it returns a [`SubsystemHandle`] as soon as
//! the tasks are spawned. The caller decides when to await it.

mod state;
#[cfg(feature = "channel-axum")]
pub mod axum_channel;
#[cfg(feature = "channel-pty")]
pub mod pty;

pub use state::{CommsEvent, CommsState, TONES, resolve_tone};

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Config;
use crate::qa::QaChain;
use crate::qa_log::QaLogger;
use crate::subsystems::runtime::{Component, SubsystemHandle, idle, spawn_components};

/// Spawn all configured channels and return a [`SubsystemHandle`].
///
/// If any channel exits with an error the shared `shutdown` token is
/// cancelled so siblings stop cooperatively. The handle resolves when all
/// channels have exited.
pub fn start(
    config: &Config,
    chain: Arc<QaChain>,
    logger: QaLogger,
    shutdown: CancellationToken,
) -> SubsystemHandle {
    let (event_tx, event_rx) = mpsc::channel::<CommsEvent>(32);
    let state = Arc::new(CommsState::new(chain, logger, config.qa.default_tone.clone(), event_tx));

    let mut components: Vec<Box<dyn Component>> = Vec::new();

    #[cfg(feature = "channel-pty")]
    {
        if config.comms_pty_should_load() {
            info!("loading pty channel");
            components.push(Box::new(pty::PtyChannel::new("pty0", state.clone())));
        }
    }

    #[cfg(feature = "channel-axum")]
    {
        if config.comms_http_should_load() {
            info!(bind = %config.comms.http.bind, "loading axum channel");
            components.push(Box::new(axum_channel::AxumChannel::new(
                "http0",
                config.comms.http.bind.clone(),
                state.clone(),
            )));
        }
    }

    drop(state);
    if components.is_empty() {
        info!("no comms channels configured, waiting for shutdown");
        return idle(shutdown);
    }

    // Monitoring only; ends once every channel has dropped its sender.
    tokio::spawn(async move {
        let mut rx = event_rx;
        while let Some(event) = rx.recv().await {
            match event {
                CommsEvent::ChannelShutdown { ref channel_id } => {
                    debug!(channel_id, "channel reported shutdown");
                }
                CommsEvent::SessionStarted { ref channel_id } => {
                    debug!(channel_id, "channel session started");
                }
            }
        }
    });

    spawn_components(components, shutdown)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::graph::GraphClient;
    use crate::llm::LlmProvider;
    use crate::llm::providers::scripted::ScriptedProvider;
    use crate::qa::QaOptions;
    use tempfile::TempDir;

    #[tokio::test]
    async fn no_channels_keeps_running_until_shutdown() {
        let dir = TempDir::new().unwrap();
        let config = Config::test_default(dir.path());
        assert!(!config.comms_pty_should_load() && !config.comms_http_should_load());

        let chain = QaChain::new(
            LlmProvider::Scripted(ScriptedProvider::default()),
            GraphClient::Fixture(state::test_support::graph()),
            QaOptions::default(),
        )
        .await
        .unwrap();
        let logger = QaLogger::open(&config.qa.log_file).unwrap();

        let token = CancellationToken::new();
        let mut handle = Box::pin(start(&config, Arc::new(chain), logger, token.clone()).join());

        let early = tokio::time::timeout(Duration::from_millis(50), &mut handle).await;
        assert!(early.is_err(), "comms exited with no channels before shutdown");

        token.cancel();
        assert!(handle.await.is_ok());
    }
}
