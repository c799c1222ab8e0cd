//! Component runtime shared by the comms channels.
//!
//! A [`Component`] is an independently-runnable unit (a PTY console, an HTTP
//! server). It is constructed with its shared state already captured inside
//! it, then handed to [`spawn_components`].
//!
//! [`spawn_components`] returns a [`SubsystemHandle`] that the caller can
//! `.await` or hold onto while doing other work. Any component error cancels
//! the shared [`CancellationToken`] so siblings and `main` shut down cleanly.

use std::future::Future;
use std::pin::Pin;

use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::AppError;

// ── Component ─────────────────────────────────────────────────────────────────

/// A boxed, owned future returned by [`Component::run`].
pub type ComponentFuture =
    Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'static>>;

/// A self-contained, concurrently-runnable unit.
///
/// Implementors capture their shared state (`Arc<CommsState>`) at
/// construction time. [`Component::run`] is called once by
/// [`spawn_components`] and should run until `shutdown` is cancelled or the
/// component's own work is done.
pub trait Component: Send + 'static {
    /// Stable identifier used in log messages.
    fn id(&self) -> &str;

    /// Consume the component and return its async run-loop as a boxed future.
    ///
    /// The returned future must be `Send + 'static` so it can be spawned on
    /// the Tokio thread pool. Capture the `CancellationToken` inside it to
    /// respect cooperative shutdown.
    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture;
}

// ── SubsystemHandle ───────────────────────────────────────────────────────────

/// An opaque handle to a running subsystem task set.
///
/// Returned by [`spawn_components`]. The caller can `.await` it to block until
/// all components have exited, or store it and poll it later.
pub struct SubsystemHandle {
    inner: JoinHandle<Result<(), AppError>>,
}

impl SubsystemHandle {
    /// Await all components and return the first error, if any.
    pub async fn join(self) -> Result<(), AppError> {
        match self.inner.await {
            Ok(r) => r,
            Err(e) => Err(AppError::Comms(format!("subsystem task panicked: {e}"))),
        }
    }
}

// ── spawn_components ──────────────────────────────────────────────────────────

/// Spawn each [`Component`] as an independent Tokio task and return a
/// [`SubsystemHandle`] that resolves when all components have exited.
///
/// The first component error or panic cancels `shutdown` so the remaining
/// channels stop; the handle still drains them and reports that first error.
/// An empty list resolves immediately; use [`idle`] to park instead.
pub fn spawn_components(
    components: Vec<Box<dyn Component>>,
    shutdown: CancellationToken,
) -> SubsystemHandle {
    let handle = tokio::spawn(async move {
        let mut set: JoinSet<(String, Result<(), AppError>)> = JoinSet::new();

        for component in components {
            let id = component.id().to_string();
            debug!(component = %id, "spawning component");
            let run = component.run(shutdown.clone());
            set.spawn(async move { (id, run.await) });
        }

        let mut first_err: Option<AppError> = None;

        while let Some(res) = set.join_next().await {
            match res {
                Err(e) => {
                    error!("component panicked: {e}");
                    shutdown.cancel();
                    first_err.get_or_insert_with(|| AppError::Comms(format!("component panicked: {e}")));
                }
                Ok((id, Err(e))) => {
                    error!(component = %id, "component error: {e}");
                    shutdown.cancel();
                    first_err.get_or_insert(e);
                }
                Ok((id, Ok(()))) => {
                    info!(component = %id, remaining = set.len(), "component exited");
                }
            }
        }

        first_err.map_or(Ok(()), Err)
    });

    SubsystemHandle { inner: handle }
}

/// A handle with no components that resolves once `shutdown` is cancelled.
///
/// Keeps the process up when every channel is disabled in config.
pub fn idle(shutdown: CancellationToken) -> SubsystemHandle {
    let handle = tokio::spawn(async move {
        shutdown.cancelled().await;
        Ok(())
    });
    SubsystemHandle { inner: handle }
}
