//! Process-wide vision runtime with a one-shot readiness signal
//!
//! The runtime polls its backend until it reports loaded or the startup
//! deadline passes. Either outcome is final: a timed-out runtime stays failed
//! until the process restarts.

use crate::backend::{Capabilities, VisionBackend};
use crate::error::LabError;
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(150);
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);
pub const TIMEOUT_MESSAGE: &str =
    "Vision runtime failed to load before the startup deadline. Restart the server to try again.";

static GLOBAL: OnceLock<Arc<Runtime>> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum RuntimeStatus {
    Loading,
    Ready,
    Failed(String),
}

pub struct Runtime {
    backend: Arc<dyn VisionBackend>,
    capabilities: OnceLock<Capabilities>,
    status: watch::Sender<RuntimeStatus>,
}

impl Runtime {
    /// Start polling `backend` for readiness. Must be called inside a tokio runtime.
    pub fn start(
        backend: Arc<dyn VisionBackend>,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Arc<Self> {
        let (status, _) = watch::channel(RuntimeStatus::Loading);
        let runtime = Arc::new(Self {
            backend,
            capabilities: OnceLock::new(),
            status,
        });

        let poller = Arc::clone(&runtime);
        tokio::spawn(async move { poller.poll(poll_interval, timeout).await });

        runtime
    }

    async fn poll(&self, poll_interval: Duration, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        let mut ticker = tokio::time::interval(poll_interval);

        loop {
            ticker.tick().await;

            if self.backend.is_loaded() {
                let capabilities = *self
                    .capabilities
                    .get_or_init(|| self.backend.capabilities());
                tracing::info!(
                    "Vision runtime '{}' ready (adaptive equalization: {})",
                    self.backend.name(),
                    capabilities.adaptive_equalization
                );
                self.status.send_replace(RuntimeStatus::Ready);
                return;
            }

            if Instant::now() >= deadline {
                tracing::error!("{}", TIMEOUT_MESSAGE);
                self.status
                    .send_replace(RuntimeStatus::Failed(TIMEOUT_MESSAGE.to_string()));
                return;
            }
        }
    }

    pub fn backend(&self) -> &dyn VisionBackend {
        self.backend.as_ref()
    }

    pub fn status(&self) -> RuntimeStatus {
        self.status.borrow().clone()
    }

    pub fn ready(&self) -> bool {
        matches!(*self.status.borrow(), RuntimeStatus::Ready)
    }

    pub fn last_error(&self) -> Option<String> {
        match &*self.status.borrow() {
            RuntimeStatus::Failed(message) => Some(message.clone()),
            _ => None,
        }
    }

    /// Capabilities resolved when the runtime turned ready
    pub fn capabilities(&self) -> Option<Capabilities> {
        self.capabilities.get().copied()
    }

    /// Gate for every vision operation
    pub fn ensure_ready(&self) -> Result<Capabilities, LabError> {
        match self.status() {
            RuntimeStatus::Ready => self
                .capabilities()
                .ok_or_else(|| LabError::Internal("capabilities were not resolved".to_string())),
            RuntimeStatus::Loading => {
                Err(LabError::RuntimeNotReady("still loading".to_string()))
            }
            RuntimeStatus::Failed(message) => Err(LabError::RuntimeNotReady(message)),
        }
    }

    /// Wait for the one-shot readiness outcome
    pub async fn wait_ready(&self) -> Result<Capabilities, LabError> {
        let mut rx = self.status.subscribe();
        rx.wait_for(|s| *s != RuntimeStatus::Loading)
            .await
            .map_err(|e| LabError::Internal(format!("runtime status channel closed: {}", e)))?;
        self.ensure_ready()
    }
}

/// Create the process-wide runtime, or return the one already started
pub fn init_global(
    backend: Arc<dyn VisionBackend>,
    poll_interval: Duration,
    timeout: Duration,
) -> Arc<Runtime> {
    Arc::clone(GLOBAL.get_or_init(|| Runtime::start(backend, poll_interval, timeout)))
}

pub fn global() -> Option<Arc<Runtime>> {
    GLOBAL.get().cloned()
}
