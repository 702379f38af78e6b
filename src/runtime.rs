//! Runtime for per-user edit sessions
//!
//! One actor task per active user, created on the first event and removed
//! again when it expires. A user's SSE channel lives in the manager, so
//! subscribers stay connected while sessions come and go.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;
pub use traits::*;

use crate::commit::{CommitGateway, OsmCommitGateway};
use crate::config::Config;
use crate::state_machine::{EditState, Event, RenderRequest, SessionContext};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, RwLock};

/// Type alias for production manager with concrete implementations
pub type ProductionManager = RuntimeManager<ServiceIssueSource, OsmCommitGateway>;

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub event_tx: mpsc::Sender<Event>,
}

/// Events sent to SSE clients
#[derive(Debug, Clone)]
pub enum SseEvent {
    /// First event on every stream
    Init { user_id: String },
    /// Message for the user
    Render(RenderRequest),
    StateChange { state: EditState },
    Error { message: String },
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Session for {0} is not accepting events")]
    SessionClosed(String),
}

/// Settings shared by every session the manager starts
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub page_size: usize,
    pub search_radius_m: f64,
    pub idle_timeout: Duration,
}

impl From<&Config> for RuntimeSettings {
    fn from(config: &Config) -> Self {
        Self {
            page_size: config.page_size,
            search_radius_m: config.search_radius_m,
            idle_timeout: config.session_idle,
        }
    }
}

/// Live actors plus the per-user SSE channels, which outlive them
#[derive(Default)]
struct Registry {
    sessions: HashMap<String, SessionHandle>,
    streams: HashMap<String, broadcast::Sender<SseEvent>>,
}

impl Registry {
    fn stream(&mut self, user_id: &str) -> broadcast::Sender<SseEvent> {
        self.streams
            .entry(user_id.to_string())
            .or_insert_with(|| broadcast::channel(128).0)
            .clone()
    }

    /// Forget a channel nobody listens on and no session writes to
    fn release_stream(&mut self, user_id: &str) {
        if self.sessions.contains_key(user_id) {
            return;
        }
        if self
            .streams
            .get(user_id)
            .is_some_and(|tx| tx.receiver_count() == 0)
        {
            self.streams.remove(user_id);
        }
    }
}

struct Shared<I, C> {
    issues: Arc<I>,
    gateway: Arc<C>,
    settings: RuntimeSettings,
    registry: RwLock<Registry>,
}

impl<I, C> Shared<I, C>
where
    I: IssueSource + 'static,
    C: CommitGateway + 'static,
{
    /// Spawn a session actor; the caller holds the registry lock
    fn start(self: &Arc<Self>, registry: &mut Registry, user_id: &str) -> SessionHandle {
        let context = SessionContext::new(user_id)
            .with_page_size(self.settings.page_size)
            .with_search_radius(self.settings.search_radius_m);

        let (event_tx, event_rx) = mpsc::channel(32);
        let runtime = SessionRuntime::new(
            context,
            self.issues.clone(),
            self.gateway.clone(),
            event_rx,
            event_tx.clone(),
            registry.stream(user_id),
            self.settings.idle_timeout,
        );

        let handle = SessionHandle { event_tx };
        registry
            .sessions
            .insert(user_id.to_string(), handle.clone());
        tracing::info!(
            user_id = %user_id,
            active = registry.sessions.len(),
            "Session started"
        );

        // Start runtime in background; it removes its own handle on exit
        let shared = Arc::clone(self);
        let own_tx = handle.event_tx.clone();
        let user = user_id.to_string();
        tokio::spawn(async move {
            let leftover = runtime.run().await;
            shared.finish(&user, &own_tx, leftover).await;
        });

        handle
    }

    async fn finish(
        self: &Arc<Self>,
        user_id: &str,
        own_tx: &mpsc::Sender<Event>,
        leftover: Vec<Event>,
    ) {
        let mut registry = self.registry.write().await;
        if registry
            .sessions
            .get(user_id)
            .is_some_and(|h| h.event_tx.same_channel(own_tx))
        {
            registry.sessions.remove(user_id);
        }
        tracing::info!(
            user_id = %user_id,
            active = registry.sessions.len(),
            "Session removed"
        );

        if leftover.is_empty() {
            registry.release_stream(user_id);
            return;
        }

        // Events that raced the expiry belong to the next session
        let handle = match registry.sessions.get(user_id) {
            Some(handle) => handle.clone(),
            None => self.start(&mut registry, user_id),
        };
        drop(registry);
        for event in leftover {
            if handle.event_tx.send(event).await.is_err() {
                tracing::warn!(user_id = %user_id, "Dropped event queued at session expiry");
            }
        }
    }
}

/// Manager for all session runtimes
pub struct RuntimeManager<I, C>
where
    I: IssueSource + 'static,
    C: CommitGateway + 'static,
{
    shared: Arc<Shared<I, C>>,
}

impl<I, C> RuntimeManager<I, C>
where
    I: IssueSource + 'static,
    C: CommitGateway + 'static,
{
    pub fn new(issues: I, gateway: C, settings: RuntimeSettings) -> Self {
        Self {
            shared: Arc::new(Shared {
                issues: Arc::new(issues),
                gateway: Arc::new(gateway),
                settings,
                registry: RwLock::new(Registry::default()),
            }),
        }
    }

    /// Get or create the runtime for a user
    pub async fn get_or_create(&self, user_id: &str) -> SessionHandle {
        // Check if already running
        {
            let registry = self.shared.registry.read().await;
            if let Some(handle) = registry.sessions.get(user_id) {
                return handle.clone();
            }
        }

        let mut registry = self.shared.registry.write().await;
        // Another request may have started it while we waited for the lock
        if let Some(handle) = registry.sessions.get(user_id) {
            return handle.clone();
        }
        self.shared.start(&mut registry, user_id)
    }

    /// Send an event to a user's session, starting one if needed
    pub async fn send_event(&self, user_id: &str, event: Event) -> Result<(), RuntimeError> {
        let handle = self.get_or_create(user_id).await;
        let Err(mpsc::error::SendError(event)) = handle.event_tx.send(event).await else {
            return Ok(());
        };

        // The actor expired between lookup and send; drop the stale handle
        // and deliver to a fresh session
        {
            let mut registry = self.shared.registry.write().await;
            if registry
                .sessions
                .get(user_id)
                .is_some_and(|h| h.event_tx.same_channel(&handle.event_tx))
            {
                registry.sessions.remove(user_id);
            }
        }
        self.get_or_create(user_id)
            .await
            .event_tx
            .send(event)
            .await
            .map_err(|_| RuntimeError::SessionClosed(user_id.to_string()))
    }

    /// Subscribe to a user's updates; the subscription survives session
    /// expiry and restarts
    pub async fn subscribe(&self, user_id: &str) -> broadcast::Receiver<SseEvent> {
        self.shared.registry.write().await.stream(user_id).subscribe()
    }

    /// Number of users with a live session
    #[cfg(test)]
    pub async fn active_sessions(&self) -> usize {
        self.shared.registry.read().await.sessions.len()
    }
}
