//! Per-user session actor

use super::traits::IssueSource;
use super::SseEvent;

use crate::commit::{CommitError, CommitGateway, CommitReceipt};
use crate::state_machine::{
    transition, EditSession, Effect, Event, IssueQuery, SessionContext, TransitionError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

/// Single-writer owner of one user's [`EditSession`].
///
/// Events are processed one at a time. Network work runs in spawned tasks
/// that report back through `event_tx`, so the session is never held across
/// a network call.
pub struct SessionRuntime<I, C>
where
    I: IssueSource + 'static,
    C: CommitGateway + 'static,
{
    context: SessionContext,
    session: EditSession,
    issues: Arc<I>,
    gateway: Arc<C>,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<SseEvent>,
    idle_timeout: Duration,
    /// Background tasks whose result event has not arrived yet
    in_flight: usize,
}

impl<I, C> SessionRuntime<I, C>
where
    I: IssueSource + 'static,
    C: CommitGateway + 'static,
{
    pub fn new(
        context: SessionContext,
        issues: Arc<I>,
        gateway: Arc<C>,
        event_rx: mpsc::Receiver<Event>,
        event_tx: mpsc::Sender<Event>,
        broadcast_tx: broadcast::Sender<SseEvent>,
        idle_timeout: Duration,
    ) -> Self {
        let session = EditSession::new(context.user_id.clone());
        Self {
            context,
            session,
            issues,
            gateway,
            event_rx,
            event_tx,
            broadcast_tx,
            idle_timeout,
            in_flight: 0,
        }
    }

    /// Process events until the session expires.
    ///
    /// Returns events that were queued after the expiry was decided; the
    /// caller hands them to the next session.
    pub async fn run(mut self) -> Vec<Event> {
        tracing::info!(user_id = %self.context.user_id, "Starting session runtime");

        loop {
            match tokio::time::timeout(self.idle_timeout, self.event_rx.recv()).await {
                Ok(Some(event)) => self.process_event(event),
                Ok(None) => break,
                // Never expire while a search or commit is still out
                Err(_) if self.in_flight > 0 => continue,
                Err(_) => {
                    tracing::info!(
                        user_id = %self.context.user_id,
                        state = %self.session.state,
                        "Session expired"
                    );
                    break;
                }
            }
        }

        let leftover = close_and_drain(&mut self.event_rx);
        tracing::info!(
            user_id = %self.context.user_id,
            leftover = leftover.len(),
            "Session runtime stopped"
        );
        leftover
    }

    fn process_event(&mut self, event: Event) {
        if !event.is_inbound() {
            self.in_flight = self.in_flight.saturating_sub(1);
        }
        let kind = event.kind();

        let result = match transition(&self.session, &self.context, event) {
            Ok(r) => r,
            Err(TransitionError::ProtocolMismatch { state, event }) => {
                tracing::debug!(
                    user_id = %self.context.user_id,
                    state = %state,
                    kind = event,
                    "Ignoring event"
                );
                return;
            }
            Err(e @ TransitionError::CommitInFlight) => {
                let _ = self.broadcast_tx.send(SseEvent::Error {
                    message: e.to_string(),
                });
                return;
            }
        };

        let old_state = self.session.state;
        self.session = result.new_session;

        for effect in result.effects {
            self.execute_effect(effect);
        }

        if self.session.state != old_state {
            tracing::debug!(
                user_id = %self.context.user_id,
                from = %old_state,
                to = %self.session.state,
                kind,
                "State changed"
            );
            self.notify_state();
        }

        if self.session.state.is_terminal() {
            tracing::info!(user_id = %self.context.user_id, "Edit session finished");
            self.session = self.session.restart();
            self.notify_state();
        }
    }

    fn notify_state(&self) {
        let _ = self.broadcast_tx.send(SseEvent::StateChange {
            state: self.session.state,
        });
    }

    /// Execute an effect; network effects are spawned as background tasks
    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Render(request) => {
                let _ = self.broadcast_tx.send(SseEvent::Render(request));
            }

            Effect::SearchIssues { query } => {
                let issues = self.issues.clone();
                self.spawn_task(async move {
                    match issues.search(&query).await {
                        Ok(issues) => Event::IssuesLoaded { issues },
                        Err(error) => {
                            log_search_failure(&query, &error);
                            Event::SearchFailed { error }
                        }
                    }
                });
            }

            Effect::FetchIssue { issue_id } => {
                let issues = self.issues.clone();
                self.spawn_task(async move {
                    match issues.get_issue(&issue_id).await {
                        Ok(issue) => Event::IssueLoaded { issue },
                        Err(error) => {
                            tracing::warn!(issue_id = %issue_id, error = %error, "Issue fetch failed");
                            Event::SearchFailed { error }
                        }
                    }
                });
            }

            Effect::CommitElement { commit_id, draft } => {
                let gateway = self.gateway.clone();
                let user_id = self.context.user_id.clone();
                self.spawn_task(async move {
                    let result = gateway.create_element(&draft).await;
                    commit_outcome(&user_id, commit_id, result)
                });
            }

            Effect::CommitTrace { commit_id, draft } => {
                let gateway = self.gateway.clone();
                let user_id = self.context.user_id.clone();
                self.spawn_task(async move {
                    let result = gateway.upload_trace(&draft).await;
                    commit_outcome(&user_id, commit_id, result)
                });
            }
        }
    }

    /// Run `work` in the background and feed its event back into this actor
    fn spawn_task<F>(&mut self, work: F)
    where
        F: std::future::Future<Output = Event> + Send + 'static,
    {
        self.in_flight += 1;
        let event_tx = self.event_tx.clone();
        let user_id = self.context.user_id.clone();
        tokio::spawn(async move {
            let event = work.await;
            if event_tx.send(event).await.is_err() {
                tracing::debug!(user_id = %user_id, "Session gone before background result");
            }
        });
    }
}

fn log_search_failure(query: &IssueQuery, error: &crate::osmose::IssueError) {
    if error.is_empty_result() {
        tracing::info!(query = ?query, "Issue search found nothing");
    } else {
        tracing::warn!(query = ?query, error = %error, "Issue search failed");
    }
}

fn commit_outcome(
    user_id: &str,
    commit_id: u64,
    result: Result<CommitReceipt, CommitError>,
) -> Event {
    match result {
        Ok(receipt) => Event::CommitSucceeded { commit_id, receipt },
        Err(e) => {
            tracing::warn!(
                user_id = %user_id,
                commit_id,
                retryable = e.is_retryable(),
                error = %e,
                "Commit failed"
            );
            Event::CommitFailed {
                commit_id,
                message: e.user_message(),
            }
        }
    }
}

/// Refuse further sends and collect whatever is still queued
fn close_and_drain(event_rx: &mut mpsc::Receiver<Event>) -> Vec<Event> {
    event_rx.close();
    let mut leftover = Vec::new();
    while let Ok(event) = event_rx.try_recv() {
        leftover.push(event);
    }
    leftover
}
