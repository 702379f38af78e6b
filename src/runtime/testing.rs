//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use crate::commit::{CommitError, CommitGateway, CommitReceipt};
use crate::draft::{DraftElement, DraftTrace};
use crate::osm::OsmError;
use crate::osmose::{Issue, IssueError};
use crate::state_machine::IssueQuery;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

// ============================================================================
// Mock Issue Source
// ============================================================================

/// Issue source that returns queued search results
pub struct MockIssueSource {
    results: Mutex<VecDeque<Result<Vec<Issue>, IssueError>>>,
    details: Mutex<HashMap<String, Issue>>,
    /// Record of all searches made
    pub queries: Mutex<Vec<IssueQuery>>,
}

impl MockIssueSource {
    pub fn new() -> Self {
        Self {
            results: Mutex::new(VecDeque::new()),
            details: Mutex::new(HashMap::new()),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Queue a search result
    pub fn queue_issues(&self, issues: Vec<Issue>) {
        self.results.lock().unwrap().push_back(Ok(issues));
    }

    /// Queue a search failure
    pub fn queue_error(&self, error: IssueError) {
        self.results.lock().unwrap().push_back(Err(error));
    }

    /// Make an issue available to `get_issue`
    pub fn with_detail(self, issue: Issue) -> Self {
        self.details
            .lock()
            .unwrap()
            .insert(issue.id.clone(), issue);
        self
    }

    pub fn recorded_queries(&self) -> Vec<IssueQuery> {
        self.queries.lock().unwrap().clone()
    }
}

impl Default for MockIssueSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IssueSource for MockIssueSource {
    async fn search(&self, query: &IssueQuery) -> Result<Vec<Issue>, IssueError> {
        self.queries.lock().unwrap().push(query.clone());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(IssueError::NoResults))
    }

    async fn get_issue(&self, issue_id: &str) -> Result<Issue, IssueError> {
        self.details
            .lock()
            .unwrap()
            .get(issue_id)
            .cloned()
            .ok_or_else(|| IssueError::NotFound(issue_id.to_string()))
    }
}

// ============================================================================
// Mock Commit Gateway
// ============================================================================

/// Gateway that returns queued outcomes and records every draft it sees
pub struct MockCommitGateway {
    responses: Mutex<VecDeque<Result<CommitReceipt, CommitError>>>,
    pub elements: Mutex<Vec<DraftElement>>,
    pub traces: Mutex<Vec<DraftTrace>>,
}

impl MockCommitGateway {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            elements: Mutex::new(Vec::new()),
            traces: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_receipt(&self, receipt: CommitReceipt) {
        self.responses.lock().unwrap().push_back(Ok(receipt));
    }

    pub fn queue_error(&self, error: CommitError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_elements(&self) -> Vec<DraftElement> {
        self.elements.lock().unwrap().clone()
    }

    pub fn recorded_traces(&self) -> Vec<DraftTrace> {
        self.traces.lock().unwrap().clone()
    }

    fn next_response(&self) -> Result<CommitReceipt, CommitError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(OsmError::network("No mock response queued").into()))
    }
}

impl Default for MockCommitGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommitGateway for MockCommitGateway {
    async fn create_element(&self, draft: &DraftElement) -> Result<CommitReceipt, CommitError> {
        self.elements.lock().unwrap().push(draft.clone());
        self.next_response()
    }

    async fn upload_trace(&self, draft: &DraftTrace) -> Result<CommitReceipt, CommitError> {
        self.traces.lock().unwrap().push(draft.clone());
        self.next_response()
    }
}

// ============================================================================
// Delayed Mock Commit Gateway (for in-flight testing)
// ============================================================================

use std::time::Duration;
use tokio::sync::Notify;

/// Gateway that holds every commit for a fixed delay
pub struct DelayedMockCommitGateway {
    inner: MockCommitGateway,
    delay: Duration,
    /// Notified when a commit starts (for test synchronization)
    pub commit_started: Arc<Notify>,
}

impl DelayedMockCommitGateway {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MockCommitGateway::new(),
            delay,
            commit_started: Arc::new(Notify::new()),
        }
    }

    pub fn queue_receipt(&self, receipt: CommitReceipt) {
        self.inner.queue_receipt(receipt);
    }
}

#[async_trait]
impl CommitGateway for DelayedMockCommitGateway {
    async fn create_element(&self, draft: &DraftElement) -> Result<CommitReceipt, CommitError> {
        self.commit_started.notify_one();
        tokio::time::sleep(self.delay).await;
        self.inner.create_element(draft).await
    }

    async fn upload_trace(&self, draft: &DraftTrace) -> Result<CommitReceipt, CommitError> {
        self.commit_started.notify_one();
        tokio::time::sleep(self.delay).await;
        self.inner.upload_trace(draft).await
    }
}

// ============================================================================
// Test Runtime Builder
// ============================================================================

use crate::runtime::{SessionRuntime, SseEvent};
use crate::state_machine::{EditState, Event, RenderRequest, SessionContext};
use tokio::sync::{broadcast, mpsc};

/// Helper for building test runtimes with minimal boilerplate
pub struct TestRuntime<I: IssueSource + 'static, C: CommitGateway + 'static> {
    pub event_tx: mpsc::Sender<Event>,
    pub broadcast_rx: broadcast::Receiver<SseEvent>,
    pub issues: Arc<I>,
    pub gateway: Arc<C>,
    _runtime_handle: tokio::task::JoinHandle<()>,
}

impl TestRuntime<MockIssueSource, MockCommitGateway> {
    /// Create a simple test runtime with instant mocks
    pub fn new() -> TestRuntimeBuilder<MockIssueSource, MockCommitGateway> {
        TestRuntimeBuilder::new()
    }
}

pub struct TestRuntimeBuilder<I, C> {
    user_id: String,
    page_size: usize,
    issues: I,
    gateway: C,
}

impl TestRuntimeBuilder<MockIssueSource, MockCommitGateway> {
    pub fn new() -> Self {
        Self {
            user_id: "test-user".to_string(),
            page_size: 10,
            issues: MockIssueSource::new(),
            gateway: MockCommitGateway::new(),
        }
    }
}

impl Default for TestRuntimeBuilder<MockIssueSource, MockCommitGateway> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: IssueSource + 'static, C: CommitGateway + 'static> TestRuntimeBuilder<I, C> {
    pub fn issues<I2: IssueSource + 'static>(self, issues: I2) -> TestRuntimeBuilder<I2, C> {
        TestRuntimeBuilder {
            user_id: self.user_id,
            page_size: self.page_size,
            issues,
            gateway: self.gateway,
        }
    }

    pub fn gateway<C2: CommitGateway + 'static>(self, gateway: C2) -> TestRuntimeBuilder<I, C2> {
        TestRuntimeBuilder {
            user_id: self.user_id,
            page_size: self.page_size,
            issues: self.issues,
            gateway,
        }
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn build(self) -> TestRuntime<I, C> {
        let issues = Arc::new(self.issues);
        let gateway = Arc::new(self.gateway);

        let context = SessionContext::new(&self.user_id).with_page_size(self.page_size);
        let (event_tx, event_rx) = mpsc::channel(32);
        let (broadcast_tx, broadcast_rx) = broadcast::channel(128);

        let runtime = SessionRuntime::new(
            context,
            issues.clone(),
            gateway.clone(),
            event_rx,
            event_tx.clone(),
            broadcast_tx,
            Duration::from_secs(60),
        );

        let handle = tokio::spawn(async move {
            let _ = runtime.run().await;
        });

        TestRuntime {
            event_tx,
            broadcast_rx,
            issues,
            gateway,
            _runtime_handle: handle,
        }
    }
}

impl<I: IssueSource + 'static, C: CommitGateway + 'static> TestRuntime<I, C> {
    /// Send an event to the runtime
    pub async fn send(&self, event: Event) {
        self.event_tx
            .send(event)
            .await
            .expect("Failed to send event");
    }

    /// Send a batch of events in order
    pub async fn send_all(&self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.send(event).await;
        }
    }

    /// Wait for a render whose text contains `needle`
    pub async fn wait_for_render(&mut self, needle: &str, timeout: Duration) -> Option<RenderRequest> {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.broadcast_rx.recv()).await {
                Ok(Ok(SseEvent::Render(request))) if request.text.contains(needle) => {
                    return Some(request);
                }
                _ => continue,
            }
        }
        None
    }

    /// Wait for a specific state with timeout
    pub async fn wait_for_state(&mut self, expected: EditState, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.broadcast_rx.recv()).await {
                Ok(Ok(SseEvent::StateChange { state })) if state == expected => return true,
                _ => continue,
            }
        }
        false
    }

    /// Wait for an error event and return its message
    pub async fn wait_for_error(&mut self, timeout: Duration) -> Option<String> {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.broadcast_rx.recv()).await {
                Ok(Ok(SseEvent::Error { message })) => return Some(message),
                _ => continue,
            }
        }
        None
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::{DraftKind, Visibility, DEFAULT_DESCRIPTION};
    use crate::geo::{BoundingBox, GeoPoint};
    use crate::runtime::{RuntimeManager, RuntimeSettings};
    use crate::state_machine::transition::{ACTION_PROMPT, FAREWELL, NO_RESULTS, SEARCH_UNAVAILABLE};
    use crate::state_machine::Command;

    const WAIT: Duration = Duration::from_secs(2);

    fn location() -> Event {
        Event::Location {
            point: GeoPoint::new(52.5134, 13.4374),
        }
    }

    fn issue(n: usize) -> Issue {
        Issue {
            id: format!("issue-{n}"),
            location: GeoPoint::new(52.5, 13.4),
            title: format!("problem {n}"),
            subtitle: String::new(),
            elements: Vec::new(),
            bbox: BoundingBox::default(),
        }
    }

    /// Events that leave a node draft with one tag, ready to save
    fn bench_draft() -> Vec<Event> {
        vec![
            location(),
            Event::button("poi"),
            Event::text("amenity"),
            Event::text("bench"),
        ]
    }

    #[tokio::test]
    async fn test_mock_issue_source() {
        let source = MockIssueSource::new().with_detail(issue(3));
        source.queue_issues(vec![issue(1)]);

        let query = IssueQuery::ByUser {
            username: "mapper".to_string(),
        };
        assert_eq!(source.search(&query).await.unwrap().len(), 1);
        assert_eq!(source.search(&query).await, Err(IssueError::NoResults));
        assert_eq!(source.get_issue("issue-3").await.unwrap().title, "problem 3");
        assert!(matches!(
            source.get_issue("missing").await,
            Err(IssueError::NotFound(_))
        ));
        assert_eq!(source.recorded_queries().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_commit_gateway() {
        let gateway = MockCommitGateway::new();
        gateway.queue_receipt(CommitReceipt::Node(5));

        let mut draft = DraftElement::node(GeoPoint::new(1.0, 2.0));
        draft.set_tag("shop", "bakery");
        assert_eq!(
            gateway.create_element(&draft).await.unwrap(),
            CommitReceipt::Node(5)
        );
        assert!(gateway.create_element(&draft).await.is_err());
        assert_eq!(gateway.recorded_elements().len(), 2);
    }

    /// Integration test: upload a trace with every optional step skipped
    #[tokio::test]
    async fn test_gpx_upload() {
        let mut rt = TestRuntime::new().build();
        rt.gateway.queue_receipt(CommitReceipt::Trace(77));

        rt.send_all([
            Event::Document {
                file_name: "upload.gpx".to_string(),
                data: b"<gpx/>".to_vec(),
            },
            Event::text("trail.gpx"),
            Event::Command(Command::Skip),
            Event::Command(Command::Skip),
            Event::button("save"),
        ])
        .await;

        assert!(rt.wait_for_render("uploaded track: 77", WAIT).await.is_some());

        let traces = rt.gateway.recorded_traces();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].data, b"<gpx/>".to_vec());
        assert_eq!(traces[0].upload_name(), "trail.gpx");
        assert_eq!(traces[0].description, DEFAULT_DESCRIPTION);
        assert!(traces[0].tags.is_empty());
        assert_eq!(traces[0].visibility, Visibility::Trackable);
    }

    /// Integration test: a failed save keeps the draft for another attempt
    #[tokio::test]
    async fn test_commit_failure_keeps_draft() {
        let mut rt = TestRuntime::new().build();
        rt.gateway
            .queue_error(OsmError::network("connection reset").into());
        rt.gateway.queue_receipt(CommitReceipt::Node(42));

        rt.send_all(bench_draft()).await;
        rt.send(Event::Command(Command::Save)).await;
        assert!(rt.wait_for_render("saving failed", WAIT).await.is_some());

        rt.send(Event::Command(Command::Save)).await;
        assert!(rt.wait_for_render("created node: 42", WAIT).await.is_some());
        assert!(rt.wait_for_state(EditState::Terminated, WAIT).await);

        let elements = rt.gateway.recorded_elements();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0], elements[1]);
        assert_eq!(elements[1].tags.get("amenity").map(String::as_str), Some("bench"));
        assert!(matches!(elements[1].kind, DraftKind::Node { .. }));
    }

    /// Integration test: edits while saving are refused with an error event
    #[tokio::test]
    async fn test_edit_rejected_while_saving() {
        let gateway = DelayedMockCommitGateway::new(Duration::from_millis(300));
        gateway.queue_receipt(CommitReceipt::Node(9));
        let started = gateway.commit_started.clone();

        let mut rt = TestRuntime::new().gateway(gateway).build();
        rt.send_all(bench_draft()).await;
        rt.send(Event::button("save")).await;

        tokio::time::timeout(WAIT, started.notified())
            .await
            .expect("commit should start");
        rt.send(Event::text("name")).await;

        assert_eq!(
            rt.wait_for_error(WAIT).await.as_deref(),
            Some("Still saving, please wait")
        );
        assert!(rt.wait_for_render("created node: 9", WAIT).await.is_some());
    }

    /// Integration test: cancel during a save ends the session; the late
    /// receipt is still shown
    #[tokio::test]
    async fn test_cancel_during_commit() {
        let gateway = DelayedMockCommitGateway::new(Duration::from_millis(200));
        gateway.queue_receipt(CommitReceipt::Node(11));

        let mut rt = TestRuntime::new().gateway(gateway).build();
        rt.send_all(bench_draft()).await;
        rt.send(Event::button("save")).await;
        rt.send(Event::button("cancel")).await;

        assert!(rt.wait_for_render(FAREWELL, WAIT).await.is_some());
        assert!(rt.wait_for_render("created node: 11", WAIT).await.is_some());
    }

    /// Integration test: nearby search, paging and detail selection
    #[tokio::test]
    async fn test_issue_search_paging() {
        let source = MockIssueSource::new().with_detail(issue(11));
        source.queue_issues((1..=12).map(issue).collect());

        let mut rt = TestRuntime::new().issues(source).page_size(10).build();
        rt.send_all([location(), Event::button("issues")]).await;

        let first = rt
            .wait_for_render("found 12 issues", WAIT)
            .await
            .expect("first window");
        assert!(first.text.contains("problem 10"));
        assert!(!first.text.contains("problem 11"));
        assert_eq!(first.keyboard.last().unwrap().len(), 2);

        rt.send(Event::button("next")).await;
        let second = rt
            .wait_for_render("found 12 issues", WAIT)
            .await
            .expect("second window");
        assert!(second.text.contains("1. \"problem 11\""));
        assert!(second.text.contains("2. \"problem 12\""));

        rt.send(Event::button("1")).await;
        let detail = rt.wait_for_render("problem 11", WAIT).await.expect("detail");
        assert!(detail.text.contains("osmose.openstreetmap.fr/en/error/issue-11"));

        match &rt.issues.recorded_queries()[..] {
            [IssueQuery::ByLocation { bbox }] => {
                assert!(bbox.min_lat < 52.5134 && 52.5134 < bbox.max_lat);
            }
            other => panic!("expected one location query, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_user_search_without_results() {
        let mut rt = TestRuntime::new().build();
        rt.send(Event::from_message("/user nobody")).await;

        assert!(rt.wait_for_render(NO_RESULTS, WAIT).await.is_some());
        assert_eq!(
            rt.issues.recorded_queries(),
            vec![IssueQuery::ByUser {
                username: "nobody".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_search_unavailable() {
        let source = MockIssueSource::new();
        source.queue_error(IssueError::Unavailable("HTTP 503".to_string()));

        let mut rt = TestRuntime::new().issues(source).build();
        rt.send(Event::from_message("/user mapper")).await;
        assert!(rt.wait_for_render(SEARCH_UNAVAILABLE, WAIT).await.is_some());
    }

    fn manager(
        idle: Duration,
    ) -> RuntimeManager<Arc<MockIssueSource>, Arc<MockCommitGateway>> {
        RuntimeManager::new(
            Arc::new(MockIssueSource::new()),
            Arc::new(MockCommitGateway::new()),
            RuntimeSettings {
                page_size: 10,
                search_radius_m: 500.0,
                idle_timeout: idle,
            },
        )
    }

    async fn next_render(rx: &mut broadcast::Receiver<SseEvent>) -> Option<RenderRequest> {
        let deadline = tokio::time::Instant::now() + WAIT;
        while tokio::time::Instant::now() < deadline {
            if let Ok(Ok(SseEvent::Render(request))) =
                tokio::time::timeout(Duration::from_millis(50), rx.recv()).await
            {
                return Some(request);
            }
        }
        None
    }

    /// Integration test: an idle session is dropped and the next event
    /// starts from scratch on the same stream
    #[tokio::test]
    async fn test_idle_session_expires() {
        let manager = manager(Duration::from_millis(100));

        let mut rx = manager.subscribe("alice").await;
        manager.send_event("alice", location()).await.unwrap();
        assert_eq!(next_render(&mut rx).await.unwrap().text, ACTION_PROMPT);
        assert_eq!(manager.active_sessions().await, 1);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(manager.active_sessions().await, 0);

        // A button from the old menu no longer means anything
        manager.send_event("alice", Event::button("poi")).await.unwrap();
        manager.send_event("alice", location()).await.unwrap();
        assert_eq!(next_render(&mut rx).await.unwrap().text, ACTION_PROMPT);
        assert_eq!(manager.active_sessions().await, 1);
    }

    /// Integration test: a stream opened before any session, kept open
    /// across two expiries, sees every session's output
    #[tokio::test]
    async fn test_stream_survives_session_expiry() {
        let manager = manager(Duration::from_millis(100));

        let mut rx = manager.subscribe("alice").await;
        assert_eq!(manager.active_sessions().await, 0);

        for _ in 0..2 {
            manager.send_event("alice", location()).await.unwrap();
            assert_eq!(next_render(&mut rx).await.unwrap().text, ACTION_PROMPT);

            tokio::time::sleep(Duration::from_millis(400)).await;
            assert_eq!(manager.active_sessions().await, 0);
            assert!(!matches!(
                rx.try_recv(),
                Err(broadcast::error::TryRecvError::Closed)
            ));
        }
    }

    /// Integration test: sessions of different users do not share drafts
    #[tokio::test]
    async fn test_users_are_independent() {
        let manager = manager(Duration::from_secs(60));

        let mut alice = manager.subscribe("alice").await;
        let mut bob = manager.subscribe("bob").await;

        for event in bench_draft() {
            manager.send_event("alice", event).await.unwrap();
        }
        manager
            .send_event("bob", Event::Command(Command::Done))
            .await
            .unwrap();
        manager.send_event("bob", location()).await.unwrap();

        // /done in Idle is ignored, so bob's first render is the menu
        assert_eq!(next_render(&mut bob).await.unwrap().text, ACTION_PROMPT);

        let mut tagged = false;
        while let Some(request) = next_render(&mut alice).await {
            if request.text.contains("amenity: bench") {
                tagged = true;
                break;
            }
        }
        assert!(tagged);
        assert_eq!(manager.active_sessions().await, 2);
    }
}
