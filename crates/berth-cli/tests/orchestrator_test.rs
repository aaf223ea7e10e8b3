//! Orchestrator sequencing with scripted channels.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use berth_cli::orchestrator::{CommandRequest, Orchestrator};
use berth_cli::session::{Connector, Session};
use berth_cli::submit::Submitter;
use berth_cli::CliError;
use berth_proto::{
    Command, CorrelationToken, OperationResult, ResourceKind, ResultStatus, SubmissionAck, Verb,
};
use serde_json::json;

// ==================== Helper ====================

#[derive(Default)]
struct Calls {
    connects: AtomicUsize,
    submits: AtomicUsize,
    receives: AtomicUsize,
    closes: AtomicUsize,
    connected_with: Mutex<Option<CorrelationToken>>,
    submitted: Mutex<Option<Command>>,
}

impl Calls {
    fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
enum Receive {
    Result(OperationResult),
    Dropped,
    TimedOut,
}

struct ScriptedConnector {
    calls: Arc<Calls>,
    refuse: bool,
    receive: Receive,
}

struct ScriptedSession {
    calls: Arc<Calls>,
    receive: Receive,
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Session = ScriptedSession;

    async fn connect(&self, token: CorrelationToken) -> Result<ScriptedSession, CliError> {
        self.calls.connects.fetch_add(1, Ordering::SeqCst);
        *self.calls.connected_with.lock().unwrap() = Some(token);
        if self.refuse {
            return Err(CliError::Connection("connection refused".into()));
        }
        Ok(ScriptedSession {
            calls: Arc::clone(&self.calls),
            receive: self.receive.clone(),
        })
    }
}

#[async_trait]
impl Session for ScriptedSession {
    async fn receive(&mut self) -> Result<OperationResult, CliError> {
        self.calls.receives.fetch_add(1, Ordering::SeqCst);
        match &self.receive {
            Receive::Result(result) => Ok(result.clone()),
            Receive::Dropped => Err(CliError::Transport("session closed before a result".into())),
            Receive::TimedOut => Err(CliError::Timeout("waiting for the result".into())),
        }
    }

    async fn close(&mut self) {
        self.calls.closes.fetch_add(1, Ordering::SeqCst);
    }
}

enum Ack {
    /// Echo the command's own token.
    Accept,
    Reject(&'static str),
    Fail(fn() -> CliError),
}

struct ScriptedSubmitter {
    calls: Arc<Calls>,
    ack: Ack,
}

#[async_trait]
impl Submitter for ScriptedSubmitter {
    async fn submit(&self, command: &Command) -> Result<SubmissionAck, CliError> {
        self.calls.submits.fetch_add(1, Ordering::SeqCst);
        *self.calls.submitted.lock().unwrap() = Some(command.clone());
        match &self.ack {
            Ack::Accept => Ok(SubmissionAck::accepted(command.token())),
            Ack::Reject(reason) => Ok(SubmissionAck::rejected(*reason)),
            Ack::Fail(err) => Err(err()),
        }
    }
}

fn harness(
    refuse: bool,
    ack: Ack,
    receive: Receive,
) -> (Orchestrator<ScriptedConnector, ScriptedSubmitter>, Arc<Calls>) {
    let calls = Arc::new(Calls::default());
    let orch = Orchestrator::new(
        ScriptedConnector {
            calls: Arc::clone(&calls),
            refuse,
            receive,
        },
        ScriptedSubmitter {
            calls: Arc::clone(&calls),
            ack,
        },
        CorrelationToken::new(),
        "default",
    );
    (orch, calls)
}

fn get_pod(name: &str) -> CommandRequest {
    let mut request = CommandRequest::new(Verb::Get, ResourceKind::Pods);
    request.name = Some(name.into());
    request
}

fn success(data: serde_json::Value) -> Receive {
    Receive::Result(OperationResult {
        status: ResultStatus::Success,
        message: None,
        data,
    })
}

// ==================== Success ====================

#[tokio::test]
async fn test_get_pod_returns_backend_data() {
    let pod = json!({ "metadata": { "name": "myapp" } });
    let (orch, calls) = harness(false, Ack::Accept, success(pod.clone()));
    let token = orch.token();

    let result = orch.go(get_pod("myapp")).await.expect("success");
    assert_eq!(result.data, pod);

    assert_eq!(Calls::count(&calls.connects), 1);
    assert_eq!(Calls::count(&calls.submits), 1);
    assert_eq!(Calls::count(&calls.receives), 1);
    assert_eq!(Calls::count(&calls.closes), 1);

    let submitted = calls.submitted.lock().unwrap().clone().expect("command");
    assert_eq!(submitted.token(), token);
    assert_eq!(*calls.connected_with.lock().unwrap(), Some(token));
    assert_eq!(submitted.namespace(), Some("default"));
    assert_eq!(submitted.name(), Some("myapp"));
}

#[tokio::test]
async fn test_explicit_namespace_overrides_default() {
    let (orch, calls) = harness(false, Ack::Accept, success(json!([])));
    let mut request = CommandRequest::new(Verb::Get, ResourceKind::Services);
    request.namespace = Some("team-a".into());

    orch.go(request).await.expect("success");
    let submitted = calls.submitted.lock().unwrap().clone().expect("command");
    assert_eq!(submitted.namespace(), Some("team-a"));
}

// ==================== Failure Paths ====================

#[tokio::test]
async fn test_connection_failure_submits_nothing() {
    let (orch, calls) = harness(true, Ack::Accept, success(json!(null)));

    let err = orch.go(get_pod("myapp")).await.expect_err("refused");
    assert!(matches!(err, CliError::Connection(_)));
    assert_eq!(Calls::count(&calls.submits), 0);
    assert_eq!(Calls::count(&calls.receives), 0);
    assert_eq!(Calls::count(&calls.closes), 0);
}

#[tokio::test]
async fn test_rejection_never_waits_for_result() {
    let (orch, calls) = harness(false, Ack::Reject("invalid kind"), success(json!(null)));
    let mut request = CommandRequest::new(Verb::Create, ResourceKind::Deployments);
    request.payload = Some(json!({ "kind": "Deployment" }));

    let err = orch.go(request).await.expect_err("rejected");
    assert!(matches!(&err, CliError::SubmissionRejected(reason) if reason == "invalid kind"));
    assert!(!err.is_indeterminate());
    assert_eq!(Calls::count(&calls.receives), 0);
    assert_eq!(Calls::count(&calls.closes), 1);
}

#[tokio::test]
async fn test_invalid_request_closes_session() {
    let (orch, calls) = harness(false, Ack::Accept, success(json!(null)));

    let err = orch
        .go(CommandRequest::new(Verb::Delete, ResourceKind::Pods))
        .await
        .expect_err("delete without name");
    assert!(matches!(err, CliError::InvalidArgument(_)));
    assert_eq!(Calls::count(&calls.submits), 0);
    assert_eq!(Calls::count(&calls.closes), 1);
}

#[tokio::test]
async fn test_path_like_name_is_never_submitted() {
    let (orch, calls) = harness(false, Ack::Accept, success(json!(null)));
    let mut request = CommandRequest::new(Verb::Delete, ResourceKind::Pods);
    request.name = Some("../../namespaces/prod".into());

    let err = orch.go(request).await.expect_err("unsafe name");
    assert!(matches!(err, CliError::InvalidArgument(_)));
    assert_eq!(Calls::count(&calls.submits), 0);
    assert_eq!(Calls::count(&calls.closes), 1);
}

#[tokio::test]
async fn test_submit_error_closes_session() {
    let (orch, calls) = harness(
        false,
        Ack::Fail(|| CliError::Transport("connection reset".into())),
        success(json!(null)),
    );

    let err = orch.go(get_pod("myapp")).await.expect_err("submit failed");
    assert!(matches!(err, CliError::Transport(_)));
    assert_eq!(Calls::count(&calls.receives), 0);
    assert_eq!(Calls::count(&calls.closes), 1);
}

#[tokio::test]
async fn test_drop_after_ack_is_indeterminate() {
    let (orch, calls) = harness(false, Ack::Accept, Receive::Dropped);

    let err = orch.go(get_pod("myapp")).await.expect_err("dropped");
    assert!(matches!(err, CliError::Transport(_)));
    assert!(err.is_indeterminate());
    assert_eq!(Calls::count(&calls.closes), 1);
}

#[tokio::test]
async fn test_receive_timeout_is_distinct() {
    let (orch, calls) = harness(false, Ack::Accept, Receive::TimedOut);

    let err = orch.go(get_pod("myapp")).await.expect_err("timed out");
    assert!(matches!(err, CliError::Timeout(_)));
    assert_eq!(err.exit_code(), 6);
    assert_eq!(Calls::count(&calls.closes), 1);
}

#[tokio::test]
async fn test_backend_failure_surfaces_message() {
    let failure = Receive::Result(OperationResult {
        status: ResultStatus::Failure,
        message: Some("pods \"myapp\" not found".into()),
        data: json!(null),
    });
    let (orch, calls) = harness(false, Ack::Accept, failure);

    let err = orch.go(get_pod("myapp")).await.expect_err("failure");
    assert!(matches!(&err, CliError::OperationFailure(msg) if msg.contains("not found")));
    assert_eq!(Calls::count(&calls.closes), 1);
}

#[tokio::test]
async fn test_failure_without_message_still_fails() {
    let failure = Receive::Result(OperationResult {
        status: ResultStatus::Failure,
        message: None,
        data: json!(null),
    });
    let (orch, _calls) = harness(false, Ack::Accept, failure);

    let err = orch.go(get_pod("myapp")).await.expect_err("failure");
    assert!(matches!(err, CliError::OperationFailure(_)));
}
