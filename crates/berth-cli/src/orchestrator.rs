//! Command orchestration.
//!
//! Sequences one invocation across both channels:
//!
//! ```text
//!  connect ──► build ──► submit ──► receive ──► close
//!     │          │          │          │
//!     └─ stop    └──────────┴──────────┴──► close, report
//! ```
//!
//! The session is closed exactly once on every path that opened it.

use std::time::Instant;

use berth_proto::{AckVerdict, Command, CorrelationToken, OperationResult, ResourceKind, Verb};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::CliError;
use crate::session::{Connector, Session, SessionSettings, TcpConnector};
use crate::submit::{HttpSubmitter, Submitter};

/// What the user asked for, before the correlation token is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRequest {
    /// Requested verb.
    pub verb: Verb,
    /// Resource kind.
    pub kind: ResourceKind,
    /// Target resource name.
    pub name: Option<String>,
    /// Resource document.
    pub payload: Option<Value>,
    /// Explicit namespace; the configured default applies otherwise.
    pub namespace: Option<String>,
}

impl CommandRequest {
    /// Request with no name, payload or namespace.
    #[must_use]
    pub const fn new(verb: Verb, kind: ResourceKind) -> Self {
        Self {
            verb,
            kind,
            name: None,
            payload: None,
            namespace: None,
        }
    }
}

/// Runs a single command over a session and a submitter.
///
/// Consumed by [`Orchestrator::go`], so its correlation token is used for
/// exactly one command.
#[derive(Debug)]
pub struct Orchestrator<C, S> {
    connector: C,
    submitter: S,
    token: CorrelationToken,
    default_namespace: String,
}

impl Orchestrator<TcpConnector, HttpSubmitter> {
    /// Wire the real TCP session channel and HTTP submitter.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig, token: CorrelationToken) -> Result<Self, CliError> {
        Ok(Self::new(
            TcpConnector::new(SessionSettings::from_config(config)),
            HttpSubmitter::from_config(config)?,
            token,
            config.default_namespace.clone(),
        ))
    }
}

impl<C, S> Orchestrator<C, S>
where
    C: Connector,
    S: Submitter,
{
    /// Create an orchestrator.
    pub fn new(
        connector: C,
        submitter: S,
        token: CorrelationToken,
        default_namespace: impl Into<String>,
    ) -> Self {
        Self {
            connector,
            submitter,
            token,
            default_namespace: default_namespace.into(),
        }
    }

    /// Correlation token for this invocation.
    #[must_use]
    pub const fn token(&self) -> CorrelationToken {
        self.token
    }

    /// Run `request` to completion.
    ///
    /// Returns the backend's result only when it reports success.
    ///
    /// # Errors
    ///
    /// - [`CliError::Connection`] if the session cannot be opened; nothing is
    ///   submitted
    /// - [`CliError::SubmissionRejected`] if the ack rejects the command; the
    ///   result is never awaited
    /// - [`CliError::Transport`] or [`CliError::Timeout`] if the session fails
    ///   after acceptance; the outcome is unknown
    /// - [`CliError::OperationFailure`] if the backend reports `Failure`
    pub async fn go(self, request: CommandRequest) -> Result<OperationResult, CliError> {
        let started = Instant::now();
        debug!(session = %self.token, verb = %request.verb, kind = %request.kind, "starting command");

        let mut session = self.connector.connect(self.token).await?;
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "session open");

        let outcome = self.exchange(&mut session, request).await;
        session.close().await;

        debug!(elapsed_ms = started.elapsed().as_millis() as u64, ok = outcome.is_ok(), "command finished");
        outcome
    }

    async fn exchange(
        &self,
        session: &mut C::Session,
        request: CommandRequest,
    ) -> Result<OperationResult, CliError> {
        let command = self.build(request)?;

        let ack = self.submitter.submit(&command).await?;
        match ack.verdict(self.token) {
            AckVerdict::Accepted => debug!(session = %self.token, "submission accepted"),
            AckVerdict::Rejected(reason) => {
                debug!(session = %self.token, reason = %reason, "submission rejected");
                return Err(CliError::SubmissionRejected(reason));
            }
        }

        let result = session.receive().await?;
        if result.is_success() {
            info!(verb = %command.verb(), kind = %command.kind(), "command succeeded");
            Ok(result)
        } else {
            let message = result
                .message
                .unwrap_or_else(|| "backend reported failure without a message".into());
            Err(CliError::OperationFailure(message))
        }
    }

    fn build(&self, request: CommandRequest) -> Result<Command, CliError> {
        let namespace = request
            .namespace
            .unwrap_or_else(|| self.default_namespace.clone());

        let mut command =
            Command::new(request.verb, request.kind, self.token).in_namespace(namespace);
        if let Some(name) = request.name {
            command = command.with_name(name);
        }
        if let Some(payload) = request.payload {
            command = command.with_payload(payload);
        }

        command
            .validate()
            .map_err(|e| CliError::InvalidArgument(e.to_string()))?;
        Ok(command)
    }
}
