//! Submission channel messages.
//!
//! A [`Command`] is sent once per invocation; the backend answers right away
//! with a [`SubmissionAck`]. The ack only says whether the command was
//! accepted. The operation's outcome arrives later on the session channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtoError;
use crate::types::{CorrelationToken, ResourceKind, Verb};

/// One command to submit to the backend.
///
/// Immutable once built: fields are only reachable through accessors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    kind: ResourceKind,
    verb: Verb,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
    token: CorrelationToken,
}

impl Command {
    /// Start building a command.
    #[must_use]
    pub fn new(verb: Verb, kind: ResourceKind, token: CorrelationToken) -> Self {
        Self {
            kind,
            verb,
            name: None,
            payload: None,
            namespace: None,
            token,
        }
    }

    /// Target a named resource.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach a resource document.
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Scope the command to a namespace.
    ///
    /// Ignored for [`ResourceKind::Namespaces`], which are cluster-scoped.
    #[must_use]
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        if self.kind.is_namespaced() {
            self.namespace = Some(namespace.into());
        }
        self
    }

    /// Resource kind.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Requested verb.
    #[must_use]
    pub const fn verb(&self) -> Verb {
        self.verb
    }

    /// Target resource name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Resource document, if any.
    #[must_use]
    pub const fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    /// Target namespace. Always `None` for cluster-scoped kinds.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Correlation token shared with the session channel.
    #[must_use]
    pub const fn token(&self) -> CorrelationToken {
        self.token
    }

    /// Check that the verb, kind and arguments fit together.
    ///
    /// # Errors
    ///
    /// Returns [`ProtoError::Validation`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ProtoError> {
        match self.verb {
            Verb::Run if self.kind != ResourceKind::Deployments => {
                return Err(ProtoError::Validation(format!(
                    "run only creates deployments, not {}",
                    self.kind
                )));
            }
            Verb::Expose if self.kind != ResourceKind::Services => {
                return Err(ProtoError::Validation(format!(
                    "expose only creates services, not {}",
                    self.kind
                )));
            }
            _ => {}
        }

        let needs_payload = matches!(
            self.verb,
            Verb::Run | Verb::Create | Verb::Replace | Verb::Expose
        );
        if needs_payload && self.payload.is_none() {
            return Err(ProtoError::Validation(format!(
                "{} requires a resource document",
                self.verb
            )));
        }

        let needs_name = matches!(self.verb, Verb::Delete | Verb::Replace);
        if needs_name && self.name.as_deref().is_none_or(str::is_empty) {
            return Err(ProtoError::Validation(format!(
                "{} requires a resource name",
                self.verb
            )));
        }

        if self.kind.is_namespaced() && self.namespace.as_deref().is_none_or(str::is_empty) {
            return Err(ProtoError::Validation(format!(
                "{} {} requires a namespace",
                self.verb, self.kind
            )));
        }

        if let Some(name) = &self.name {
            check_identifier("name", name)?;
        }
        if let Some(namespace) = &self.namespace {
            check_identifier("namespace", namespace)?;
        }

        Ok(())
    }
}

/// Names and namespaces become single URL path segments.
fn check_identifier(what: &str, value: &str) -> Result<(), ProtoError> {
    if value.is_empty() || value == "." || value == ".." {
        return Err(ProtoError::Validation(format!("{what} {value:?} is not allowed")));
    }
    if let Some(c) = value
        .chars()
        .find(|c| matches!(c, '/' | '?' | '#' | '%') || c.is_control() || c.is_whitespace())
    {
        return Err(ProtoError::Validation(format!(
            "{what} {value:?} contains forbidden character {c:?}"
        )));
    }
    Ok(())
}

/// Immediate answer to a submission: `{"id": ...}` or `{"error": ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionAck {
    /// Token echoed back by the backend on acceptance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Rejection reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// How the orchestrator should treat an ack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckVerdict {
    /// Accepted for this token; the result will arrive on the session.
    Accepted,
    /// Rejected; no result will follow.
    Rejected(String),
}

impl SubmissionAck {
    /// Ack accepting the command correlated by `token`.
    #[must_use]
    pub fn accepted(token: CorrelationToken) -> Self {
        Self {
            id: Some(token.to_string()),
            error: None,
        }
    }

    /// Ack rejecting the command.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            id: None,
            error: Some(reason.into()),
        }
    }

    /// Interpret the ack for the command correlated by `token`.
    ///
    /// An `error` always wins. An `id` only counts when it matches the token
    /// byte for byte; anything else is a rejection.
    #[must_use]
    pub fn verdict(&self, token: CorrelationToken) -> AckVerdict {
        match (&self.error, &self.id) {
            (Some(error), _) => AckVerdict::Rejected(error.clone()),
            (None, Some(id)) if *id == token.to_string() => AckVerdict::Accepted,
            (None, Some(id)) => AckVerdict::Rejected(format!(
                "acknowledged id {id} does not match session {token}"
            )),
            (None, None) => AckVerdict::Rejected("ack carried neither id nor error".into()),
        }
    }
}
