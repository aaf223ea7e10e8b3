//! Core identifiers and enums shared by both channels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ProtoError;

/// Correlates one submitted command with the result delivered on its session.
///
/// Generated once per client invocation and sent verbatim on both the
/// session handshake and the submission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationToken(Uuid);

impl CorrelationToken {
    /// Create a new random token.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a token from its string form.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid UUID.
    pub fn parse(s: &str) -> Result<Self, ProtoError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| ProtoError::Validation(format!("invalid correlation token: {e}")))
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CorrelationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for CorrelationToken {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resource kinds the backend manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Deployments.
    Deployments,
    /// Pods.
    Pods,
    /// Services.
    Services,
    /// Namespaces. Cluster-scoped, never carries a namespace.
    Namespaces,
}

impl ResourceKind {
    /// Path segment used on the submission channel.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deployments => "deployments",
            Self::Pods => "pods",
            Self::Services => "services",
            Self::Namespaces => "namespaces",
        }
    }

    /// Whether resources of this kind live inside a namespace.
    #[must_use]
    pub const fn is_namespaced(self) -> bool {
        !matches!(self, Self::Namespaces)
    }

    /// Derive the kind from a resource document's `kind` field.
    ///
    /// `"Deployment"` becomes `deployments`, `"Namespace"` becomes `namespaces`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pluralised kind is not one the backend manages.
    pub fn from_document_kind(kind: &str) -> Result<Self, ProtoError> {
        let plural = format!("{}s", kind.to_lowercase());
        plural.parse()
    }
}

impl FromStr for ResourceKind {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deploy" | "deployment" | "deployments" => Ok(Self::Deployments),
            "po" | "pod" | "pods" => Ok(Self::Pods),
            "svc" | "service" | "services" => Ok(Self::Services),
            "ns" | "namespace" | "namespaces" => Ok(Self::Namespaces),
            _ => Err(ProtoError::UnknownKind(s.to_string())),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    /// Start a deployment from a template.
    Run,
    /// Create a resource from a document.
    Create,
    /// Read one resource or a list.
    Get,
    /// Delete a resource.
    Delete,
    /// Replace a resource with a new document.
    Replace,
    /// Expose a deployment through a service.
    Expose,
}

impl Verb {
    /// Lowercase verb name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Create => "create",
            Self::Get => "get",
            Self::Delete => "delete",
            Self::Replace => "replace",
            Self::Expose => "expose",
        }
    }

    /// Whether the verb changes backend state.
    #[must_use]
    pub const fn is_mutating(self) -> bool {
        !matches!(self, Self::Get)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
