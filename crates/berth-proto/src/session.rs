//! Session channel frames.
//!
//! # Message Flow
//!
//! ```text
//! ┌───────┐   SessionHello   ┌─────────┐
//! │ berth │─────────────────►│ backend │
//! │       │◄─────────────────│         │
//! │       │     AuthAck      │         │
//! │       │                  │         │
//! │       │◄─────────────────│         │
//! └───────┘ OperationResult  └─────────┘
//! ```
//!
//! Exactly one [`OperationResult`] is delivered per session.
//!
//! # Example
//!
//! ```rust
//! use berth_proto::session::{OperationResult, ResultStatus};
//!
//! let result = OperationResult::from_json(r#"
//!     {"status": "Failure", "message": "pods \"web\" not found"}
//! "#).unwrap();
//! assert_eq!(result.status, ResultStatus::Failure);
//! assert!(result.data.is_null());
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ProtoError;
use crate::types::CorrelationToken;

/// Protocol version for the session handshake.
pub const SESSION_PROTOCOL_VERSION: u32 = 1;

/// First frame on a session: identifies the client and its correlation token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHello {
    /// Correlation token, identical to the one sent on submission.
    pub session_id: CorrelationToken,
    /// Persisted auth token, when configured.
    pub auth_token: Option<String>,
    /// Client version.
    pub client_version: String,
    /// Protocol version.
    pub protocol_version: u32,
}

impl SessionHello {
    /// Create a hello frame for `session_id`.
    #[must_use]
    pub fn new(
        session_id: CorrelationToken,
        auth_token: Option<String>,
        client_version: impl Into<String>,
    ) -> Self {
        Self {
            session_id,
            auth_token,
            client_version: client_version.into(),
            protocol_version: SESSION_PROTOCOL_VERSION,
        }
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, ProtoError> {
        serde_json::to_string(self).map_err(|e| ProtoError::Encoding(e.to_string()))
    }

    /// Deserialize from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn from_json(json: &str) -> Result<Self, ProtoError> {
        serde_json::from_str(json).map_err(|e| ProtoError::Decoding(e.to_string()))
    }
}

/// Backend answer to [`SessionHello`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthAck {
    /// Whether the session is authenticated.
    pub ok: bool,
    /// Refusal reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuthAck {
    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, ProtoError> {
        serde_json::to_string(self).map_err(|e| ProtoError::Encoding(e.to_string()))
    }

    /// Deserialize from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a well-formed ack.
    pub fn from_json(json: &str) -> Result<Self, ProtoError> {
        serde_json::from_str(json).map_err(|e| ProtoError::Decoding(e.to_string()))
    }
}

/// Outcome reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultStatus {
    /// The operation took effect.
    Success,
    /// The backend refused or failed the operation.
    Failure,
}

/// Result of one command, delivered on the session channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    /// Outcome.
    pub status: ResultStatus,
    /// Human-readable detail, usually present on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Resource data returned by the backend.
    #[serde(default, alias = "results")]
    pub data: Value,
}

impl OperationResult {
    /// Successful result carrying `data`.
    #[must_use]
    pub fn success(data: Value) -> Self {
        Self {
            status: ResultStatus::Success,
            message: None,
            data,
        }
    }

    /// Failed result with a message.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Failure,
            message: Some(message.into()),
            data: Value::Null,
        }
    }

    /// Whether the backend reported success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, ProtoError> {
        serde_json::to_string(self).map_err(|e| ProtoError::Encoding(e.to_string()))
    }

    /// Deserialize from JSON.
    ///
    /// A missing or unrecognised `status` is an error; it never defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn from_json(json: &str) -> Result<Self, ProtoError> {
        serde_json::from_str(json).map_err(|e| ProtoError::Decoding(e.to_string()))
    }
}
