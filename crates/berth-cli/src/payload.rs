//! File-backed resource documents.
//!
//! Resource documents are JSON files prepared by the user or by other
//! tooling; berth does not populate templates. The document's `kind` and
//! `metadata.name` identify the resource it describes.

use std::path::Path;

use berth_proto::ResourceKind;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::CliError;

/// A resource document loaded from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDocument {
    kind: ResourceKind,
    name: Option<String>,
    body: Value,
}

impl ResourceDocument {
    /// Load and inspect a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Payload`] if the file is missing, is not JSON, or
    /// does not name a known kind.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CliError::Payload(format!("no such file: {} ({e})", path.display())))?;
        let body: Value = serde_json::from_str(&raw)
            .map_err(|e| CliError::Payload(format!("bad json in {}: {e}", path.display())))?;
        let doc = Self::from_value(body)?;
        debug!(path = %path.display(), kind = %doc.kind, name = ?doc.name, "loaded resource document");
        Ok(doc)
    }

    /// Inspect an in-memory document.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Payload`] if the document has no usable `kind`.
    pub fn from_value(body: Value) -> Result<Self, CliError> {
        let kind = body
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| CliError::Payload("document has no \"kind\" field".into()))?;
        let kind = ResourceKind::from_document_kind(kind)
            .map_err(|e| CliError::Payload(e.to_string()))?;
        let name = body
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self { kind, name, body })
    }

    /// Kind derived from the document.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// `metadata.name`, if present.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The raw document.
    #[must_use]
    pub const fn body(&self) -> &Value {
        &self.body
    }

    /// Consume the document, returning its body.
    #[must_use]
    pub fn into_body(self) -> Value {
        self.body
    }

    /// Make sure the document is named `name`.
    ///
    /// Fills in `metadata.name` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Payload`] if the document already carries a
    /// different name or its `metadata` is not an object.
    pub fn named(mut self, name: &str) -> Result<Self, CliError> {
        match self.name.as_deref() {
            Some(existing) if existing == name => return Ok(self),
            Some(existing) => {
                return Err(CliError::Payload(format!(
                    "document is named {existing:?} but {name:?} was requested"
                )));
            }
            None => {}
        }

        let Some(root) = self.body.as_object_mut() else {
            return Err(CliError::Payload("document is not a JSON object".into()));
        };
        let metadata = root
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
        let Some(metadata) = metadata.as_object_mut() else {
            return Err(CliError::Payload("\"metadata\" is not an object".into()));
        };
        metadata.insert("name".into(), Value::String(name.to_string()));
        self.name = Some(name.to_string());
        Ok(self)
    }
}
