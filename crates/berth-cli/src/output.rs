//! Output formatting for command results.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use berth_proto::{OperationResult, ResourceKind, Verb};
use serde::Serialize;
use serde_json::Value;

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Get the current format.
    #[must_use]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

    /// Write a serializable value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }

    /// Write the terminal error line for a failed invocation.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_error<W: Write>(&self, writer: &mut W, error: &CliError) -> Result<(), CliError> {
        self.write(writer, &ErrorReport::from(error))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// A successful result, tagged with the command that produced it.
///
/// JSON output is the backend result unchanged.
#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    #[serde(skip)]
    verb: Verb,
    #[serde(skip)]
    kind: ResourceKind,
    #[serde(flatten)]
    result: OperationResult,
}

impl CommandReport {
    /// Wrap a successful result.
    #[must_use]
    pub const fn new(verb: Verb, kind: ResourceKind, result: OperationResult) -> Self {
        Self { verb, kind, result }
    }

    fn write_resources<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        match &self.result.data {
            Value::Null => {
                writeln!(writer, "No {} found", self.kind)?;
            }
            Value::Array(items) => {
                if items.is_empty() {
                    writeln!(writer, "No {} found", self.kind)?;
                    return Ok(());
                }
                writeln!(writer, "{:<40}  {:<12}", "NAME", "KIND")?;
                writeln!(writer, "{}", "─".repeat(54))?;
                for item in items {
                    let item = item.get("data").unwrap_or(item);
                    let name = item
                        .pointer("/metadata/name")
                        .and_then(Value::as_str)
                        .unwrap_or("<unnamed>");
                    let kind = item.get("kind").and_then(Value::as_str).unwrap_or("-");
                    writeln!(writer, "{:<40}  {:<12}", truncate(name, 40), kind)?;
                }
                writeln!(writer)?;
                writeln!(writer, "Total: {} {}", items.len(), self.kind)?;
            }
            other => {
                let pretty = serde_json::to_string_pretty(other)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer, "{pretty}")?;
            }
        }
        Ok(())
    }
}

impl TableDisplay for CommandReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.verb.is_mutating() {
            writeln!(writer, "{}... OK", self.verb)?;
            if let Some(message) = &self.result.message {
                writeln!(writer, "{message}")?;
            }
            return Ok(());
        }
        self.write_resources(writer)
    }
}

/// Error line for a failed invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    /// Error message.
    pub error: String,
    /// Whether the command may have been applied anyway.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub outcome_unknown: bool,
}

impl From<&CliError> for ErrorReport {
    fn from(error: &CliError) -> Self {
        Self {
            error: error.to_string(),
            outcome_unknown: error.is_indeterminate(),
        }
    }
}

impl TableDisplay for ErrorReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "error: {}", self.error)?;
        Ok(())
    }
}

/// Truncate a string to a maximum number of characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}
