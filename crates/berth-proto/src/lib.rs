//! # berth-proto
//!
//! Wire types shared by the berth submission channel (HTTP) and session
//! channel (framed TCP). No I/O lives here.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod command;
pub mod error;
pub mod session;
pub mod types;

pub use command::{AckVerdict, Command, SubmissionAck};
pub use error::ProtoError;
pub use session::{AuthAck, OperationResult, ResultStatus, SessionHello};
pub use types::{CorrelationToken, ResourceKind, Verb};
