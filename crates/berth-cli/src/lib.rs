//! # berth-cli
//!
//! Command-line client for a container orchestration backend.
//!
//! # Architecture
//!
//! Every invocation uses two channels to the backend, tied together by one
//! [`berth_proto::CorrelationToken`]:
//!
//! ```text
//!             ┌── session (TCP, JSON lines) ──┐
//! ┌───────┐   │  hello ─► auth ack ◄─ result  │   ┌─────────┐
//! │ berth │◄──┤                               ├──►│ backend │
//! └───────┘   │  command ─► ack               │   └─────────┘
//!             └── submission (HTTP) ──────────┘
//! ```
//!
//! The [`orchestrator::Orchestrator`] opens the session, submits the command
//! through a [`submit::Submitter`], waits for the correlated result on the
//! [`session::OpenSession`] and closes the session on every path.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod payload;
pub mod session;
pub mod submit;

pub use cli::{Cli, Commands, Format};
pub use config::ClientConfig;
pub use error::CliError;
pub use orchestrator::{CommandRequest, Orchestrator};
pub use output::OutputFormat;
pub use session::{ConnectionState, OpenSession, SessionTransport};
pub use submit::HttpSubmitter;
