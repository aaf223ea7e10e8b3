//! Session channel transport.
//!
//! A session is one TCP connection carrying newline-delimited JSON frames:
//!
//! 1. client sends [`SessionHello`] with the correlation token,
//! 2. backend answers with an [`AuthAck`],
//! 3. backend later delivers exactly one [`OperationResult`].
//!
//! [`SessionTransport`] is the unauthenticated handle. Its only operation is
//! [`SessionTransport::connect`], which consumes it and yields an
//! [`OpenSession`]. Receiving is only possible on the open handle.
//!
//! # Example
//!
//! ```rust,no_run
//! use berth_cli::config::ClientConfig;
//! use berth_cli::session::{SessionSettings, SessionTransport};
//! use berth_proto::CorrelationToken;
//!
//! # async fn example() -> Result<(), berth_cli::CliError> {
//! let settings = SessionSettings::from_config(&ClientConfig::default());
//! let mut session = SessionTransport::new(settings, CorrelationToken::new())
//!     .connect()
//!     .await?;
//! let result = session.receive().await;
//! session.close().await;
//! println!("{:?}", result?.status);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use berth_proto::{AuthAck, CorrelationToken, OperationResult, SessionHello};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, info, trace};

use crate::config::ClientConfig;
use crate::error::CliError;

/// Largest frame accepted on the session channel (16 MiB).
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

type FramedSession = Framed<TcpStream, LinesCodec>;

/// Lifecycle of a session connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected yet.
    Disconnected,
    /// Hello sent, waiting for the auth ack.
    Authenticating,
    /// Authenticated; the result may be received.
    Open,
    /// Released by the client.
    Closed,
    /// An I/O, framing or decode fault occurred.
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Authenticating => "authenticating",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Connection parameters for a session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// `host:port` of the session endpoint.
    pub addr: String,
    /// Persisted auth token sent in the hello frame.
    pub auth_token: Option<String>,
    /// Deadline for TCP connect, hello and auth ack together.
    pub connect_timeout: Duration,
    /// Deadline for the result frame.
    pub receive_timeout: Duration,
    /// Log raw frames.
    pub debug: bool,
}

impl SessionSettings {
    /// Build settings from the resolved client config.
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            addr: config.session_addr.clone(),
            auth_token: config.token.clone(),
            connect_timeout: config.connect_timeout(),
            receive_timeout: config.receive_timeout(),
            debug: config.debug,
        }
    }
}

/// A session that has not been opened yet.
#[derive(Debug)]
pub struct SessionTransport {
    settings: SessionSettings,
    token: CorrelationToken,
}

impl SessionTransport {
    /// Create a disconnected session for `token`.
    #[must_use]
    pub const fn new(settings: SessionSettings, token: CorrelationToken) -> Self {
        Self { settings, token }
    }

    /// Always [`ConnectionState::Disconnected`]; connecting consumes the handle.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        ConnectionState::Disconnected
    }

    /// Correlation token this session authenticates with.
    #[must_use]
    pub const fn token(&self) -> CorrelationToken {
        self.token
    }

    /// Open the connection and authenticate.
    ///
    /// TCP connect, hello and auth ack share a single `connect_timeout`
    /// deadline. On failure the connection is released before returning.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Connection`] if the endpoint is unreachable, the
    /// deadline expires, or the backend refuses or garbles the auth ack.
    pub async fn connect(self) -> Result<OpenSession, CliError> {
        debug!(addr = %self.settings.addr, session = %self.token, "opening session");

        let deadline = self.settings.connect_timeout;
        let (framed, auth) = match timeout(deadline, self.handshake()).await {
            Ok(Ok(opened)) => opened,
            Ok(Err(e)) => {
                debug!(session = %self.token, state = %ConnectionState::Failed, error = %e, "session handshake failed");
                return Err(e);
            }
            Err(_) => {
                debug!(session = %self.token, state = %ConnectionState::Failed, "session handshake timed out");
                return Err(CliError::Connection(format!(
                    "timed out after {deadline:?} opening session to {}",
                    self.settings.addr
                )));
            }
        };

        info!(session = %self.token, "session authenticated");
        Ok(OpenSession {
            framed: Some(framed),
            token: self.token,
            state: ConnectionState::Open,
            receive_timeout: self.settings.receive_timeout,
            debug: self.settings.debug,
            auth,
            delivered: false,
        })
    }

    async fn handshake(&self) -> Result<(FramedSession, AuthAck), CliError> {
        let mut framed = self.open_stream().await?;
        trace!(state = %ConnectionState::Authenticating, "sending hello");

        match self.authenticate(&mut framed).await {
            Ok(auth) => Ok((framed, auth)),
            Err(e) => {
                let _ = SinkExt::<String>::close(&mut framed).await;
                Err(e)
            }
        }
    }

    async fn open_stream(&self) -> Result<FramedSession, CliError> {
        let addr = &self.settings.addr;
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| CliError::Connection(format!("cannot reach session endpoint {addr}: {e}")))?;

        Ok(Framed::new(
            stream,
            LinesCodec::new_with_max_length(MAX_FRAME_LEN),
        ))
    }

    async fn authenticate(&self, framed: &mut FramedSession) -> Result<AuthAck, CliError> {
        let hello = SessionHello::new(
            self.token,
            self.settings.auth_token.clone(),
            env!("CARGO_PKG_VERSION"),
        );
        let json = hello
            .to_json()
            .map_err(|e| CliError::Connection(format!("failed to serialize hello: {e}")))?;

        framed
            .send(json)
            .await
            .map_err(|e| CliError::Connection(format!("failed to send hello: {e}")))?;

        let line = framed
            .next()
            .await
            .ok_or_else(|| CliError::Connection("session closed during authentication".into()))?
            .map_err(|e| CliError::Connection(format!("malformed authentication frame: {e}")))?;

        if self.settings.debug {
            debug!(frame = %line, "auth ack frame");
        }

        let ack = AuthAck::from_json(&line)
            .map_err(|e| CliError::Connection(format!("malformed authentication ack: {e}")))?;

        if !ack.ok {
            let reason = ack.error.as_deref().unwrap_or("no reason given");
            return Err(CliError::Connection(format!(
                "authentication refused: {reason}"
            )));
        }

        Ok(ack)
    }
}

/// An authenticated session, ready to deliver one result.
pub struct OpenSession {
    framed: Option<FramedSession>,
    token: CorrelationToken,
    state: ConnectionState,
    receive_timeout: Duration,
    debug: bool,
    auth: AuthAck,
    delivered: bool,
}

impl fmt::Debug for OpenSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenSession")
            .field("token", &self.token)
            .field("state", &self.state)
            .field("receive_timeout", &self.receive_timeout)
            .field("delivered", &self.delivered)
            .finish_non_exhaustive()
    }
}

impl OpenSession {
    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Correlation token.
    #[must_use]
    pub const fn token(&self) -> CorrelationToken {
        self.token
    }

    /// Ack returned by the backend during authentication.
    #[must_use]
    pub const fn auth_ack(&self) -> &AuthAck {
        &self.auth
    }

    /// Wait for the result of the submitted command.
    ///
    /// Only one call per session is accepted. Blank keep-alive lines are
    /// skipped.
    ///
    /// # Errors
    ///
    /// - [`CliError::Transport`] if the stream ends, a frame is malformed or
    ///   the result cannot be decoded
    /// - [`CliError::Timeout`] if no result arrives before the deadline
    pub async fn receive(&mut self) -> Result<OperationResult, CliError> {
        if self.delivered {
            return Err(CliError::Transport(
                "session has already delivered its result".into(),
            ));
        }
        let Some(framed) = self.framed.as_mut() else {
            return Err(CliError::Transport(format!("session is {}", self.state)));
        };
        self.delivered = true;

        let deadline = self.receive_timeout;
        let outcome = match timeout(deadline, next_frame(framed)).await {
            Err(_) => Err(CliError::Timeout(format!(
                "after {deadline:?} waiting for the result"
            ))),
            Ok(frame) => frame.and_then(|line| {
                if self.debug {
                    debug!(frame = %line, "result frame");
                }
                OperationResult::from_json(&line)
                    .map_err(|e| CliError::Transport(format!("undecodable result: {e}")))
            }),
        };

        match &outcome {
            Ok(result) => debug!(session = %self.token, status = ?result.status, "result received"),
            Err(e) => {
                self.state = ConnectionState::Failed;
                debug!(session = %self.token, error = %e, "session failed while awaiting result");
            }
        }
        outcome
    }

    /// Release the connection. Idempotent and infallible.
    pub async fn close(&mut self) {
        if let Some(mut framed) = self.framed.take() {
            if let Err(e) = SinkExt::<String>::close(&mut framed).await {
                trace!(error = %e, "ignoring error while closing session");
            }
            debug!(session = %self.token, "session closed");
        }
        self.state = ConnectionState::Closed;
    }
}

async fn next_frame(framed: &mut FramedSession) -> Result<String, CliError> {
    loop {
        match framed.next().await {
            None => {
                return Err(CliError::Transport(
                    "session closed before the result arrived".into(),
                ));
            }
            Some(Err(e)) => return Err(CliError::Transport(format!("malformed frame: {e}"))),
            Some(Ok(line)) if line.trim().is_empty() => {}
            Some(Ok(line)) => return Ok(line),
        }
    }
}

/// Authenticated result channel, as seen by the orchestrator.
#[async_trait]
pub trait Session: Send {
    /// Wait for the single result of this session.
    async fn receive(&mut self) -> Result<OperationResult, CliError>;

    /// Release the session. Idempotent and infallible.
    async fn close(&mut self);
}

#[async_trait]
impl Session for OpenSession {
    async fn receive(&mut self) -> Result<OperationResult, CliError> {
        OpenSession::receive(self).await
    }

    async fn close(&mut self) {
        OpenSession::close(self).await;
    }
}

/// Opens authenticated sessions.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Session type produced on success.
    type Session: Session;

    /// Open and authenticate a session for `token`.
    async fn connect(&self, token: CorrelationToken) -> Result<Self::Session, CliError>;
}

/// Connector for the real TCP session channel.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    settings: SessionSettings,
}

impl TcpConnector {
    /// Create a connector.
    #[must_use]
    pub const fn new(settings: SessionSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Session = OpenSession;

    async fn connect(&self, token: CorrelationToken) -> Result<OpenSession, CliError> {
        SessionTransport::new(self.settings.clone(), token)
            .connect()
            .await
    }
}
