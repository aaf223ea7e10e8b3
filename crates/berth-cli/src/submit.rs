//! Submission channel.
//!
//! Commands go to the backend's HTTP API. The response body is only an ack
//! (`{"id": ...}` or `{"error": ...}`); the outcome of the operation is
//! delivered on the session channel.

use std::time::Duration;

use async_trait::async_trait;
use berth_proto::{Command, ResourceKind, SubmissionAck, Verb};
use reqwest::{Client as HttpClient, Method, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, trace};

use crate::config::ClientConfig;
use crate::error::CliError;

/// Header carrying the correlation token.
pub const SESSION_HEADER: &str = "X-Session-Id";

/// Sends a command and returns the backend's immediate ack.
#[async_trait]
pub trait Submitter: Send + Sync {
    /// Submit `command`.
    ///
    /// Rejections come back as an ack carrying `error`; `Err` means the ack
    /// itself could not be obtained.
    async fn submit(&self, command: &Command) -> Result<SubmissionAck, CliError>;
}

/// HTTP request a command maps to.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// HTTP method.
    pub method: Method,
    /// Unescaped path segments below the API base URL.
    pub segments: Vec<String>,
    /// JSON body, if any.
    pub body: Option<Value>,
}

impl Route {
    /// Map a command to its endpoint.
    ///
    /// Namespace kinds use the cluster-scoped `/namespaces` endpoints and never
    /// carry a namespace.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::InvalidArgument`] if the command is missing the
    /// name or namespace its endpoint needs, or either is not a usable path
    /// segment.
    pub fn for_command(command: &Command) -> Result<Self, CliError> {
        let kind = command.kind();
        let body = command.payload().cloned();

        if kind == ResourceKind::Namespaces {
            return Self::cluster_scoped(command, body);
        }

        let namespace = command.namespace().ok_or_else(|| {
            CliError::InvalidArgument(format!("{} {kind} requires a namespace", command.verb()))
        })?;
        let namespace = segment("namespace", namespace)?;
        let collection = |kind: ResourceKind| {
            vec![
                "namespaces".to_string(),
                namespace.clone(),
                kind.as_str().to_string(),
            ]
        };
        let item = |name: String| {
            let mut segments = collection(kind);
            segments.push(name);
            segments
        };

        let route = match command.verb() {
            Verb::Run => Self::new(Method::POST, collection(ResourceKind::Deployments), body),
            Verb::Expose => Self::new(Method::POST, collection(ResourceKind::Services), body),
            Verb::Create => Self::new(Method::POST, collection(kind), body),
            Verb::Get => match optional_name(command)? {
                Some(name) => Self::new(Method::GET, item(name), None),
                None => Self::new(Method::GET, collection(kind), None),
            },
            Verb::Delete => Self::new(Method::DELETE, item(required_name(command)?), None),
            Verb::Replace => Self::new(Method::PUT, item(required_name(command)?), body),
        };
        Ok(route)
    }

    fn cluster_scoped(command: &Command, body: Option<Value>) -> Result<Self, CliError> {
        let collection = || vec!["namespaces".to_string()];
        let item = |name: String| vec!["namespaces".to_string(), name];

        let route = match command.verb() {
            Verb::Create => Self::new(Method::POST, collection(), body),
            Verb::Get => match optional_name(command)? {
                Some(name) => Self::new(Method::GET, item(name), None),
                None => Self::new(Method::GET, collection(), None),
            },
            Verb::Delete => Self::new(Method::DELETE, item(required_name(command)?), None),
            Verb::Replace => Self::new(Method::PUT, item(required_name(command)?), body),
            verb @ (Verb::Run | Verb::Expose) => {
                return Err(CliError::InvalidArgument(format!(
                    "{verb} does not apply to namespaces"
                )));
            }
        };
        Ok(route)
    }

    fn new(method: Method, segments: Vec<String>, body: Option<Value>) -> Self {
        Self {
            method,
            segments,
            body,
        }
    }

    /// Full request URL below `base`.
    ///
    /// Each segment is percent-encoded on its own, so `/`, `?` and `#` inside
    /// a name stay part of that name.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] if `base` cannot carry a path.
    pub fn url(&self, base: &Url) -> Result<Url, CliError> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| CliError::Config(format!("API URL {base} cannot carry a path")))?
            .pop_if_empty()
            .extend(&self.segments);
        Ok(url)
    }
}

fn segment(what: &str, value: &str) -> Result<String, CliError> {
    if value.is_empty() || value == "." || value == ".." {
        return Err(CliError::InvalidArgument(format!(
            "{what} {value:?} is not a valid resource path segment"
        )));
    }
    Ok(value.to_string())
}

fn optional_name(command: &Command) -> Result<Option<String>, CliError> {
    command.name().map(|name| segment("name", name)).transpose()
}

fn required_name(command: &Command) -> Result<String, CliError> {
    optional_name(command)?.ok_or_else(|| {
        CliError::InvalidArgument(format!(
            "{} {} requires a resource name",
            command.verb(),
            command.kind()
        ))
    })
}

/// Submitter for the backend HTTP API.
#[derive(Debug, Clone)]
pub struct HttpSubmitter {
    http: HttpClient,
    base_url: Url,
    auth_token: Option<String>,
}

impl HttpSubmitter {
    /// Create a submitter from the resolved config.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, CliError> {
        Self::new(
            &config.api_url,
            config.token.clone(),
            config.connect_timeout(),
            config.submit_timeout(),
        )
    }

    /// Create a submitter for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] if `base_url` is not a usable HTTP base
    /// URL or the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        auth_token: Option<String>,
        connect_timeout: Duration,
        submit_timeout: Duration,
    ) -> Result<Self, CliError> {
        let base = Url::parse(base_url)
            .map_err(|e| CliError::Config(format!("invalid API URL {base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(CliError::Config(format!("API URL {base_url} cannot carry a path")));
        }

        let http = HttpClient::builder()
            .connect_timeout(connect_timeout)
            .timeout(submit_timeout)
            .user_agent(concat!("berth/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CliError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base,
            auth_token,
        })
    }

    fn classify(&self, e: &reqwest::Error) -> CliError {
        if e.is_connect() {
            CliError::Connection(format!("cannot reach API at {}: {e}", self.base_url))
        } else if e.is_timeout() {
            CliError::Timeout("waiting for the submission ack".into())
        } else {
            CliError::Transport(format!("submission failed: {e}"))
        }
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(&self, command: &Command) -> Result<SubmissionAck, CliError> {
        let route = Route::for_command(command)?;
        let url = route.url(&self.base_url)?;
        debug!(method = %route.method, url = %url, session = %command.token(), "submitting command");

        let mut request = self
            .http
            .request(route.method.clone(), url)
            .header(SESSION_HEADER, command.token().to_string());
        if let Some(token) = &self.auth_token {
            request = request.header(reqwest::header::AUTHORIZATION, token);
        }
        if let Some(body) = &route.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| self.classify(&e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.classify(&e))?;
        trace!(%status, body = %text, "submission response");

        Ok(parse_ack(status, &text))
    }
}

/// Turn an HTTP response into an ack.
///
/// A body that is not an ack becomes a rejection naming the HTTP status.
#[must_use]
pub fn parse_ack(status: StatusCode, body: &str) -> SubmissionAck {
    match serde_json::from_str::<SubmissionAck>(body) {
        Ok(ack) if ack.id.is_some() || ack.error.is_some() => ack,
        Ok(_) | Err(_) if !status.is_success() => {
            SubmissionAck::rejected(format!("HTTP {status}: {}", snippet(body)))
        }
        Ok(_) => SubmissionAck::rejected("ack carried neither id nor error"),
        Err(e) => SubmissionAck::rejected(format!("malformed ack: {e}")),
    }
}

fn snippet(body: &str) -> &str {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(200) {
        Some((idx, _)) => &trimmed[..idx],
        None => trimmed,
    }
}
