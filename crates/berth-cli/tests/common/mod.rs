//! In-process fakes for the two backend channels.

#![allow(dead_code)]

use std::time::Duration;

use berth_cli::session::SessionSettings;
use berth_proto::SessionHello;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

// ==================== Session Channel ====================

/// Bind a listener on an ephemeral port.
pub async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr").to_string();
    (listener, addr)
}

/// Address nothing listens on.
pub fn refused_addr() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr").to_string();
    drop(listener);
    addr
}

/// Session settings with short deadlines.
pub fn session_settings(addr: &str) -> SessionSettings {
    SessionSettings {
        addr: addr.to_string(),
        auth_token: Some("auth-secret".into()),
        connect_timeout: Duration::from_millis(500),
        receive_timeout: Duration::from_millis(500),
        debug: false,
    }
}

/// Server side of an accepted session.
pub struct SessionPeer {
    pub lines: tokio::io::Lines<BufReader<OwnedReadHalf>>,
    pub writer: OwnedWriteHalf,
}

impl SessionPeer {
    /// Accept one client.
    pub async fn accept(listener: &TcpListener) -> Self {
        let (stream, _) = listener.accept().await.expect("accept session");
        let (read, writer) = stream.into_split();
        Self {
            lines: BufReader::new(read).lines(),
            writer,
        }
    }

    /// Read and decode the client's hello.
    pub async fn read_hello(&mut self) -> SessionHello {
        let line = self
            .lines
            .next_line()
            .await
            .expect("read hello")
            .expect("hello line");
        SessionHello::from_json(&line).expect("decode hello")
    }

    /// Write one raw line.
    pub async fn send_line(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("write line");
    }

    /// Wait until the client closes its side.
    pub async fn wait_for_close(&mut self) -> bool {
        matches!(self.lines.next_line().await, Ok(None) | Err(_))
    }
}

// ==================== Submission Channel ====================

/// Request captured by the fake API.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    /// Header value, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Serve exactly one HTTP request with `status` and `body`.
pub async fn spawn_api(
    status: u16,
    body: impl Into<String>,
) -> (String, oneshot::Receiver<CapturedRequest>, JoinHandle<()>) {
    let body = body.into();
    let (listener, addr) = bind().await;
    let (tx, rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept api");
        let request = serve_one(stream, status, &body).await;
        let _ = tx.send(request);
    });
    (format!("http://{addr}"), rx, handle)
}

async fn serve_one(mut stream: TcpStream, status: u16, body: &str) -> CapturedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0_u8; 4096];
    let head_end = loop {
        let n = stream.read(&mut chunk).await.expect("read request");
        assert!(n > 0, "client closed before sending headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < head_end + content_length {
        let n = stream.read(&mut chunk).await.expect("read body");
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_in = String::from_utf8_lossy(&buf[head_end..]).to_string();

    let response = format!(
        "HTTP/1.1 {status} Fake\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream
        .write_all(response.as_bytes())
        .await
        .expect("write response");
    let _ = stream.shutdown().await;

    CapturedRequest {
        method,
        path,
        headers,
        body: body_in,
    }
}
