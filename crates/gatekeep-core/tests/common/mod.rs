//! Fake licensing service and file host for integration tests.
//!
//! The service answers POSTs on `/` with scripted plain-text replies keyed by
//! the `type` query parameter, and records every request it receives.

#![allow(dead_code)]

use axum::body::Body;
use axum::extract::{Form, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use gatekeep_core::ApiClient;
use gatekeep_types::ClientConfig;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

pub const SOFT_ID: &str = "soft-test";
pub const VERSION: &str = "1.0";
pub const MAC: &str = "00AABBCCDDEE";

/// A scripted reply
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Status(u16),
    /// Reply with the text after a delay
    Delayed(Duration, String),
}

pub fn text(body: &str) -> Reply {
    Reply::Text(body.to_string())
}

/// One request the service received
#[derive(Debug, Clone)]
pub struct Hit {
    pub query_type: Option<String>,
    pub form: HashMap<String, String>,
}

#[derive(Default)]
struct Shared {
    /// Replies per discriminant; the last one repeats
    replies: Mutex<HashMap<u8, VecDeque<Reply>>>,
    hits: Mutex<Vec<Hit>>,
}

/// Handle to a running fake service
#[derive(Clone)]
pub struct FakeService {
    pub url: String,
    shared: Arc<Shared>,
}

impl FakeService {
    pub async fn start() -> Self {
        let shared = Arc::new(Shared::default());
        let app = Router::new()
            .route("/", post(handle))
            .with_state(Arc::clone(&shared));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}/", addr),
            shared,
        }
    }

    /// Answer every request for `endpoint` with `reply`
    pub fn reply(&self, endpoint: u8, reply: Reply) -> &Self {
        self.script(endpoint, vec![reply])
    }

    /// Answer requests for `endpoint` with `replies` in order, repeating the last
    pub fn script(&self, endpoint: u8, replies: Vec<Reply>) -> &Self {
        self.shared
            .replies
            .lock()
            .unwrap()
            .insert(endpoint, replies.into());
        self
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.shared.hits.lock().unwrap().clone()
    }

    pub fn hits_for(&self, endpoint: u8) -> Vec<Hit> {
        let wanted = endpoint.to_string();
        self.hits()
            .into_iter()
            .filter(|h| h.form.get("type") == Some(&wanted))
            .collect()
    }
}

async fn handle(
    State(shared): State<Arc<Shared>>,
    Query(query): Query<HashMap<String, String>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let discriminant: Option<u8> = form.get("type").and_then(|t| t.parse().ok());

    shared.hits.lock().unwrap().push(Hit {
        query_type: query.get("type").cloned(),
        form,
    });

    let reply = discriminant.and_then(|d| {
        let mut replies = shared.replies.lock().unwrap();
        let queue = replies.get_mut(&d)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    });

    match reply {
        Some(Reply::Text(body)) => body.into_response(),
        Some(Reply::Status(code)) => StatusCode::from_u16(code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
        Some(Reply::Delayed(delay, body)) => {
            tokio::time::sleep(delay).await;
            body.into_response()
        }
        None => "-81001".into_response(),
    }
}

/// A mirror address nothing listens on
pub fn dead_mirror() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/", addr)
}

pub fn config(mirrors: Vec<String>) -> ClientConfig {
    ClientConfig {
        soft_id: SOFT_ID.to_string(),
        version: VERSION.to_string(),
        mac: MAC.to_string(),
        mirrors,
        request_timeout_ms: 300,
        ..ClientConfig::default()
    }
}

pub fn client(mirrors: Vec<String>) -> ApiClient {
    ApiClient::new(&config(mirrors)).unwrap()
}

// ============================================================================
// File host
// ============================================================================

pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Serves `/files/:name` with a declared length, `/stream/:name` without one,
/// and 404 for `/missing/:name`
pub async fn start_file_host(body: Vec<u8>) -> String {
    let body = Arc::new(body);
    let app = Router::new()
        .route("/files/:name", get(serve_file))
        .route("/stream/:name", get(serve_stream))
        .route("/missing/:name", get(|| async { StatusCode::NOT_FOUND }))
        .with_state(body);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn serve_file(State(body): State<Arc<Vec<u8>>>, Path(_name): Path<String>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_LENGTH, body.len().to_string()),
        ],
        body.as_ref().clone(),
    )
        .into_response()
}

async fn serve_stream(State(body): State<Arc<Vec<u8>>>, Path(_name): Path<String>) -> Response {
    let chunks: Vec<Result<Vec<u8>, std::io::Error>> =
        body.chunks(4096).map(|c| Ok(c.to_vec())).collect();
    Body::from_stream(futures::stream::iter(chunks)).into_response()
}

/// Answers every connection with a declared `Content-Length` of `declared`,
/// sends only `body`, then drops the connection
pub async fn start_truncating_host(declared: usize, body: Vec<u8>) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let body = body.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\n\r\n",
                    declared
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.flush().await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{}", addr)
}
