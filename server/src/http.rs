//! HTTP transport and routing.
//!
//! A tiny_http listener runs on its own thread and forwards requests into a
//! tokio channel. Each request is routed on a tokio task and answered from the
//! blocking pool.

use std::collections::HashMap;
use std::future::Future;
use std::io::Read;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;

use question_index::QuestionSearch;
use serde::Serialize;
use tiny_http::{Header, Method, Request, Response, Server};
use tokio::sync::mpsc;

use crate::error::{ServerError, ServerResult};

const INDEX_HTML: &str = include_str!("assets/index.html");
const MAX_BODY_BYTES: u64 = 64 * 1024;
const METHOD_NOT_ALLOWED: &str = "Only GET and POST methods are allowed for this endpoint";

/// A fully rendered response
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl HttpReply {
    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self {
                status,
                content_type: "application/json",
                body,
            },
            Err(e) => Self::error(&ServerError::Task(format!("serialization failed: {e}"))),
        }
    }

    fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.as_bytes().to_vec(),
        }
    }

    fn html(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "text/html; charset=utf-8",
            body: body.as_bytes().to_vec(),
        }
    }

    fn error(err: &ServerError) -> Self {
        let body = serde_json::json!({ "error": err.to_string() });
        Self {
            status: err.status_code(),
            content_type: "application/json",
            body: body.to_string().into_bytes(),
        }
    }
}

/// Request handler for the search endpoints
pub struct SearchApp {
    search: Arc<QuestionSearch>,
}

impl SearchApp {
    pub fn new(search: Arc<QuestionSearch>) -> Self {
        Self { search }
    }

    /// Route one request. `url` is the request target (path plus query).
    pub async fn handle(&self, method: &Method, url: &str, body: &[u8]) -> HttpReply {
        let parsed = match url::Url::parse(&format!("http://localhost{url}")) {
            Ok(u) => u,
            Err(_) => return HttpReply::text(400, "Bad Request"),
        };

        match parsed.path() {
            "/" | "/index.html" => match method {
                Method::Get | Method::Head => HttpReply::html(INDEX_HTML),
                _ => HttpReply::text(405, "Method Not Allowed"),
            },

            "/api/search" => {
                let params: HashMap<String, String> = match method {
                    Method::Get => parsed.query_pairs().into_owned().collect(),
                    Method::Post => url::form_urlencoded::parse(body).into_owned().collect(),
                    _ => return HttpReply::text(405, METHOD_NOT_ALLOWED),
                };

                match self.search(&params).await {
                    Ok(reply) => reply,
                    Err(e) => {
                        tracing::warn!("Search failed: {}", e);
                        HttpReply::error(&e)
                    }
                }
            }

            _ => HttpReply::text(404, "Not Found"),
        }
    }

    async fn search(&self, params: &HashMap<String, String>) -> ServerResult<HttpReply> {
        let question = params.get("question").map(String::as_str).unwrap_or("");
        let top_k = parse_top_k(params.get("top_k").map(String::as_str))?;

        let hits = self.search.search(question, top_k).await?;
        Ok(HttpReply::json(200, &hits))
    }
}

fn parse_top_k(raw: Option<&str>) -> ServerResult<Option<usize>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse::<usize>()
            .map(Some)
            .map_err(|_| ServerError::invalid_parameter("top_k", "expected a positive integer")),
    }
}

/// Bound HTTP listener
pub struct HttpServer {
    server: Arc<Server>,
}

impl HttpServer {
    pub fn bind(addr: SocketAddr) -> ServerResult<Self> {
        let server = Server::http(addr).map_err(|e| ServerError::Bind {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            server: Arc::new(server),
        })
    }

    /// Actual address the listener bound to
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Serve requests until `shutdown` resolves
    pub async fn serve<F>(self, app: Arc<SearchApp>, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()>,
    {
        let (tx, mut rx) = mpsc::channel::<Request>(64);
        let listener = self.server.clone();
        let accept = thread::spawn(move || {
            while let Ok(request) = listener.recv() {
                if tx.blocking_send(request).is_err() {
                    break;
                }
            }
        });

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutting down HTTP server");
                    break;
                }
                maybe_req = rx.recv() => {
                    let Some(request) = maybe_req else {
                        break;
                    };
                    let app = app.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_request(app, request).await {
                            tracing::warn!("Failed to answer request: {}", e);
                        }
                    });
                }
            }
        }

        drop(rx);
        self.server.unblock();
        let _ = tokio::task::spawn_blocking(move || accept.join()).await;
        Ok(())
    }
}

async fn handle_request(app: Arc<SearchApp>, request: Request) -> ServerResult<()> {
    let (request, body) = tokio::task::spawn_blocking(move || read_body(request)).await??;

    let method = request.method().clone();
    let url = request.url().to_string();
    let reply = match body {
        Some(body) => app.handle(&method, &url, &body).await,
        None => HttpReply::error(&ServerError::PayloadTooLarge {
            limit: MAX_BODY_BYTES,
        }),
    };

    tracing::debug!("{} {} -> {}", method, url, reply.status);

    tokio::task::spawn_blocking(move || respond(request, reply)).await??;
    Ok(())
}

/// Read the request body; `None` when it exceeds `MAX_BODY_BYTES`
fn read_body(mut request: Request) -> std::io::Result<(Request, Option<Vec<u8>>)> {
    let mut body = Vec::new();
    request
        .as_reader()
        .take(MAX_BODY_BYTES + 1)
        .read_to_end(&mut body)?;

    if body.len() as u64 > MAX_BODY_BYTES {
        return Ok((request, None));
    }
    Ok((request, Some(body)))
}

fn respond(request: Request, reply: HttpReply) -> std::io::Result<()> {
    let mut response = Response::from_data(reply.body).with_status_code(reply.status);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
        response = response.with_header(header);
    }
    request.respond(response)
}
