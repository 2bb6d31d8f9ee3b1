//! HTTP front end.
//!
//! `tiny_http` accepts connections on a blocking thread; each request is
//! handed to the tokio runtime, routed by [`routes::route`], and answered
//! from the blocking pool.

pub mod routes;
pub mod state;

use routes::{ApiResponse, Body};
use serde_json::{json, Value};
use state::AppState;
use std::fs::File;
use std::io::{self, Read};
use std::sync::Arc;
use tiny_http::{Header, Request, Response};

const PPTX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Request bodies beyond this are truncated before JSON parsing.
const MAX_BODY_BYTES: u64 = 1024 * 1024;

const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, POST, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type"),
];

/// Bind `addr` and serve until the listener fails.
pub async fn run(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let server = tiny_http::Server::http(addr)
        .map_err(|e| anyhow::anyhow!("Failed to bind {addr}: {e}"))?;
    tracing::info!("Listening on http://{addr}");

    let runtime = tokio::runtime::Handle::current();
    tokio::task::spawn_blocking(move || {
        for request in server.incoming_requests() {
            runtime.spawn(handle(Arc::clone(&state), request));
        }
    })
    .await?;

    Ok(())
}

async fn handle(state: Arc<AppState>, request: Request) {
    let read = tokio::task::spawn_blocking(move || read_body(request)).await;
    let (request, body) = match read {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!("Request reader panicked: {e}");
            return;
        }
    };

    let method = request.method().as_str().to_string();
    let target = request.url().to_string();
    let response = match body {
        Ok(body) => routes::route(&state, &method, &target, &body).await,
        Err(e) => {
            tracing::warn!("Failed to read request body for {method} {target}: {e}");
            ApiResponse {
                status: 400,
                body: Body::Json(json!({ "error": "Could not read request body" })),
            }
        }
    };
    tracing::info!("{method} {target} -> {}", response.status);

    let sent = tokio::task::spawn_blocking(move || respond(request, response)).await;
    match sent {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!("Client went away before the response was sent: {e}"),
        Err(e) => tracing::error!("Response writer panicked: {e}"),
    }
}

fn read_body(mut request: Request) -> (Request, io::Result<Vec<u8>>) {
    let mut body = Vec::new();
    let result = request
        .as_reader()
        .take(MAX_BODY_BYTES)
        .read_to_end(&mut body)
        .map(|_| body);
    (request, result)
}

fn header(name: &str, value: &str) -> Option<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).ok()
}

fn with_headers<R: Read>(mut response: Response<R>, extra: &[(&str, &str)]) -> Response<R> {
    for &(name, value) in CORS_HEADERS.iter() {
        if let Some(h) = header(name, value) {
            response.add_header(h);
        }
    }
    for &(name, value) in extra {
        if let Some(h) = header(name, value) {
            response.add_header(h);
        }
    }
    response
}

fn json_response(status: u16, value: &Value) -> Response<io::Cursor<Vec<u8>>> {
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    with_headers(
        Response::from_data(bytes).with_status_code(status),
        &[("Content-Type", "application/json")],
    )
}

fn respond(request: Request, response: ApiResponse) -> io::Result<()> {
    match response.body {
        Body::Json(value) => request.respond(json_response(response.status, &value)),
        Body::Empty => request.respond(with_headers(Response::empty(response.status), &[])),
        Body::File { path, filename } => match File::open(&path) {
            Ok(file) => {
                let disposition = format!("attachment; filename=\"{filename}\"");
                request.respond(with_headers(
                    Response::from_file(file).with_status_code(response.status),
                    &[
                        ("Content-Type", PPTX_CONTENT_TYPE),
                        ("Content-Disposition", &disposition),
                    ],
                ))
            }
            Err(e) => {
                tracing::warn!("Failed to open {}: {e}", path.display());
                request.respond(json_response(
                    404,
                    &json!({ "error": "Presentation file not found" }),
                ))
            }
        },
    }
}
