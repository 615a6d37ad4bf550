//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo; one task per accepted connection.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Body;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::GatewayConfig;
use crate::credentials::CredentialSource;
use crate::routes;
use crate::store::DocumentStore;
use crate::types::GatewayError;

/// Shared application state
///
/// Built once before the listener binds and never mutated afterwards.
pub struct AppState {
    pub config: GatewayConfig,
    /// `None` when credentials could not be resolved (degraded mode)
    pub store: Option<Arc<dyn DocumentStore>>,
    /// Which credential source produced the store's bundle
    pub credential_source: Option<CredentialSource>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: GatewayConfig, store: Option<Arc<dyn DocumentStore>>) -> Self {
        Self {
            config,
            store,
            credential_source: None,
            started_at: Instant::now(),
        }
    }

    pub fn with_credential_source(mut self, source: CredentialSource) -> Self {
        self.credential_source = Some(source);
        self
    }

    /// Store handle as the handlers take it
    pub fn store(&self) -> Option<&dyn DocumentStore> {
        self.store.as_deref()
    }
}

/// Bind `addr` and serve until the process exits
pub async fn run(state: Arc<AppState>, addr: SocketAddr) -> Result<(), GatewayError> {
    let listener = TcpListener::bind(addr).await?;
    serve(listener, state).await
}

/// Accept loop on an already-bound listener
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<(), GatewayError> {
    info!("Bubble gateway listening on {}", listener.local_addr()?);

    if state.store.is_none() {
        warn!("Degraded mode - /api/send-data and /api/first-five will answer 503");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
pub async fn handle_request<B>(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<B>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    let response = match (method, path.as_str()) {
        (Method::POST, "/api/send-data") => {
            routes::handle_send_data(req, state.store(), &state.config).await
        }

        (Method::GET, "/api/first-five") => {
            routes::handle_first_five(state.store(), &state.config).await
        }

        // Liveness probe
        (Method::GET, "/health") | (Method::GET, "/healthz") => routes::health_check(&state),

        // Readiness probe - 503 until the store is reachable
        (Method::GET, "/ready") | (Method::GET, "/readyz") => routes::readiness_check(&state),

        // CORS preflight
        (Method::OPTIONS, _) => preflight_response(),

        (_, "/api/send-data") | (_, "/api/first-five") => method_not_allowed_response(&path),

        _ => not_found_response(&path),
    };

    debug!("[{}] {} -> {}", addr, path, response.status());
    Ok(response)
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    let mut response = routes::empty_response(StatusCode::NO_CONTENT);
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    response
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    routes::json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({
            "error": "Not Found",
            "path": path,
            "hint": "Use POST /api/send-data or GET /api/first-five"
        }),
    )
}

fn method_not_allowed_response(path: &str) -> Response<Full<Bytes>> {
    routes::json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &serde_json::json!({ "error": "Method Not Allowed", "path": path }),
    )
}
