//! HTTP server
//!
//! Small surface: `/health`, `/log` (latest audit entries) and the
//! `/map.ws` WebSocket upgrade. Everything interesting happens on the
//! WebSocket; HTTP exists for monitoring and the audit page.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{header, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::server::ws;
use crate::service::MapService;

const AUDIT_PAGE_SIZE: usize = 50;

/// Accept loop. Runs until the process is killed.
pub async fn run(listen: SocketAddr, service: Arc<MapService>) -> Result<()> {
    let listener = TcpListener::bind(listen).await?;
    info!(addr = %listen, "listening");

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let handler = service_fn(move |req| {
                        let service = Arc::clone(&service);
                        async move { handle_request(service, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, handler)
                        .with_upgrades()
                        .await
                    {
                        warn!(addr = %addr, error = %err, "connection error");
                    }
                });
            }
            Err(e) => {
                error!(error = %e, "accept failed");
            }
        }
    }
}

async fn handle_request(
    service: Arc<MapService>,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    debug!(method = %method, path = %path, "incoming request");

    let response = match (method, path.as_str()) {
        (Method::GET, "/health") => json_response(StatusCode::OK, r#"{"status":"ok"}"#.to_string()),

        (Method::GET, "/log") => match service.recent_audit(AUDIT_PAGE_SIZE) {
            Ok(entries) => match serde_json::to_string(&entries) {
                Ok(json) => json_response(StatusCode::OK, json),
                Err(e) => internal_error(&e.to_string()),
            },
            Err(e) => internal_error(&e.to_string()),
        },

        (Method::GET, "/map.ws") => {
            if hyper_tungstenite::is_upgrade_request(&req) {
                handle_map_upgrade(service, req)
            } else {
                json_response(
                    StatusCode::BAD_REQUEST,
                    r#"{"error":"expected WebSocket upgrade"}"#.to_string(),
                )
            }
        }

        _ => json_response(StatusCode::NOT_FOUND, r#"{"error":"not found"}"#.to_string()),
    };

    Ok(response)
}

fn handle_map_upgrade(
    service: Arc<MapService>,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    match hyper_tungstenite::upgrade(req, None) {
        Ok((response, websocket)) => {
            tokio::spawn(async move {
                match websocket.await {
                    Ok(ws) => {
                        if let Err(e) = ws::serve(ws, service).await {
                            warn!(error = %e, "map connection closed with error");
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "WebSocket upgrade failed");
                    }
                }
            });
            response
        }
        Err(e) => {
            error!(error = %e, "WebSocket upgrade rejected");
            json_response(
                StatusCode::BAD_REQUEST,
                r#"{"error":"WebSocket upgrade failed"}"#.to_string(),
            )
        }
    }
}

fn json_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    // Static status and header values, the builder cannot fail.
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

fn internal_error(message: &str) -> Response<Full<Bytes>> {
    error!(error = %message, "request failed");
    json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        r#"{"error":"internal error"}"#.to_string(),
    )
}
