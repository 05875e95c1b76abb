//! Access log for the ticket API.
//!
//! One line per request. Requests that passed the bearer check carry the
//! player's username, which the auth middleware leaves on the response.

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::time::Instant;
use tracing::{debug, error, info};

/// Username of the authenticated caller, attached to the response by the
/// auth middleware so the access log can name the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestUser(pub String);

pub async fn request_logging(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let start = Instant::now();

    let response = next.run(request).await;

    let username = response
        .extensions()
        .get::<RequestUser>()
        .map(|user| user.0.as_str())
        .unwrap_or("-");

    log_access(
        &method,
        &path,
        response.status(),
        start.elapsed().as_millis() as u64,
        username,
        addr,
    );

    response
}

fn log_access(
    method: &Method,
    path: &str,
    status: StatusCode,
    latency_ms: u64,
    username: &str,
    addr: SocketAddr,
) {
    let code = status.as_u16();
    let client_ip = addr.ip();

    if status.is_server_error() {
        error!(%method, path, status = code, latency_ms, username, %client_ip, "Request failed");
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::TOO_MANY_REQUESTS {
        // unauthenticated or throttled callers are noisy; keep them at debug
        debug!(%method, path, status = code, latency_ms, %client_ip, "Request refused");
    } else if status.is_client_error() {
        info!(%method, path, status = code, latency_ms, username, "Request rejected");
    } else {
        info!(%method, path, status = code, latency_ms, username, "Request completed");
    }
}
