//! Request routing dispatch module
//!
//! Entry point for HTTP request processing, responsible for method validation,
//! route matching, dispatching and access logging.

use crate::config::AppState;
use crate::handler::invoke;
use crate::http;
use crate::logger::{self, AccessLogEntry, Outcome};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let mut entry = AccessLogEntry::new(
        remote_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.http_version = version_label(req.version()).to_string();
    entry.user_agent = req
        .headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);

    let (response, outcome) = route_request(req, &state).await;

    if state.config.logging.access_log {
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        entry.outcome = outcome;
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Route request based on path and method
async fn route_request<B>(
    req: Request<B>,
    state: &AppState,
) -> (Response<Full<Bytes>>, Option<Outcome>)
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let server_name = state.config.http.server_name.as_str();
    let health = &state.config.http.health;
    let path = req.uri().path();

    // 0. Health probes (GET/HEAD only)
    if health.enabled && (path == health.liveness_path || path == health.readiness_path) {
        return match *req.method() {
            Method::GET => (http::build_health_response(false, server_name), None),
            Method::HEAD => (http::build_health_response(true, server_name), None),
            _ => (http::build_405_response(server_name), None),
        };
    }

    // 1. The function endpoint
    if path == "/" {
        if req.method() != Method::POST {
            logger::log_debug(&format!("Method not allowed on /: {}", req.method()));
            return (http::build_405_response(server_name), None);
        }
        let (response, outcome) = invoke::handle_invoke(req.into_body(), state).await;
        return (response, Some(outcome));
    }

    // 2. Anything else
    (http::build_404_response(server_name), None)
}

const fn version_label(version: hyper::Version) -> &'static str {
    match version {
        hyper::Version::HTTP_09 => "0.9",
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        hyper::Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
