use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use http_body_util::BodyExt;
use std::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

pub static X_TRACE_ID: &str = "x-trace-id";

/// JSON bodies up to this size are logged at debug level.
const MAX_LOGGED_BODY: usize = 1024;

/// Credentials travel in these bodies, so they are never logged.
fn is_sensitive(path: &str) -> bool {
    path.starts_with("/api/auth") || path.starts_with("/api/admin/auth")
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"))
}

pub async fn trace_middleware(req: Request<Body>, next: Next) -> Response {
    let start_time = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %method,
        path = %path,
    );

    async move {
        let header_value = HeaderValue::from_str(&trace_id.to_string()).ok();
        let log_bodies = !is_sensitive(&path) && tracing::enabled!(tracing::Level::DEBUG);

        let mut req = if log_bodies && is_json(req.headers()) {
            let (parts, body) = req.into_parts();
            let bytes = buffer_and_log("request", body).await;
            Request::from_parts(parts, Body::from(bytes))
        } else {
            req
        };
        if let Some(value) = &header_value {
            req.headers_mut().insert(X_TRACE_ID, value.clone());
        }

        let response = next.run(req).await;

        let mut response = if log_bodies && is_json(response.headers()) {
            let (parts, body) = response.into_parts();
            let bytes = buffer_and_log("response", body).await;
            Response::from_parts(parts, Body::from(bytes))
        } else {
            response
        };
        if let Some(value) = header_value {
            response.headers_mut().insert(X_TRACE_ID, value);
        }

        let status = response.status();
        let latency_ms = start_time.elapsed().as_millis();
        if status.is_server_error() {
            warn!(status = status.as_u16(), latency_ms, "request failed");
        } else {
            info!(status = status.as_u16(), latency_ms, "request finished");
        }
        response
    }
    .instrument(span)
    .await
}

async fn buffer_and_log(direction: &str, body: Body) -> Bytes {
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(direction, error = %e, "failed to buffer body");
            return Bytes::new();
        }
    };
    match std::str::from_utf8(&bytes) {
        Ok(text) if bytes.len() <= MAX_LOGGED_BODY => debug!(direction, body = text, "body"),
        _ => debug!(direction, size = bytes.len(), "body skipped"),
    }
    bytes
}
