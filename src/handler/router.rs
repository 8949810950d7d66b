//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: preflight, health probes, body
//! limits, then hand-off to the face API. Every response gets the common
//! headers and an access log line.

use crate::config::{AppState, HealthConfig};
use crate::http;
use crate::logger::AccessLogEntry;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, CONTENT_LENGTH, REFERER, USER_AGENT};
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let (parts, body) = req.into_parts();
    let path = parts.uri.path();

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        parts.method.to_string(),
        path.to_string(),
    );
    entry.query = parts.uri.query().map(ToString::to_string);
    entry.http_version = version_label(parts.version).to_string();
    entry.referer = header_string(&parts.headers, REFERER);
    entry.user_agent = header_string(&parts.headers, USER_AGENT);

    let max_body_size = state.config.http.max_body_size;
    let mut response = if let Some(resp) = preflight(&parts.method, path, &state) {
        resp
    } else if exceeds_body_limit(&parts.headers, max_body_size) {
        http::build_413_response()
    } else {
        let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
        match Limited::new(body, limit).collect().await {
            Ok(collected) => {
                let bytes = collected.to_bytes();
                state.api.dispatch(&parts.method, path, &bytes).await
            }
            Err(e) if e.is::<LengthLimitError>() => {
                tracing::warn!("Request body for {path} exceeds {max_body_size} bytes");
                http::build_413_response()
            }
            Err(e) => {
                tracing::warn!("failed to read request body for {path}: {e}");
                http::build_error_response(StatusCode::BAD_REQUEST, "failed to read request body")
            }
        }
    };

    http::apply_common_headers(
        &mut response,
        &state.config.http.server_name,
        state.config.http.enable_cors,
    );

    entry.status = response.status().as_u16();
    entry.body_bytes = response_len(&response);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    state.api.logger().access(&entry);

    Ok(response)
}

/// Requests answered without reading the body: OPTIONS and health probes
fn preflight(method: &Method, path: &str, state: &AppState) -> Option<Response<Full<Bytes>>> {
    if *method == Method::OPTIONS {
        return Some(http::build_options_response(state.config.http.enable_cors));
    }
    if *method == Method::GET && is_health_path(path, &state.config.health) {
        return Some(http::build_health_response("ok"));
    }
    None
}

fn is_health_path(path: &str, health: &HealthConfig) -> bool {
    health.enabled && (path == health.liveness_path || path == health.readiness_path)
}

/// Check Content-Length against the configured maximum
fn exceeds_body_limit(headers: &HeaderMap, max_body_size: u64) -> bool {
    let Some(content_length) = headers.get(CONTENT_LENGTH) else {
        return false;
    };
    match content_length.to_str().map(str::parse::<u64>) {
        Ok(Ok(size)) if size > max_body_size => {
            tracing::warn!("Request body too large: {size} bytes (max: {max_body_size})");
            true
        }
        Ok(Ok(_)) => false,
        _ => {
            // Limited still enforces the cap while reading
            tracing::warn!("Invalid Content-Length header, skipping size check");
            false
        }
    }
}

fn header_string(headers: &HeaderMap, name: hyper::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn version_label(version: hyper::Version) -> &'static str {
    match version {
        hyper::Version::HTTP_09 => "0.9",
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        hyper::Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

fn response_len(response: &Response<Full<Bytes>>) -> usize {
    response
        .body()
        .size_hint()
        .exact()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::logger::Logger;
    use hyper::body::Frame;
    use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    const EMBEDDINGS: &str = r#"{"embedding1": [1, 0], "embedding2": [1, 0]}"#;

    /// Body whose first read fails, as when the client goes away mid-upload
    struct BrokenBody;

    impl Body for BrokenBody {
        type Data = Bytes;
        type Error = io::Error;

        fn poll_frame(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Bytes>, io::Error>>> {
            Poll::Ready(Some(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "client went away",
            ))))
        }
    }

    fn state_with(toml: &str) -> Arc<AppState> {
        let cfg = Config::from_toml_str(toml).unwrap();
        let logger = Logger::new(&cfg.logging).unwrap();
        Arc::new(AppState::new(&cfg, logger))
    }

    fn request<B>(method: Method, path: &str, body: B) -> Request<B> {
        Request::builder().method(method).uri(path).body(body).unwrap()
    }

    fn full(body: &str) -> Full<Bytes> {
        Full::new(Bytes::from(body.to_string()))
    }

    async fn send<B>(state: &Arc<AppState>, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        handle_request(req, Arc::clone(state), peer).await.unwrap()
    }

    async fn body_json(response: Response<Full<Bytes>>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_streamed_body_over_limit() {
        let state = state_with("[http]\nmax_body_size = 16");

        // No Content-Length: the cap is enforced while reading
        let response = send(&state, request(Method::POST, "/verify-embeddings", full(EMBEDDINGS))).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        // Declared length is rejected before reading
        let mut req = request(Method::POST, "/verify-embeddings", full(EMBEDDINGS));
        req.headers_mut()
            .insert(CONTENT_LENGTH, HeaderValue::from(EMBEDDINGS.len()));
        let response = send(&state, req).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        // Within the limit the request reaches the API
        let response = send(&state, request(Method::POST, "/verify-embeddings", full("{}"))).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_body_read_failure_is_bad_request() {
        let state = state_with("");
        let response = send(&state, request(Method::POST, "/represent", BrokenBody)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "failed to read request body"})
        );
    }

    #[tokio::test]
    async fn test_options_answered_without_reading_body() {
        let state = state_with("");
        let response = send(&state, request(Method::OPTIONS, "/verify", BrokenBody)).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()["Allow"], "GET, HEAD, POST, OPTIONS");
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_health_probe_precedes_dispatch() {
        let state = state_with("");
        let response = send(&state, request(Method::GET, "/readyz", BrokenBody)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!({"status": "ok"}));

        // A probe mounted on "/" shadows the welcome page
        let state = state_with("[health]\nliveness_path = \"/\"");
        let response = send(&state, request(Method::GET, "/", full(""))).await;
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(body_json(response).await, serde_json::json!({"status": "ok"}));

        // Disabled probes fall through to the API router
        let state = state_with("[health]\nenabled = false");
        let response = send(&state, request(Method::GET, "/healthz", full(""))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_common_headers_on_api_responses() {
        let state = state_with("");
        let response = send(&state, request(Method::POST, "/verify-embeddings", full(EMBEDDINGS))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["Server"],
            format!("faceapi/{}", env!("CARGO_PKG_VERSION")).as_str()
        );
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(body_json(response).await, serde_json::json!({"success": true}));

        // Missing input keeps the 200 message body and still gets the headers
        let response = send(&state, request(Method::POST, "/represent", full(""))).await;
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"message": "empty input set passed"})
        );

        let state = state_with("[http]\nenable_cors = false\nserver_name = \"faceapi-test\"");
        let response = send(&state, request(Method::POST, "/verify-embeddings", full(EMBEDDINGS))).await;
        assert_eq!(response.headers()["Server"], "faceapi-test");
        assert!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    fn headers_with_length(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_body_limit() {
        assert!(!exceeds_body_limit(&HeaderMap::new(), 10));
        assert!(!exceeds_body_limit(&headers_with_length("10"), 10));
        assert!(exceeds_body_limit(&headers_with_length("11"), 10));
        assert!(!exceeds_body_limit(&headers_with_length("abc"), 10));
    }

    #[test]
    fn test_health_paths() {
        let health = HealthConfig::default();
        assert!(is_health_path("/healthz", &health));
        assert!(is_health_path("/readyz", &health));
        assert!(!is_health_path("/verify", &health));

        let disabled = HealthConfig {
            enabled: false,
            ..HealthConfig::default()
        };
        assert!(!is_health_path("/healthz", &disabled));
    }

    #[test]
    fn test_version_label() {
        assert_eq!(version_label(hyper::Version::HTTP_11), "1.1");
        assert_eq!(version_label(hyper::Version::HTTP_10), "1.0");
        assert_eq!(version_label(hyper::Version::HTTP_2), "2");
    }

    #[test]
    fn test_response_len() {
        let response = http::build_health_response("ok");
        assert_eq!(response_len(&response), r#"{"status":"ok"}"#.len());
    }
}
