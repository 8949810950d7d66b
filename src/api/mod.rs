// API module entry
// Face analysis endpoints: represent, verify, verify-embeddings, analyze

mod error;
mod handlers;
mod requests;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Response, StatusCode};
use serde_json::Value;

use crate::config::ApiConfig;
use crate::face::FaceAnalysisService;
use crate::http::{build_404_response, build_405_response, build_json_response};
use crate::logger::Logger;

pub use error::ApiError;

const ENDPOINTS: &[&str] = &["/", "/represent", "/verify", "/verify-embeddings", "/analyze"];

/// Router for the face endpoints.
///
/// Holds no per-request state; the service and logger are shared by every
/// request for the lifetime of the process.
pub struct FaceApi<S> {
    service: S,
    logger: Logger,
    detailed_embedding_verification: bool,
}

impl<S: FaceAnalysisService> FaceApi<S> {
    pub fn new(service: S, logger: Logger, settings: &ApiConfig) -> Self {
        Self {
            service,
            logger,
            detailed_embedding_verification: settings.detailed_embedding_verification,
        }
    }

    pub const fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Dispatches to handler functions based on request path and method
    pub async fn dispatch(&self, method: &Method, path: &str, body: &[u8]) -> Response<Full<Bytes>> {
        match (method, path) {
            (&Method::GET, "/") => handlers::home(false),
            (&Method::HEAD, "/") => handlers::home(true),
            (&Method::POST, "/represent") => respond("represent", self.represent(body).await),
            (&Method::POST, "/verify") => respond("verify", self.verify(body).await),
            (&Method::POST, "/verify-embeddings") => {
                respond("verify-embeddings", self.verify_embeddings(body))
            }
            (&Method::POST, "/analyze") => respond("analyze", self.analyze(body).await),
            (_, "/") => build_405_response("GET, HEAD, OPTIONS"),
            (_, p) if ENDPOINTS.contains(&p) => build_405_response("POST, OPTIONS"),
            _ => build_404_response(ENDPOINTS),
        }
    }
}

fn respond(operation: &str, result: Result<Value, ApiError>) -> Response<Full<Bytes>> {
    match result {
        Ok(value) => build_json_response(StatusCode::OK, &value),
        Err(e) => e.to_response(operation),
    }
}
