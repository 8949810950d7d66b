// Remote face analysis client
// Forwards each operation as a JSON POST to the inference backend

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{ACCEPT, CONTENT_TYPE};
use hyper::{Method, Request, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::{AnalyzeArgs, FaceAnalysisService, RepresentArgs, ServiceError, VerifyArgs};

/// Body text kept from a rejected response
const MAX_ERROR_BODY: usize = 512;

/// HTTP client for an inference backend exposing `/represent`, `/verify`
/// and `/analyze`.
pub struct RemoteFaceAnalysis {
    client: Client<HttpConnector, Full<Bytes>>,
    base_url: String,
    timeout: Duration,
}

impl RemoteFaceAnalysis {
    /// `timeout` bounds each call from connect until the whole response
    /// body has arrived.
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            client: Client::builder(TokioExecutor::new()).build_http(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn endpoint(&self, operation: &str) -> Result<Uri, ServiceError> {
        Ok(format!("{}/{operation}", self.base_url).parse::<Uri>()?)
    }

    async fn call<T: Serialize>(&self, operation: &str, args: &T) -> Result<Value, ServiceError> {
        let payload = serde_json::to_vec(args).map_err(ServiceError::Encode)?;

        let request = Request::builder()
            .method(Method::POST)
            .uri(self.endpoint(operation)?)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(Full::new(Bytes::from(payload)))?;

        tracing::trace!(operation, base_url = %self.base_url, "forwarding to face analysis backend");

        let exchange = async {
            let response = self.client.request(request).await?;
            let status = response.status();
            let body = response.into_body().collect().await?.to_bytes();
            Ok::<_, ServiceError>((status, body))
        };
        let (status, body) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| ServiceError::Timeout(self.timeout))??;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            return Err(ServiceError::Rejected {
                status: status.as_u16(),
                body: truncate(&text, MAX_ERROR_BODY).to_string(),
            });
        }

        serde_json::from_slice(&body).map_err(ServiceError::Decode)
    }
}

impl FaceAnalysisService for RemoteFaceAnalysis {
    async fn represent(&self, args: &RepresentArgs) -> Result<Value, ServiceError> {
        self.call("represent", args).await
    }

    async fn verify(&self, args: &VerifyArgs) -> Result<Value, ServiceError> {
        self.call("verify", args).await
    }

    async fn analyze(&self, args: &AnalyzeArgs) -> Result<Value, ServiceError> {
        self.call("analyze", args).await
    }
}

/// Cut `s` to at most `max` bytes on a char boundary
fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
