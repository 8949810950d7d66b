// Face endpoint handlers
// Decode, validate, delegate, log. Results pass through unmodified.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use serde_json::Value;
use std::time::Instant;

use super::error::ApiError;
use super::requests::{
    decode_body, AnalyzeRequest, MissingInput, RepresentRequest, VerifyEmbeddingsRequest,
    VerifyRequest,
};
use super::FaceApi;
use crate::face::{threshold_for, DistanceMetric, FaceAnalysisService};
use crate::http::build_html_response;

/// Welcome page with the server version
pub fn home(is_head: bool) -> Response<Full<Bytes>> {
    build_html_response(
        format!(
            "<h1>Welcome to Face Analysis API v{}!</h1>",
            env!("CARGO_PKG_VERSION")
        ),
        is_head,
    )
}

/// Decode `body` as `T`, treating an absent body as missing input
fn require_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    Ok(decode_body::<T>(body)?.ok_or(MissingInput::EmptyBody)?)
}

fn round_to_centis(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}

impl<S: FaceAnalysisService> FaceApi<S> {
    pub(super) async fn represent(&self, body: &[u8]) -> Result<Value, ApiError> {
        let args = require_body::<RepresentRequest>(body)?.into_args()?;
        let result = self.service.represent(&args).await?;
        self.logger.debug_result("represent", &result);
        Ok(result)
    }

    pub(super) async fn verify(&self, body: &[u8]) -> Result<Value, ApiError> {
        let args = require_body::<VerifyRequest>(body)?.into_args()?;
        let result = self.service.verify(&args).await?;
        self.logger.debug_result("verify", &result);
        Ok(result)
    }

    pub(super) async fn analyze(&self, body: &[u8]) -> Result<Value, ApiError> {
        let args = require_body::<AnalyzeRequest>(body)?.into_args()?;
        let result = self.service.analyze(&args).await?;
        self.logger.debug_result("analyze", &result);
        Ok(result)
    }

    /// Compare two caller-supplied embeddings without touching the service.
    ///
    /// The full comparison is computed and logged, but unless detailed
    /// output is enabled the caller only receives `{"success": true}`.
    pub(super) fn verify_embeddings(&self, body: &[u8]) -> Result<Value, ApiError> {
        let pair = require_body::<VerifyEmbeddingsRequest>(body)?.into_pair()?;

        let started = Instant::now();
        let metric: DistanceMetric = pair.distance_metric.parse()?;
        let distance = metric.distance(&pair.embedding1, &pair.embedding2)?;
        let threshold = threshold_for(&pair.model_name, metric.as_str());
        let elapsed = started.elapsed().as_secs_f64();

        let verification = serde_json::json!({
            "verified": distance <= threshold,
            "distance": distance,
            "threshold": threshold,
            "model": pair.model_name,
            "similarity_metric": pair.distance_metric,
            "time": round_to_centis(elapsed),
        });
        self.logger.debug_result("verify-embeddings", &verification);

        if self.detailed_embedding_verification {
            return Ok(verification);
        }

        let success = verification.as_object().is_some_and(|fields| !fields.is_empty());
        Ok(serde_json::json!({ "success": success }))
    }
}
