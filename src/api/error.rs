// API error module
// Maps every failure of a face endpoint onto its HTTP representation

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use thiserror::Error;

use super::requests::MissingInput;
use crate::face::{MetricError, ServiceError};
use crate::http::{build_error_response, build_json_response};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    MissingInput(#[from] MissingInput),
    #[error("malformed request body: {0}")]
    MalformedBody(#[from] serde_json::Error),
    #[error(transparent)]
    InvalidArgument(#[from] MetricError),
    #[error(transparent)]
    Upstream(#[from] ServiceError),
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingInput(_) => StatusCode::OK,
            Self::MalformedBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidArgument(_) | Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Missing input is a regular `{"message"}` body; the rest are faults
    /// rendered as `{"error"}`.
    pub fn to_response(&self, operation: &str) -> Response<Full<Bytes>> {
        let status = self.status();
        if let Self::MissingInput(missing) = self {
            return build_json_response(
                status,
                &serde_json::json!({ "message": missing.to_string() }),
            );
        }

        if status.is_server_error() {
            tracing::error!(operation, "{self}");
        } else {
            tracing::warn!(operation, "rejected request: {self}");
        }
        build_error_response(status, &self.to_string())
    }
}
