//! Face analysis collaborator
//!
//! The delegating endpoints never run models themselves. They hand typed
//! arguments to a [`FaceAnalysisService`] and return whatever JSON it produces.
//! [`RemoteFaceAnalysis`] is the production implementation, forwarding each
//! call to an inference backend over HTTP.

pub mod distance;
mod remote;
pub mod thresholds;

pub use distance::{DistanceMetric, MetricError};
pub use remote::RemoteFaceAnalysis;
pub use thresholds::threshold_for;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_MODEL_NAME: &str = "VGG-Face";
pub const DEFAULT_DETECTOR_BACKEND: &str = "opencv";
pub const DEFAULT_DISTANCE_METRIC: &str = "cosine";
pub const DEFAULT_ACTIONS: [&str; 4] = ["age", "gender", "emotion", "race"];

/// Arguments for extracting embeddings from one image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepresentArgs {
    pub img_path: String,
    pub model_name: String,
    pub detector_backend: String,
    pub enforce_detection: bool,
    pub align: bool,
    pub anti_spoofing: bool,
    pub max_faces: Option<i64>,
}

/// Arguments for deciding whether two images show the same person
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyArgs {
    pub img1_path: String,
    pub img2_path: String,
    pub model_name: String,
    pub detector_backend: String,
    pub distance_metric: String,
    pub align: bool,
    pub enforce_detection: bool,
    pub anti_spoofing: bool,
}

/// Arguments for demographic analysis of one image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyzeArgs {
    pub img_path: String,
    pub actions: Vec<String>,
    pub detector_backend: String,
    pub enforce_detection: bool,
    pub align: bool,
    pub anti_spoofing: bool,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid service endpoint: {0}")]
    InvalidEndpoint(#[from] hyper::http::uri::InvalidUri),
    #[error("failed to build service request: {0}")]
    Request(#[from] hyper::http::Error),
    #[error("failed to encode arguments: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("service unreachable: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),
    #[error("service did not respond within {}s", .0.as_secs_f64())]
    Timeout(std::time::Duration),
    #[error("failed to read service response: {0}")]
    Body(#[from] hyper::Error),
    #[error("service responded {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("service returned invalid JSON: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Boundary to the component that actually runs detection and recognition.
///
/// Implementations return the operation result as an opaque JSON value; the
/// router passes it through to the caller untouched.
#[allow(async_fn_in_trait)]
pub trait FaceAnalysisService {
    async fn represent(&self, args: &RepresentArgs) -> Result<Value, ServiceError>;

    async fn verify(&self, args: &VerifyArgs) -> Result<Value, ServiceError>;

    async fn analyze(&self, args: &AnalyzeArgs) -> Result<Value, ServiceError>;
}
