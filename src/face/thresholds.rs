//! Verification cutoffs per recognition model and distance metric
//!
//! Two faces are considered the same person when their distance is at most
//! the threshold for the model that produced the embeddings.

/// Cutoffs for one model
struct ModelThresholds {
    model: &'static str,
    cosine: f64,
    euclidean: f64,
    euclidean_l2: f64,
}

const fn entry(model: &'static str, cosine: f64, euclidean: f64, euclidean_l2: f64) -> ModelThresholds {
    ModelThresholds {
        model,
        cosine,
        euclidean,
        euclidean_l2,
    }
}

/// Used for models missing from the table
const BASE: ModelThresholds = entry("", 0.40, 0.55, 0.75);

/// Used for metrics missing from the table
const FALLBACK: f64 = 0.40;

const TABLE: &[ModelThresholds] = &[
    entry("VGG-Face", 0.68, 1.17, 1.17),
    entry("Facenet", 0.40, 10.0, 0.80),
    entry("Facenet512", 0.30, 23.56, 1.04),
    entry("ArcFace", 0.68, 4.15, 1.13),
    entry("Dlib", 0.07, 0.6, 0.4),
    entry("SFace", 0.593, 10.734, 1.055),
    entry("OpenFace", 0.10, 0.55, 0.55),
    entry("DeepFace", 0.23, 64.0, 0.64),
    entry("DeepID", 0.015, 45.0, 0.17),
    entry("GhostFaceNet", 0.65, 35.71, 1.10),
];

/// Look up the decision threshold for `model_name` under `distance_metric`
pub fn threshold_for(model_name: &str, distance_metric: &str) -> f64 {
    let row = TABLE
        .iter()
        .find(|t| t.model == model_name)
        .unwrap_or(&BASE);

    match distance_metric {
        "cosine" => row.cosine,
        "euclidean" => row.euclidean,
        "euclidean_l2" => row.euclidean_l2,
        _ => FALLBACK,
    }
}
