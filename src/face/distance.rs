//! Distance metrics between face embeddings
//!
//! Three metrics are supported, matching the names accepted on the wire:
//! `cosine`, `euclidean` and `euclidean_l2`.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricError {
    #[error("Invalid distance_metric passed - {0}")]
    UnknownMetric(String),
    #[error("embeddings have different dimensions: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
    #[error("embedding has zero magnitude, {0} distance is undefined")]
    ZeroMagnitude(DistanceMetric),
}

/// Metric used to compare two embeddings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMetric {
    Cosine,
    Euclidean,
    EuclideanL2,
}

impl DistanceMetric {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
            Self::EuclideanL2 => "euclidean_l2",
        }
    }

    /// Distance between `a` and `b` under this metric
    pub fn distance(self, a: &[f64], b: &[f64]) -> Result<f64, MetricError> {
        if a.len() != b.len() {
            return Err(MetricError::DimensionMismatch {
                left: a.len(),
                right: b.len(),
            });
        }

        match self {
            Self::Cosine => cosine_distance(a, b).ok_or(MetricError::ZeroMagnitude(self)),
            Self::Euclidean => Ok(euclidean_distance(a, b)),
            Self::EuclideanL2 => {
                let a = l2_normalize(a).ok_or(MetricError::ZeroMagnitude(self))?;
                let b = l2_normalize(b).ok_or(MetricError::ZeroMagnitude(self))?;
                Ok(euclidean_distance(&a, &b))
            }
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cosine" => Ok(Self::Cosine),
            "euclidean" => Ok(Self::Euclidean),
            "euclidean_l2" => Ok(Self::EuclideanL2),
            other => Err(MetricError::UnknownMetric(other.to_string())),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// `1 - cos(a, b)`. `None` when either vector has zero magnitude.
pub fn cosine_distance(a: &[f64], b: &[f64]) -> Option<f64> {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let denom = norm(a) * norm(b);
    if denom > 0.0 {
        Some(1.0 - dot / denom)
    } else {
        None
    }
}

pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Scale `v` to unit length. `None` for the zero vector.
pub fn l2_normalize(v: &[f64]) -> Option<Vec<f64>> {
    let n = norm(v);
    if n > 0.0 {
        Some(v.iter().map(|x| x / n).collect())
    } else {
        None
    }
}
