//! Face analysis: the attribute model reported per detected face and the
//! service boundary that produces it.

mod model;
mod rekognition;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

pub use model::{
    AgeRange, AttributeFlag, BoundingBox, Emotion, FaceAttributeSet, Landmark, Pose, Quality,
};
pub use rekognition::{RekognitionAnalyzer, RekognitionConfig};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("sdk error: {0}")]
    Sdk(String),
    #[error("analysis response missing field {0}")]
    MissingField(&'static str),
}

impl AnalysisError {
    fn from_sdk(err: impl fmt::Display) -> Self {
        Self::Sdk(err.to_string())
    }
}

/// Detects faces in an encoded image and reports the full attribute set for
/// each one, in the order the service returns them. An image with no faces
/// yields an empty list.
#[async_trait]
pub trait FaceAnalyzer: Send + Sync {
    async fn detect_faces(&self, image: &[u8]) -> Result<Vec<FaceAttributeSet>, AnalysisError>;
}
