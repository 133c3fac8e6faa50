use serde::{Deserialize, Serialize};

/// Everything the analysis service reports about one detected face.
///
/// `N` is the representation of every numeric leaf: `f32` as reported by the
/// service, or an exact decimal once normalized. Field names serialize in the
/// service's PascalCase shape so captured responses replay as fixtures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FaceAttributeSet<N = f32> {
    pub confidence: N,
    pub age_range: AgeRange<N>,
    pub emotions: Vec<Emotion<N>>,
    pub landmarks: Vec<Landmark<N>>,
    pub pose: Pose<N>,
    pub quality: Quality<N>,
    pub bounding_box: BoundingBox<N>,
    pub beard: AttributeFlag<bool, N>,
    pub eyeglasses: AttributeFlag<bool, N>,
    pub eyes_open: AttributeFlag<bool, N>,
    pub gender: AttributeFlag<String, N>,
    pub mouth_open: AttributeFlag<bool, N>,
    pub mustache: AttributeFlag<bool, N>,
    pub smile: AttributeFlag<bool, N>,
    pub sunglasses: AttributeFlag<bool, N>,
}

/// Estimated age bounds in years.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AgeRange<N = f32> {
    pub low: N,
    pub high: N,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Emotion<N = f32> {
    #[serde(rename = "Type")]
    pub label: String,
    pub confidence: N,
}

impl<N> Emotion<N> {
    pub fn new(label: impl Into<String>, confidence: N) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmark<N = f32> {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "X")]
    pub x: N,
    #[serde(rename = "Y")]
    pub y: N,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Pose<N = f32> {
    pub pitch: N,
    pub roll: N,
    pub yaw: N,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Quality<N = f32> {
    pub brightness: N,
    pub sharpness: N,
}

/// Box edges as ratios of the image's width and height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BoundingBox<N = f32> {
    pub top: N,
    pub left: N,
    pub width: N,
    pub height: N,
}

/// A detected trait and how sure the service is about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeFlag<V, N = f32> {
    pub value: V,
    pub confidence: N,
}

impl<V, N> AttributeFlag<V, N> {
    pub fn new(value: V, confidence: N) -> Self {
        Self { value, confidence }
    }
}
