//! Conversion of analysis output into exact decimals for storage.
//!
//! Floats are converted through their shortest round-trip string form rather
//! than their binary expansion, so `0.1f32` becomes exactly `0.1`.

use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use facestream_analysis::{
    AgeRange, AttributeFlag, BoundingBox, Emotion, FaceAttributeSet, Landmark, Pose, Quality,
};

use crate::error::NormalizationError;

/// A numeric leaf that can be stored without binary floating-point rounding.
pub trait ToExactDecimal: fmt::Display {
    /// `None` for values with no decimal form (NaN, infinities).
    fn to_exact_decimal(&self) -> Option<BigDecimal>;
}

impl ToExactDecimal for f32 {
    fn to_exact_decimal(&self) -> Option<BigDecimal> {
        if !self.is_finite() {
            return None;
        }
        BigDecimal::from_str(&self.to_string()).ok()
    }
}

impl ToExactDecimal for f64 {
    fn to_exact_decimal(&self) -> Option<BigDecimal> {
        if !self.is_finite() {
            return None;
        }
        BigDecimal::from_str(&self.to_string()).ok()
    }
}

impl ToExactDecimal for BigDecimal {
    fn to_exact_decimal(&self) -> Option<BigDecimal> {
        Some(self.clone())
    }
}

pub fn exact_decimal<N: ToExactDecimal + ?Sized>(
    value: &N,
    field: impl Into<String>,
) -> Result<BigDecimal, NormalizationError> {
    value
        .to_exact_decimal()
        .ok_or_else(|| NormalizationError::NonFinite {
            field: field.into(),
            value: value.to_string(),
        })
}

/// Returns a copy of `face` with every numeric leaf as an exact decimal.
/// Labels and boolean values are carried over untouched. Normalizing an
/// already-normalized set returns an equal set.
pub fn normalize<N: ToExactDecimal>(
    face: &FaceAttributeSet<N>,
) -> Result<FaceAttributeSet<BigDecimal>, NormalizationError> {
    let emotions = face
        .emotions
        .iter()
        .enumerate()
        .map(|(i, emotion)| -> Result<_, NormalizationError> {
            Ok(Emotion {
                label: emotion.label.clone(),
                confidence: exact_decimal(&emotion.confidence, format!("Emotions[{i}].Confidence"))?,
            })
        })
        .collect::<Result<Vec<_>, NormalizationError>>()?;

    let landmarks = face
        .landmarks
        .iter()
        .enumerate()
        .map(|(i, landmark)| -> Result<_, NormalizationError> {
            Ok(Landmark {
                kind: landmark.kind.clone(),
                x: exact_decimal(&landmark.x, format!("Landmarks[{i}].X"))?,
                y: exact_decimal(&landmark.y, format!("Landmarks[{i}].Y"))?,
            })
        })
        .collect::<Result<Vec<_>, NormalizationError>>()?;

    Ok(FaceAttributeSet {
        confidence: exact_decimal(&face.confidence, "Confidence")?,
        age_range: AgeRange {
            low: exact_decimal(&face.age_range.low, "AgeRange.Low")?,
            high: exact_decimal(&face.age_range.high, "AgeRange.High")?,
        },
        emotions,
        landmarks,
        pose: Pose {
            pitch: exact_decimal(&face.pose.pitch, "Pose.Pitch")?,
            roll: exact_decimal(&face.pose.roll, "Pose.Roll")?,
            yaw: exact_decimal(&face.pose.yaw, "Pose.Yaw")?,
        },
        quality: Quality {
            brightness: exact_decimal(&face.quality.brightness, "Quality.Brightness")?,
            sharpness: exact_decimal(&face.quality.sharpness, "Quality.Sharpness")?,
        },
        bounding_box: BoundingBox {
            top: exact_decimal(&face.bounding_box.top, "BoundingBox.Top")?,
            left: exact_decimal(&face.bounding_box.left, "BoundingBox.Left")?,
            width: exact_decimal(&face.bounding_box.width, "BoundingBox.Width")?,
            height: exact_decimal(&face.bounding_box.height, "BoundingBox.Height")?,
        },
        beard: normalize_flag(&face.beard, "Beard")?,
        eyeglasses: normalize_flag(&face.eyeglasses, "Eyeglasses")?,
        eyes_open: normalize_flag(&face.eyes_open, "EyesOpen")?,
        gender: normalize_flag(&face.gender, "Gender")?,
        mouth_open: normalize_flag(&face.mouth_open, "MouthOpen")?,
        mustache: normalize_flag(&face.mustache, "Mustache")?,
        smile: normalize_flag(&face.smile, "Smile")?,
        sunglasses: normalize_flag(&face.sunglasses, "Sunglasses")?,
    })
}

fn normalize_flag<V: Clone, N: ToExactDecimal>(
    flag: &AttributeFlag<V, N>,
    group: &str,
) -> Result<AttributeFlag<V, BigDecimal>, NormalizationError> {
    Ok(AttributeFlag {
        value: flag.value.clone(),
        confidence: exact_decimal(&flag.confidence, format!("{group}.Confidence"))?,
    })
}
