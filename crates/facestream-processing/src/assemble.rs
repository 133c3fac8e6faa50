use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use facestream_analysis::FaceAttributeSet;
use facestream_repository::{FaceColumns, NormalizedFrameRecord};
use uuid::Uuid;

use crate::emotion::DominantEmotion;
use crate::envelope::FrameEnvelope;
use crate::error::NormalizationError;
use crate::localize::LocalizedTime;
use crate::normalize::exact_decimal;

/// Where the frame image lives in blob storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLocation {
    pub bucket: String,
    pub key: String,
}

/// Per-frame values shared by every record assembled for that frame.
#[derive(Debug, Clone)]
pub struct FrameContext<'a> {
    pub envelope: &'a FrameEnvelope,
    pub frame_id: Uuid,
    pub processed_at: DateTime<Utc>,
    pub localized_now: &'a LocalizedTime,
    pub face_count: usize,
    pub image: &'a ImageLocation,
}

/// A normalized face selected for persistence.
#[derive(Debug, Clone, Copy)]
pub struct SelectedFace<'a> {
    pub index: usize,
    pub attributes: &'a FaceAttributeSet<BigDecimal>,
    pub dominant: &'a DominantEmotion,
}

/// `<root>/YYYY/MM/DD/HH/<frame_id>.jpg`, partitioned by processing time.
pub fn image_storage_key(root: &str, localized_now: &LocalizedTime, frame_id: Uuid) -> String {
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        format!("{}/{frame_id}.jpg", localized_now.partition_path())
    } else {
        format!("{root}/{}/{frame_id}.jpg", localized_now.partition_path())
    }
}

/// Exact decimal epoch seconds with microsecond scale. Built from the clock's
/// integer microseconds so no float is involved.
pub fn epoch_decimal(at: DateTime<Utc>) -> BigDecimal {
    BigDecimal::new(at.timestamp_micros().into(), 6)
}

pub fn assemble(
    ctx: &FrameContext<'_>,
    face: Option<SelectedFace<'_>>,
) -> Result<NormalizedFrameRecord, NormalizationError> {
    let face_index = face.map(|selected| selected.index).unwrap_or(0);

    Ok(NormalizedFrameRecord {
        frame_id: ctx.frame_id,
        face_index: to_i32(face_index, "face_index")?,
        face_count: to_i32(ctx.face_count, "face_count")?,
        frame_sequence_number: ctx.envelope.frame_sequence_number,
        processed_timestamp: epoch_decimal(ctx.processed_at),
        approx_capture_timestamp: exact_decimal(
            &ctx.envelope.approximate_capture_time,
            "ApproximateCaptureTime",
        )?,
        processed_year_month: ctx.localized_now.year_month(),
        image_bucket: ctx.image.bucket.clone(),
        image_key: ctx.image.key.clone(),
        face: face.map(face_columns).transpose()?,
    })
}

fn face_columns(selected: SelectedFace<'_>) -> Result<FaceColumns, NormalizationError> {
    let face = selected.attributes;
    let dominant = selected.dominant;

    Ok(FaceColumns {
        age_range_low: face.age_range.low.clone(),
        age_range_high: face.age_range.high.clone(),
        face_confidence: face.confidence.clone(),
        emotion: dominant.label.clone(),
        emotion_confidence: exact_decimal(&dominant.confidence, "EmotionConfidence")?,
        anger_observed: dominant.anger_observed,
        bounding_box_height: face.bounding_box.height.clone(),
        bounding_box_left: face.bounding_box.left.clone(),
        bounding_box_top: face.bounding_box.top.clone(),
        bounding_box_width: face.bounding_box.width.clone(),
        pose_pitch: face.pose.pitch.clone(),
        pose_roll: face.pose.roll.clone(),
        pose_yaw: face.pose.yaw.clone(),
        quality_brightness: face.quality.brightness.clone(),
        quality_sharpness: face.quality.sharpness.clone(),
        beard_value: face.beard.value,
        beard_confidence: face.beard.confidence.clone(),
        eyeglasses_value: face.eyeglasses.value,
        eyeglasses_confidence: face.eyeglasses.confidence.clone(),
        eyes_open_value: face.eyes_open.value,
        eyes_open_confidence: face.eyes_open.confidence.clone(),
        gender_value: face.gender.value.clone(),
        gender_confidence: face.gender.confidence.clone(),
        mouth_open_value: face.mouth_open.value,
        mouth_open_confidence: face.mouth_open.confidence.clone(),
        mustache_value: face.mustache.value,
        mustache_confidence: face.mustache.confidence.clone(),
        smile_value: face.smile.value,
        smile_confidence: face.smile.confidence.clone(),
        sunglasses_value: face.sunglasses.value,
        sunglasses_confidence: face.sunglasses.confidence.clone(),
        emotions: serde_json::to_value(&face.emotions).map_err(|source| {
            NormalizationError::Serialize {
                field: "Emotions",
                source,
            }
        })?,
        landmarks: serde_json::to_value(&face.landmarks).map_err(|source| {
            NormalizationError::Serialize {
                field: "Landmarks",
                source,
            }
        })?,
    })
}

fn to_i32(value: usize, field: &'static str) -> Result<i32, NormalizationError> {
    i32::try_from(value).map_err(|_| NormalizationError::OutOfRange {
        field,
        value: value.to_string(),
    })
}
