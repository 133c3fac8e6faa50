use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_rekognition::config::Region;
use aws_sdk_rekognition::primitives::Blob;
use aws_sdk_rekognition::types::{Attribute, FaceDetail, Image};
use aws_sdk_rekognition::Client;
use tracing::debug;

use crate::model::{
    AgeRange, AttributeFlag, BoundingBox, Emotion, FaceAttributeSet, Landmark, Pose, Quality,
};
use crate::{AnalysisError, FaceAnalyzer};

#[derive(Debug, Clone)]
pub struct RekognitionConfig {
    pub region: String,
    pub endpoint: Option<String>,
}

impl Default for RekognitionConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint: None,
        }
    }
}

#[derive(Clone)]
pub struct RekognitionAnalyzer {
    client: Client,
}

impl RekognitionAnalyzer {
    pub async fn new(config: RekognitionConfig) -> Result<Self, AnalysisError> {
        if config.region.is_empty() {
            return Err(AnalysisError::Configuration(
                "region cannot be empty".into(),
            ));
        }

        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;
        let mut builder = aws_sdk_rekognition::config::Builder::from(&shared_config);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
        })
    }
}

#[async_trait]
impl FaceAnalyzer for RekognitionAnalyzer {
    async fn detect_faces(&self, image: &[u8]) -> Result<Vec<FaceAttributeSet>, AnalysisError> {
        let output = self
            .client
            .detect_faces()
            .image(Image::builder().bytes(Blob::new(image)).build())
            .attributes(Attribute::All)
            .send()
            .await
            .map_err(AnalysisError::from_sdk)?;

        let details = output.face_details();
        debug!(faces = details.len(), "rekognition returned face details");
        details.iter().map(convert_face_detail).collect()
    }
}

fn convert_face_detail(detail: &FaceDetail) -> Result<FaceAttributeSet, AnalysisError> {
    let age_range = detail
        .age_range()
        .ok_or(AnalysisError::MissingField("AgeRange"))?;
    let pose = detail.pose().ok_or(AnalysisError::MissingField("Pose"))?;
    let quality = detail
        .quality()
        .ok_or(AnalysisError::MissingField("Quality"))?;
    let bounding_box = detail
        .bounding_box()
        .ok_or(AnalysisError::MissingField("BoundingBox"))?;

    let emotions = detail
        .emotions()
        .iter()
        .map(|emotion| -> Result<_, AnalysisError> {
            let label = emotion
                .r#type()
                .ok_or(AnalysisError::MissingField("Emotions.Type"))?;
            Ok(Emotion::new(
                label.as_str(),
                required::<f32>(emotion.confidence(), "Emotions.Confidence")?,
            ))
        })
        .collect::<Result<Vec<_>, AnalysisError>>()?;

    let landmarks = detail
        .landmarks()
        .iter()
        .map(|landmark| -> Result<_, AnalysisError> {
            Ok(Landmark {
                kind: landmark
                    .r#type()
                    .map(|kind| kind.as_str().to_string())
                    .unwrap_or_default(),
                x: required::<f32>(landmark.x(), "Landmarks.X")?,
                y: required::<f32>(landmark.y(), "Landmarks.Y")?,
            })
        })
        .collect::<Result<Vec<_>, AnalysisError>>()?;

    let gender = detail.gender().ok_or(AnalysisError::MissingField("Gender"))?;
    let gender = AttributeFlag::new(
        gender
            .value()
            .map(|value| value.as_str().to_string())
            .ok_or(AnalysisError::MissingField("Gender.Value"))?,
        required::<f32>(gender.confidence(), "Gender.Confidence")?,
    );

    macro_rules! flag {
        ($accessor:ident, $name:literal) => {{
            let group = detail
                .$accessor()
                .ok_or(AnalysisError::MissingField($name))?;
            AttributeFlag::new(
                required::<bool>(group.value(), concat!($name, ".Value"))?,
                required::<f32>(group.confidence(), concat!($name, ".Confidence"))?,
            )
        }};
    }

    Ok(FaceAttributeSet {
        confidence: required::<f32>(detail.confidence(), "Confidence")?,
        age_range: AgeRange {
            low: required::<i32>(age_range.low(), "AgeRange.Low")? as f32,
            high: required::<i32>(age_range.high(), "AgeRange.High")? as f32,
        },
        emotions,
        landmarks,
        pose: Pose {
            pitch: required::<f32>(pose.pitch(), "Pose.Pitch")?,
            roll: required::<f32>(pose.roll(), "Pose.Roll")?,
            yaw: required::<f32>(pose.yaw(), "Pose.Yaw")?,
        },
        quality: Quality {
            brightness: required::<f32>(quality.brightness(), "Quality.Brightness")?,
            sharpness: required::<f32>(quality.sharpness(), "Quality.Sharpness")?,
        },
        bounding_box: BoundingBox {
            top: required::<f32>(bounding_box.top(), "BoundingBox.Top")?,
            left: required::<f32>(bounding_box.left(), "BoundingBox.Left")?,
            width: required::<f32>(bounding_box.width(), "BoundingBox.Width")?,
            height: required::<f32>(bounding_box.height(), "BoundingBox.Height")?,
        },
        beard: flag!(beard, "Beard"),
        eyeglasses: flag!(eyeglasses, "Eyeglasses"),
        eyes_open: flag!(eyes_open, "EyesOpen"),
        gender,
        mouth_open: flag!(mouth_open, "MouthOpen"),
        mustache: flag!(mustache, "Mustache"),
        smile: flag!(smile, "Smile"),
        sunglasses: flag!(sunglasses, "Sunglasses"),
    })
}

// SDK accessors return either a bare primitive or an `Option` depending on the
// member's modelled default; `Into<Option<T>>` accepts both.
fn required<T>(value: impl Into<Option<T>>, field: &'static str) -> Result<T, AnalysisError> {
    value.into().ok_or(AnalysisError::MissingField(field))
}

#[cfg(test)]
mod tests {
    use aws_sdk_rekognition::types as sdk;

    use super::*;

    fn detail_without_gender() -> sdk::builders::FaceDetailBuilder {
        sdk::FaceDetail::builder()
            .confidence(99.9)
            .age_range(sdk::AgeRange::builder().low(26).high(38).build())
            .emotions(
                sdk::Emotion::builder()
                    .r#type(sdk::EmotionName::Calm)
                    .confidence(60.0)
                    .build(),
            )
            .emotions(
                sdk::Emotion::builder()
                    .r#type(sdk::EmotionName::Surprised)
                    .confidence(60.0)
                    .build(),
            )
            .emotions(
                sdk::Emotion::builder()
                    .r#type(sdk::EmotionName::Angry)
                    .confidence(0.1)
                    .build(),
            )
            .landmarks(
                sdk::Landmark::builder()
                    .r#type(sdk::LandmarkType::EyeLeft)
                    .x(0.41)
                    .y(0.37)
                    .build(),
            )
            .landmarks(
                sdk::Landmark::builder()
                    .r#type(sdk::LandmarkType::Nose)
                    .x(0.47)
                    .y(0.45)
                    .build(),
            )
            .pose(sdk::Pose::builder().pitch(-4.5).roll(1.25).yaw(12.0).build())
            .quality(
                sdk::ImageQuality::builder()
                    .brightness(81.3)
                    .sharpness(92.2)
                    .build(),
            )
            .bounding_box(
                sdk::BoundingBox::builder()
                    .top(0.2)
                    .left(0.35)
                    .width(0.25)
                    .height(0.4)
                    .build(),
            )
            .beard(sdk::Beard::builder().value(false).confidence(97.5).build())
            .eyeglasses(sdk::Eyeglasses::builder().value(true).confidence(88.0).build())
            .eyes_open(sdk::EyeOpen::builder().value(true).confidence(99.1).build())
            .mouth_open(sdk::MouthOpen::builder().value(false).confidence(90.2).build())
            .mustache(sdk::Mustache::builder().value(false).confidence(98.7).build())
            .smile(sdk::Smile::builder().value(true).confidence(75.0).build())
            .sunglasses(sdk::Sunglasses::builder().value(false).confidence(99.6).build())
    }

    fn full_detail() -> sdk::FaceDetail {
        detail_without_gender()
            .gender(
                sdk::Gender::builder()
                    .value(sdk::GenderType::Female)
                    .confidence(95.4)
                    .build(),
            )
            .build()
    }

    #[test]
    fn face_detail_maps_every_group() {
        let face = convert_face_detail(&full_detail()).expect("complete detail");

        assert_eq!(face.confidence, 99.9);
        assert_eq!(face.age_range, AgeRange { low: 26.0, high: 38.0 });

        let emotions: Vec<(&str, f32)> = face
            .emotions
            .iter()
            .map(|e| (e.label.as_str(), e.confidence))
            .collect();
        assert_eq!(emotions, [("CALM", 60.0), ("SURPRISED", 60.0), ("ANGRY", 0.1)]);

        assert_eq!(face.landmarks.len(), 2);
        assert_eq!(face.landmarks[0].kind, "eyeLeft");
        assert_eq!((face.landmarks[0].x, face.landmarks[0].y), (0.41, 0.37));
        assert_eq!(face.landmarks[1].kind, "nose");

        assert_eq!(face.pose, Pose { pitch: -4.5, roll: 1.25, yaw: 12.0 });
        assert_eq!(face.quality, Quality { brightness: 81.3, sharpness: 92.2 });
        assert_eq!(
            face.bounding_box,
            BoundingBox { top: 0.2, left: 0.35, width: 0.25, height: 0.4 }
        );

        assert_eq!(face.gender, AttributeFlag::new("Female".to_string(), 95.4));
        assert_eq!(face.beard, AttributeFlag::new(false, 97.5));
        assert_eq!(face.eyeglasses, AttributeFlag::new(true, 88.0));
        assert_eq!(face.eyes_open, AttributeFlag::new(true, 99.1));
        assert_eq!(face.mouth_open, AttributeFlag::new(false, 90.2));
        assert_eq!(face.mustache, AttributeFlag::new(false, 98.7));
        assert_eq!(face.smile, AttributeFlag::new(true, 75.0));
        assert_eq!(face.sunglasses, AttributeFlag::new(false, 99.6));
    }

    #[test]
    fn missing_gender_group_is_reported() {
        let detail = detail_without_gender().build();
        let err = convert_face_detail(&detail).expect_err("gender is required");
        assert!(matches!(err, AnalysisError::MissingField("Gender")));
    }

    #[test]
    fn missing_gender_value_is_reported() {
        let detail = detail_without_gender()
            .gender(sdk::Gender::builder().confidence(50.0).build())
            .build();
        let err = convert_face_detail(&detail).expect_err("gender value is required");
        assert!(matches!(err, AnalysisError::MissingField("Gender.Value")));
    }

    #[test]
    fn missing_pose_angle_is_reported() {
        let detail = detail_without_gender()
            .pose(sdk::Pose::builder().pitch(1.0).roll(2.0).build())
            .gender(
                sdk::Gender::builder()
                    .value(sdk::GenderType::Male)
                    .confidence(80.0)
                    .build(),
            )
            .build();
        let err = convert_face_detail(&detail).expect_err("yaw is required");
        assert!(matches!(err, AnalysisError::MissingField("Pose.Yaw")));
    }
}
