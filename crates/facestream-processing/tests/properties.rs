mod common;

use anyhow::Result;
use bytes::Bytes;
use chrono_tz::Tz;
use common::fixture_faces;
use facestream_analysis::Emotion;
use facestream_processing::{
    localize, localize_in, normalize, select_dominant, FrameEnvelope, ProcessingError,
    StreamBatch, UNKNOWN_EMOTION,
};

#[test]
fn equal_maxima_resolve_to_the_last_candidate() {
    let dominant = select_dominant(&[
        Emotion::new("CALM", 60.0),
        Emotion::new("SURPRISED", 60.0),
        Emotion::new("HAPPY", 10.0),
    ]);
    assert_eq!(dominant.label, "SURPRISED");
    assert_eq!(dominant.confidence, 60.0);
}

#[test]
fn no_emotions_selects_unknown() {
    let dominant = select_dominant(&[]);
    assert_eq!(dominant.label, UNKNOWN_EMOTION);
    assert_eq!(dominant.confidence, 0.0);
    assert!(!dominant.anger_observed);
    assert_eq!(dominant.anger_position, None);
}

#[test]
fn anger_flag_tracks_the_selected_label() {
    let angry = select_dominant(&[Emotion::new("CALM", 10.0), Emotion::new("ANGRY", 55.0)]);
    assert!(angry.anger_observed);
    assert_eq!(angry.anger_position, Some(2));

    let overtaken = select_dominant(&[Emotion::new("ANGRY", 55.0), Emotion::new("CALM", 70.0)]);
    assert_eq!(overtaken.label, "CALM");
    assert!(!overtaken.anger_observed);

    let low_anger = select_dominant(&[Emotion::new("HAPPY", 70.0), Emotion::new("DISGUSTED", 5.0)]);
    assert!(!low_anger.anger_observed);
}

#[test]
fn normalization_preserves_shortest_decimal_text() -> Result<()> {
    let face = &fixture_faces()[0];
    let normalized = normalize(face)?;

    assert_eq!(normalized.emotions[2].confidence.to_string(), "0.1");
    assert_eq!(normalized.emotions[0].confidence.to_string(), "60");
    assert_eq!(normalized.landmarks[1].x.to_string(), "0.52");
    assert_eq!(normalized.pose.roll.to_string(), "1.25");
    assert_eq!(normalized.gender.value, "Female");
    assert!(normalized.eyes_open.value);
    assert_eq!(normalized.emotions[1].label, face.emotions[1].label);
    Ok(())
}

#[test]
fn normalization_is_idempotent() -> Result<()> {
    let once = normalize(&fixture_faces()[0])?;
    let twice = normalize(&once)?;
    assert_eq!(once, twice);
    Ok(())
}

#[test]
fn localization_partitions_by_local_hour() -> Result<()> {
    let utc = localize(1_680_703_200.0, "UTC")?;
    assert_eq!(utc.partition_path(), "2023/04/05/14");
    assert_eq!(utc.year_month(), "202304");

    let pacific = localize(1_680_728_400.0, "America/Los_Angeles")?;
    assert_eq!(pacific.partition_path(), "2023/04/05/14");

    let fractional = localize_in(1_680_000_000.75, Tz::UTC)?;
    assert_eq!(fractional.partition_path(), "2023/03/28/10");
    Ok(())
}

#[test]
fn unknown_zone_is_a_configuration_error() {
    let err = localize(1_680_703_200.0, "Mars/Olympus_Mons").expect_err("zone does not exist");
    assert!(matches!(err, ProcessingError::Configuration(_)));
}

#[test]
fn stream_event_decodes_into_frames() -> Result<()> {
    let frame = FrameEnvelope {
        image_bytes: Bytes::from_static(&[0xff, 0xd8, 0x00, 0x10]),
        approximate_capture_time: 1_680_000_000.25,
        frame_sequence_number: 42,
    };
    let event = serde_json::json!({
        "Records": [{
            "kinesis": {
                "data": frame.encode_payload(),
                "sequenceNumber": "1",
                "partitionKey": "camera-1"
            }
        }]
    });

    let batch = StreamBatch::from_json(&event.to_string())?;
    assert_eq!(batch.len(), 1);
    assert_eq!(batch.records[0].kinesis.partition_key.as_deref(), Some("camera-1"));
    assert_eq!(batch.records[0].decode()?, frame);
    Ok(())
}

#[test]
fn envelope_reads_producer_field_names() -> Result<()> {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;

    let inner = serde_json::json!({
        "ImageBytes": STANDARD.encode(b"jpeg"),
        "ApproximateCaptureTime": 1680000000.0,
        "FrameCount": 7
    });
    let data = STANDARD.encode(inner.to_string());

    let frame = FrameEnvelope::decode_payload(&data)?;
    assert_eq!(frame.image_bytes.as_ref(), b"jpeg");
    assert_eq!(frame.frame_sequence_number, 7);
    assert_eq!(frame.approximate_capture_time, 1_680_000_000.0);
    Ok(())
}

#[test]
fn envelope_missing_image_is_rejected() {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;

    let data = STANDARD.encode(r#"{"ApproximateCaptureTime":1.0,"FrameCount":1}"#);
    assert!(FrameEnvelope::decode_payload(&data).is_err());
}
