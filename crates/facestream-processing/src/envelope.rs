use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// A batch of stream records as delivered by the invoking platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamBatch {
    #[serde(rename = "Records")]
    pub records: Vec<StreamRecord>,
}

impl StreamBatch {
    pub fn from_json(raw: &str) -> Result<Self, DecodeError> {
        serde_json::from_str(raw).map_err(DecodeError::Event)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamRecord {
    pub kinesis: StreamPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamPayload {
    /// Base64 of the JSON-encoded frame envelope.
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_key: Option<String>,
}

impl StreamRecord {
    pub fn new(envelope: &FrameEnvelope) -> Self {
        Self {
            kinesis: StreamPayload {
                data: envelope.encode_payload(),
                sequence_number: None,
                partition_key: None,
            },
        }
    }

    pub fn decode(&self) -> Result<FrameEnvelope, DecodeError> {
        FrameEnvelope::decode_payload(&self.kinesis.data)
    }
}

/// One captured frame and its capture metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameEnvelope {
    pub image_bytes: Bytes,
    /// Epoch seconds at which the producer grabbed the frame.
    pub approximate_capture_time: f64,
    pub frame_sequence_number: i64,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireEnvelope {
    image_bytes: String,
    approximate_capture_time: f64,
    frame_count: i64,
}

impl FrameEnvelope {
    pub fn decode_payload(data: &str) -> Result<Self, DecodeError> {
        let json = STANDARD.decode(data.trim()).map_err(DecodeError::Payload)?;
        let wire: WireEnvelope = serde_json::from_slice(&json).map_err(DecodeError::Envelope)?;
        let image = STANDARD
            .decode(wire.image_bytes)
            .map_err(DecodeError::ImageBytes)?;

        Ok(Self {
            image_bytes: Bytes::from(image),
            approximate_capture_time: wire.approximate_capture_time,
            frame_sequence_number: wire.frame_count,
        })
    }

    /// Producer-side inverse of [`FrameEnvelope::decode_payload`].
    pub fn encode_payload(&self) -> String {
        let wire = WireEnvelope {
            image_bytes: STANDARD.encode(&self.image_bytes),
            approximate_capture_time: self.approximate_capture_time,
            frame_count: self.frame_sequence_number,
        };
        // Serializing strings and numbers into a Vec cannot fail.
        let json = serde_json::to_vec(&wire).unwrap_or_default();
        STANDARD.encode(json)
    }
}
