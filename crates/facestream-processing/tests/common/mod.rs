#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use facestream_analysis::{AnalysisError, Emotion, FaceAnalyzer, FaceAttributeSet};
use facestream_bucket::{BucketError, BucketStore};
use facestream_processing::{
    FacePolicy, FrameEnvelope, FrameIngestHandler, HandlerSettings,
};
use facestream_repository::{FrameRecordRepository, NormalizedFrameRecord, RepositoryError};
use uuid::Uuid;

pub const TEST_BUCKET: &str = "frames-test";

pub fn fixture_faces() -> Vec<FaceAttributeSet> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../facestream-analysis/tests/data/detect_faces_single.json");
    let raw = std::fs::read_to_string(path).expect("read analysis fixture");
    serde_json::from_str(&raw).expect("parse analysis fixture")
}

pub fn face_with_emotions(emotions: &[(&str, f32)]) -> FaceAttributeSet {
    let mut face = fixture_faces().remove(0);
    face.emotions = emotions
        .iter()
        .map(|(label, confidence)| Emotion::new(*label, *confidence))
        .collect();
    face
}

pub fn envelope(capture_time: f64, sequence: i64) -> FrameEnvelope {
    FrameEnvelope {
        image_bytes: Bytes::from_static(b"\xff\xd8\xff\xe0 not really a jpeg"),
        approximate_capture_time: capture_time,
        frame_sequence_number: sequence,
    }
}

pub fn settings(zone: Tz, policy: FacePolicy) -> HandlerSettings {
    HandlerSettings {
        time_zone: zone,
        key_root: "frames".to_string(),
        face_policy: policy,
    }
}

/// 2023-04-05T14:00:00Z
pub fn fixed_clock() -> DateTime<Utc> {
    DateTime::from_timestamp(1_680_703_200, 0).expect("valid timestamp")
}

pub fn fixed_frame_id() -> Uuid {
    Uuid::from_u128(0x5a1d_0000_0000_4000_8000_0000_0000_0007)
}

pub struct FixedAnalyzer {
    faces: Vec<FaceAttributeSet>,
}

impl FixedAnalyzer {
    pub fn new(faces: Vec<FaceAttributeSet>) -> Self {
        Self { faces }
    }
}

#[async_trait]
impl FaceAnalyzer for FixedAnalyzer {
    async fn detect_faces(&self, _image: &[u8]) -> Result<Vec<FaceAttributeSet>, AnalysisError> {
        Ok(self.faces.clone())
    }
}

pub struct FailingAnalyzer;

#[async_trait]
impl FaceAnalyzer for FailingAnalyzer {
    async fn detect_faces(&self, _image: &[u8]) -> Result<Vec<FaceAttributeSet>, AnalysisError> {
        Err(AnalysisError::Sdk("ThrottlingException".into()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub key: String,
    pub bytes: Bytes,
    pub content_type: String,
}

#[derive(Default)]
pub struct MemoryBucket {
    pub objects: Mutex<Vec<StoredObject>>,
}

impl MemoryBucket {
    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects.lock().expect("bucket lock").clone()
    }
}

#[async_trait]
impl BucketStore for MemoryBucket {
    fn bucket(&self) -> &str {
        TEST_BUCKET
    }

    async fn put_object(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), BucketError> {
        self.objects.lock().expect("bucket lock").push(StoredObject {
            key: key.to_string(),
            bytes,
            content_type: content_type.to_string(),
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryRecords {
    pub records: Mutex<Vec<NormalizedFrameRecord>>,
    pub fail_writes: bool,
}

impl MemoryRecords {
    pub fn failing() -> Self {
        Self {
            records: Mutex::default(),
            fail_writes: true,
        }
    }

    pub fn records(&self) -> Vec<NormalizedFrameRecord> {
        self.records.lock().expect("records lock").clone()
    }
}

#[async_trait]
impl FrameRecordRepository for MemoryRecords {
    async fn put_record(&self, record: &NormalizedFrameRecord) -> Result<(), RepositoryError> {
        if self.fail_writes {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        self.records
            .lock()
            .expect("records lock")
            .push(record.clone());
        Ok(())
    }
}

pub struct Harness {
    pub handler: FrameIngestHandler,
    pub bucket: Arc<MemoryBucket>,
    pub records: Arc<MemoryRecords>,
}

impl Harness {
    pub fn new(analyzer: Arc<dyn FaceAnalyzer>, records: MemoryRecords, settings: HandlerSettings) -> Self {
        let bucket = Arc::new(MemoryBucket::default());
        let records = Arc::new(records);
        let handler = FrameIngestHandler::new(analyzer, bucket.clone(), records.clone(), settings)
            .with_clock(fixed_clock)
            .with_frame_ids(fixed_frame_id);
        Self {
            handler,
            bucket,
            records,
        }
    }

    pub fn with_faces(faces: Vec<FaceAttributeSet>, policy: FacePolicy) -> Self {
        Self::new(
            Arc::new(FixedAnalyzer::new(faces)),
            MemoryRecords::default(),
            settings(Tz::UTC, policy),
        )
    }
}
