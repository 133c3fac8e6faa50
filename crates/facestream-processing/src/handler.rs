use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use facestream_analysis::{FaceAnalyzer, FaceAttributeSet};
use facestream_bucket::{BucketStore, JPEG_CONTENT_TYPE};
use facestream_repository::{FrameRecordRepository, NormalizedFrameRecord};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::assemble::{assemble, image_storage_key, FrameContext, ImageLocation, SelectedFace};
use crate::config::{FacePolicy, HandlerSettings};
use crate::emotion::{select_dominant, DominantEmotion};
use crate::envelope::{FrameEnvelope, StreamBatch, StreamRecord};
use crate::error::ProcessingError;
use crate::localize::{localize_datetime, localize_in};
use crate::normalize::normalize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub records_written: usize,
}

#[derive(Debug, Clone)]
pub struct FrameOutcome {
    pub frame_id: Uuid,
    pub image: ImageLocation,
    pub records: Vec<NormalizedFrameRecord>,
}

/// Runs the per-frame pipeline against injected service clients.
pub struct FrameIngestHandler {
    analyzer: Arc<dyn FaceAnalyzer>,
    bucket: Arc<dyn BucketStore>,
    records: Arc<dyn FrameRecordRepository>,
    settings: HandlerSettings,
    clock: fn() -> DateTime<Utc>,
    frame_ids: fn() -> Uuid,
}

impl FrameIngestHandler {
    pub fn new(
        analyzer: Arc<dyn FaceAnalyzer>,
        bucket: Arc<dyn BucketStore>,
        records: Arc<dyn FrameRecordRepository>,
        settings: HandlerSettings,
    ) -> Self {
        Self {
            analyzer,
            bucket,
            records,
            settings,
            clock: Utc::now,
            frame_ids: Uuid::new_v4,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_frame_ids(mut self, frame_ids: fn() -> Uuid) -> Self {
        self.frame_ids = frame_ids;
        self
    }

    /// Processes every record in order. The first failure is returned as-is;
    /// frames persisted before it stay persisted.
    pub async fn process_batch(&self, batch: &StreamBatch) -> Result<BatchSummary, ProcessingError> {
        let mut summary = BatchSummary {
            processed: 0,
            records_written: 0,
        };

        for (position, record) in batch.records.iter().enumerate() {
            let outcome = match self.process_record(record).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(
                        position,
                        sequence_number = record.kinesis.sequence_number.as_deref(),
                        error = %err,
                        "frame processing failed"
                    );
                    return Err(err);
                }
            };
            summary.processed += 1;
            summary.records_written += outcome.records.len();
        }

        info!(
            processed = summary.processed,
            records_written = summary.records_written,
            "successfully processed {} records",
            summary.processed
        );
        Ok(summary)
    }

    pub async fn process_record(&self, record: &StreamRecord) -> Result<FrameOutcome, ProcessingError> {
        let envelope = record.decode()?;
        self.process_frame(&envelope).await
    }

    pub async fn process_frame(&self, envelope: &FrameEnvelope) -> Result<FrameOutcome, ProcessingError> {
        let faces = self.analyzer.detect_faces(&envelope.image_bytes).await?;
        let face_count = faces.len();
        let selected = self.select_faces(&faces)?;

        let processed_at = (self.clock)();
        let tz = self.settings.time_zone;
        let localized_now = localize_datetime(processed_at, tz);
        match localize_in(envelope.approximate_capture_time, tz) {
            Ok(localized_capture) => debug!(
                frame_sequence_number = envelope.frame_sequence_number,
                capture_partition = %localized_capture.partition_path(),
                "frame localized"
            ),
            Err(err) => warn!(
                frame_sequence_number = envelope.frame_sequence_number,
                error = %err,
                "capture time has no calendar form"
            ),
        }

        let frame_id = (self.frame_ids)();
        let image = ImageLocation {
            bucket: self.bucket.bucket().to_string(),
            key: image_storage_key(&self.settings.key_root, &localized_now, frame_id),
        };

        let ctx = FrameContext {
            envelope,
            frame_id,
            processed_at,
            localized_now: &localized_now,
            face_count,
            image: &image,
        };
        let records = if selected.is_empty() {
            vec![assemble(&ctx, None)?]
        } else {
            selected
                .iter()
                .map(|(index, attributes, dominant)| {
                    assemble(
                        &ctx,
                        Some(SelectedFace {
                            index: *index,
                            attributes,
                            dominant,
                        }),
                    )
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        // Records are built before any write so a bad frame leaves nothing behind.
        self.bucket
            .put_object(&image.key, envelope.image_bytes.clone(), JPEG_CONTENT_TYPE)
            .await?;
        for record in &records {
            self.records.put_record(record).await?;
        }

        for (index, attributes, dominant) in &selected {
            debug!(
                frame_id = %frame_id,
                face_index = *index,
                age_low = %attributes.age_range.low,
                age_high = %attributes.age_range.high,
                emotion = %dominant.label,
                emotion_confidence = dominant.confidence,
                anger_observed = dominant.anger_observed,
                "face scored"
            );
        }

        let primary = selected.last().map(|(_, _, dominant)| dominant);
        info!(
            frame_id = %frame_id,
            frame_sequence_number = envelope.frame_sequence_number,
            faces = face_count,
            emotion = primary.map(|d| d.label.as_str()),
            anger_observed = primary.is_some_and(|d| d.anger_observed),
            image_key = %image.key,
            "frame persisted"
        );

        Ok(FrameOutcome {
            frame_id,
            image,
            records,
        })
    }

    /// Every face is scored and normalized; the face policy then decides
    /// which of them become records.
    fn select_faces(
        &self,
        faces: &[FaceAttributeSet],
    ) -> Result<Vec<(usize, FaceAttributeSet<BigDecimal>, DominantEmotion)>, ProcessingError> {
        let mut prepared = faces
            .iter()
            .enumerate()
            .map(|(index, face)| -> Result<_, ProcessingError> {
                let dominant = select_dominant(&face.emotions);
                let normalized = normalize(face)?;
                Ok((index, normalized, dominant))
            })
            .collect::<Result<Vec<_>, ProcessingError>>()?;

        if self.settings.face_policy == FacePolicy::Last && prepared.len() > 1 {
            let keep_from = prepared.len() - 1;
            prepared.drain(..keep_from);
        }

        Ok(prepared)
    }
}
