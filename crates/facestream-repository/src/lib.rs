//! Table store for normalized frame records, backed by Postgres.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::Serialize;
use serde_json::Value;
use sqlx::migrate::MigrateError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

pub const DEFAULT_TABLE: &str = "frame_records";

/// One persisted row per frame (or per face, depending on the ingest face
/// policy). Numeric values are exact decimals; nothing here is a binary float.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedFrameRecord {
    pub frame_id: Uuid,
    pub face_index: i32,
    pub face_count: i32,
    pub frame_sequence_number: i64,
    pub processed_timestamp: BigDecimal,
    pub approx_capture_timestamp: BigDecimal,
    /// `YYYYMM` of the processing time, used as the secondary lookup key.
    pub processed_year_month: String,
    pub image_bucket: String,
    pub image_key: String,
    /// `None` when the analysis reported no faces for the frame.
    #[serde(flatten)]
    pub face: Option<FaceColumns>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceColumns {
    pub age_range_low: BigDecimal,
    pub age_range_high: BigDecimal,
    pub face_confidence: BigDecimal,
    pub emotion: String,
    pub emotion_confidence: BigDecimal,
    pub anger_observed: bool,
    pub bounding_box_height: BigDecimal,
    pub bounding_box_left: BigDecimal,
    pub bounding_box_top: BigDecimal,
    pub bounding_box_width: BigDecimal,
    pub pose_pitch: BigDecimal,
    pub pose_roll: BigDecimal,
    pub pose_yaw: BigDecimal,
    pub quality_brightness: BigDecimal,
    pub quality_sharpness: BigDecimal,
    pub beard_value: bool,
    pub beard_confidence: BigDecimal,
    pub eyeglasses_value: bool,
    pub eyeglasses_confidence: BigDecimal,
    pub eyes_open_value: bool,
    pub eyes_open_confidence: BigDecimal,
    pub gender_value: String,
    pub gender_confidence: BigDecimal,
    pub mouth_open_value: bool,
    pub mouth_open_confidence: BigDecimal,
    pub mustache_value: bool,
    pub mustache_confidence: BigDecimal,
    pub smile_value: bool,
    pub smile_confidence: BigDecimal,
    pub sunglasses_value: bool,
    pub sunglasses_confidence: BigDecimal,
    /// Ordered emotion list; confidences serialized as decimal strings.
    pub emotions: Value,
    /// Ordered landmark list; coordinates serialized as decimal strings.
    pub landmarks: Value,
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] MigrateError),

    #[error("invalid table name '{0}'")]
    InvalidTableName(String),

    #[error("failed to render record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Insert-only sink for frame records.
#[async_trait]
pub trait FrameRecordRepository: Send + Sync {
    async fn put_record(&self, record: &NormalizedFrameRecord) -> Result<(), RepositoryError>;
}

/// Table names are interpolated into SQL, so only plain lowercase identifiers
/// are accepted.
pub fn validate_table_name(table: &str) -> Result<(), RepositoryError> {
    let mut chars = table.chars();
    let valid = match chars.next() {
        Some(first) if first == '_' || first.is_ascii_lowercase() => chars
            .all(|c| c == '_' || c.is_ascii_lowercase() || c.is_ascii_digit()),
        _ => false,
    };

    if valid && table.len() <= 63 {
        Ok(())
    } else {
        Err(RepositoryError::InvalidTableName(table.to_string()))
    }
}

#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
    table: String,
    insert_sql: String,
}

impl PostgresRepository {
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        table: &str,
    ) -> Result<Self, RepositoryError> {
        validate_table_name(table)?;
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool,
            table: table.to_string(),
            insert_sql: insert_statement(table),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Applies the bundled migrations, which create the default table.
    pub async fn run_migrations(&self) -> Result<(), RepositoryError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

const COLUMNS: &[&str] = &[
    "frame_id",
    "face_index",
    "face_count",
    "frame_sequence_number",
    "processed_timestamp",
    "approx_capture_timestamp",
    "processed_year_month",
    "image_bucket",
    "image_key",
    "age_range_low",
    "age_range_high",
    "face_confidence",
    "emotion",
    "emotion_confidence",
    "anger_observed",
    "bounding_box_height",
    "bounding_box_left",
    "bounding_box_top",
    "bounding_box_width",
    "pose_pitch",
    "pose_roll",
    "pose_yaw",
    "quality_brightness",
    "quality_sharpness",
    "beard_value",
    "beard_confidence",
    "eyeglasses_value",
    "eyeglasses_confidence",
    "eyes_open_value",
    "eyes_open_confidence",
    "gender_value",
    "gender_confidence",
    "mouth_open_value",
    "mouth_open_confidence",
    "mustache_value",
    "mustache_confidence",
    "smile_value",
    "smile_confidence",
    "sunglasses_value",
    "sunglasses_confidence",
    "emotions",
    "landmarks",
];

fn insert_statement(table: &str) -> String {
    let placeholders: Vec<String> = (1..=COLUMNS.len()).map(|i| format!("${i}")).collect();
    format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        COLUMNS.join(", "),
        placeholders.join(", ")
    )
}

#[async_trait]
impl FrameRecordRepository for PostgresRepository {
    async fn put_record(&self, record: &NormalizedFrameRecord) -> Result<(), RepositoryError> {
        let face = record.face.as_ref();

        sqlx::query(&self.insert_sql)
            .bind(record.frame_id)
            .bind(record.face_index)
            .bind(record.face_count)
            .bind(record.frame_sequence_number)
            .bind(&record.processed_timestamp)
            .bind(&record.approx_capture_timestamp)
            .bind(&record.processed_year_month)
            .bind(&record.image_bucket)
            .bind(&record.image_key)
            .bind(face.map(|f| &f.age_range_low))
            .bind(face.map(|f| &f.age_range_high))
            .bind(face.map(|f| &f.face_confidence))
            .bind(face.map(|f| &f.emotion))
            .bind(face.map(|f| &f.emotion_confidence))
            .bind(face.map(|f| f.anger_observed))
            .bind(face.map(|f| &f.bounding_box_height))
            .bind(face.map(|f| &f.bounding_box_left))
            .bind(face.map(|f| &f.bounding_box_top))
            .bind(face.map(|f| &f.bounding_box_width))
            .bind(face.map(|f| &f.pose_pitch))
            .bind(face.map(|f| &f.pose_roll))
            .bind(face.map(|f| &f.pose_yaw))
            .bind(face.map(|f| &f.quality_brightness))
            .bind(face.map(|f| &f.quality_sharpness))
            .bind(face.map(|f| f.beard_value))
            .bind(face.map(|f| &f.beard_confidence))
            .bind(face.map(|f| f.eyeglasses_value))
            .bind(face.map(|f| &f.eyeglasses_confidence))
            .bind(face.map(|f| f.eyes_open_value))
            .bind(face.map(|f| &f.eyes_open_confidence))
            .bind(face.map(|f| &f.gender_value))
            .bind(face.map(|f| &f.gender_confidence))
            .bind(face.map(|f| f.mouth_open_value))
            .bind(face.map(|f| &f.mouth_open_confidence))
            .bind(face.map(|f| f.mustache_value))
            .bind(face.map(|f| &f.mustache_confidence))
            .bind(face.map(|f| f.smile_value))
            .bind(face.map(|f| &f.smile_confidence))
            .bind(face.map(|f| f.sunglasses_value))
            .bind(face.map(|f| &f.sunglasses_confidence))
            .bind(face.map(|f| &f.emotions))
            .bind(face.map(|f| &f.landmarks))
            .execute(&self.pool)
            .await?;

        debug!(
            table = %self.table,
            frame_id = %record.frame_id,
            face_index = record.face_index,
            "frame record inserted"
        );
        Ok(())
    }
}

/// Emits each record as a JSON log event instead of storing it. Used for dry
/// runs against a live stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingRepository;

#[async_trait]
impl FrameRecordRepository for LoggingRepository {
    async fn put_record(&self, record: &NormalizedFrameRecord) -> Result<(), RepositoryError> {
        let rendered = serde_json::to_string(record)?;
        info!(frame_id = %record.frame_id, record = %rendered, "dry run record");
        Ok(())
    }
}
