//! Frame pipeline: decode -> analyze -> select -> normalize -> assemble -> persist.

mod assemble;
mod config;
mod emotion;
mod envelope;
mod error;
mod handler;
mod localize;
mod normalize;

pub use assemble::{
    assemble, epoch_decimal, image_storage_key, FrameContext, ImageLocation, SelectedFace,
};
pub use config::{ConfigFile, FacePolicy, HandlerConfig, HandlerSettings};
pub use emotion::{select_dominant, DominantEmotion, UNKNOWN_EMOTION};
pub use envelope::{FrameEnvelope, StreamBatch, StreamPayload, StreamRecord};
pub use error::{
    ConfigError, DecodeError, ExternalServiceError, NormalizationError, ProcessingError,
};
pub use handler::{BatchSummary, FrameIngestHandler, FrameOutcome};
pub use localize::{
    localize, localize_datetime, localize_in, parse_time_zone, utc_from_epoch, LocalizedTime,
};
pub use normalize::{exact_decimal, normalize, ToExactDecimal};
