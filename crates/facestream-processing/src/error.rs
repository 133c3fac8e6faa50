use facestream_analysis::AnalysisError;
use facestream_bucket::BucketError;
use facestream_repository::RepositoryError;
use thiserror::Error;

/// Every way a frame can fail. All variants abort the current record and are
/// handed back to the invoker unchanged.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("external service error: {0}")]
    ExternalService(#[from] ExternalServiceError),

    #[error("normalization error: {0}")]
    Normalization(#[from] NormalizationError),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("stream event is not valid JSON: {0}")]
    Event(#[source] serde_json::Error),

    #[error("record payload is not valid base64: {0}")]
    Payload(#[source] base64::DecodeError),

    #[error("frame envelope is malformed: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("frame image bytes are not valid base64: {0}")]
    ImageBytes(#[source] base64::DecodeError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unrecognized time zone '{0}'")]
    UnknownTimeZone(String),

    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Error)]
pub enum ExternalServiceError {
    #[error("face analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("blob store write failed: {0}")]
    Bucket(#[from] BucketError),

    #[error("table store write failed: {0}")]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Error)]
pub enum NormalizationError {
    #[error("{field} is not a finite number: {value}")]
    NonFinite { field: String, value: String },

    #[error("{field} is out of range: {value}")]
    OutOfRange { field: &'static str, value: String },

    #[error("failed to serialize {field}: {source}")]
    Serialize {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl From<AnalysisError> for ProcessingError {
    fn from(err: AnalysisError) -> Self {
        Self::ExternalService(err.into())
    }
}

impl From<BucketError> for ProcessingError {
    fn from(err: BucketError) -> Self {
        Self::ExternalService(err.into())
    }
}

impl From<RepositoryError> for ProcessingError {
    fn from(err: RepositoryError) -> Self {
        Self::ExternalService(err.into())
    }
}
