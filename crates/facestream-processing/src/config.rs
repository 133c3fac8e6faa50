use std::path::Path;
use std::str::FromStr;

use chrono_tz::Tz;
use facestream_analysis::RekognitionConfig;
use facestream_bucket::S3Config;
use facestream_repository::{validate_table_name, DEFAULT_TABLE};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::localize::parse_time_zone;

/// Which detected faces of a frame become records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacePolicy {
    /// One record per frame holding the last face the service reported.
    #[default]
    Last,
    /// One record per detected face.
    Each,
}

impl FromStr for FacePolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "last" => Ok(Self::Last),
            "each" => Ok(Self::Each),
            other => Err(ConfigError::Invalid {
                key: "FACESTREAM_FACE_POLICY",
                message: format!("expected 'last' or 'each', got '{other}'"),
            }),
        }
    }
}

/// Optional file layer; every key can also come from the environment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub timezone: Option<String>,
    pub bucket: Option<String>,
    pub key_root: Option<String>,
    pub table: Option<String>,
    pub face_policy: Option<FacePolicy>,
    pub database_url: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub s3_force_path_style: Option<bool>,
    pub rekognition_region: Option<String>,
    pub rekognition_endpoint: Option<String>,
}

impl ConfigFile {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}

/// The values the frame handler itself needs.
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    pub time_zone: Tz,
    pub key_root: String,
    pub face_policy: FacePolicy,
}

/// Validated configuration for one invocation.
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    pub settings: HandlerSettings,
    pub table: String,
    pub database_url: Option<String>,
    pub s3: S3Config,
    pub rekognition: RekognitionConfig,
}

impl HandlerConfig {
    /// Reads the optional TOML file, then lets process environment variables
    /// override it.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => ConfigFile::from_path(path)?,
            None => ConfigFile::default(),
        };
        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    pub fn from_sources(
        file: ConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let lookup = |key: &str, fallback: Option<String>| {
            env(key).filter(|value| !value.is_empty()).or(fallback)
        };

        let timezone = lookup("FACESTREAM_TIMEZONE", file.timezone)
            .ok_or(ConfigError::Missing("FACESTREAM_TIMEZONE"))?;
        let time_zone = parse_time_zone(&timezone)?;

        let bucket = lookup("FACESTREAM_BUCKET", file.bucket)
            .ok_or(ConfigError::Missing("FACESTREAM_BUCKET"))?;
        let key_root = lookup("FACESTREAM_KEY_ROOT", file.key_root)
            .ok_or(ConfigError::Missing("FACESTREAM_KEY_ROOT"))?;

        let table = lookup("FACESTREAM_TABLE", file.table)
            .unwrap_or_else(|| DEFAULT_TABLE.to_string());
        validate_table_name(&table).map_err(|err| ConfigError::Invalid {
            key: "FACESTREAM_TABLE",
            message: err.to_string(),
        })?;

        let face_policy = match env("FACESTREAM_FACE_POLICY").filter(|v| !v.is_empty()) {
            Some(raw) => raw.parse()?,
            None => file.face_policy.unwrap_or_default(),
        };

        let force_path_style = match env("S3_FORCE_PATH_STYLE").filter(|v| !v.is_empty()) {
            Some(raw) => parse_bool("S3_FORCE_PATH_STYLE", &raw)?,
            None => file.s3_force_path_style.unwrap_or(false),
        };

        let s3_defaults = S3Config::default();
        let s3 = S3Config {
            bucket,
            region: lookup("S3_REGION", file.s3_region).unwrap_or(s3_defaults.region),
            endpoint: lookup("S3_ENDPOINT_URL", file.s3_endpoint),
            access_key_id: env("S3_ACCESS_KEY_ID"),
            secret_access_key: env("S3_SECRET_ACCESS_KEY"),
            force_path_style,
        };

        let rekognition_defaults = RekognitionConfig::default();
        let rekognition = RekognitionConfig {
            region: lookup("REKOGNITION_REGION", file.rekognition_region)
                .unwrap_or(rekognition_defaults.region),
            endpoint: lookup("REKOGNITION_ENDPOINT_URL", file.rekognition_endpoint),
        };

        Ok(Self {
            settings: HandlerSettings {
                time_zone,
                key_root,
                face_policy,
            },
            table,
            database_url: lookup("DATABASE_URL", file.database_url),
            s3,
            rekognition,
        })
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            message: format!("expected a boolean, got '{raw}'"),
        }),
    }
}
