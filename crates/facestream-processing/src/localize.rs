use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{ConfigError, NormalizationError, ProcessingError};

/// Calendar breakdown of an instant in a configured zone, each part
/// zero-padded (`"2023"`, `"04"`, `"05"`, `"14"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizedTime {
    pub year: String,
    pub month: String,
    pub day: String,
    pub hour: String,
}

impl LocalizedTime {
    /// `YYYYMM`, the month-granularity lookup key.
    pub fn year_month(&self) -> String {
        format!("{}{}", self.year, self.month)
    }

    /// `YYYY/MM/DD/HH`, the hour-granularity storage path.
    pub fn partition_path(&self) -> String {
        format!("{}/{}/{}/{}", self.year, self.month, self.day, self.hour)
    }
}

impl<T: TimeZone> From<&DateTime<T>> for LocalizedTime
where
    T::Offset: std::fmt::Display,
{
    fn from(dt: &DateTime<T>) -> Self {
        Self {
            year: dt.format("%Y").to_string(),
            month: dt.format("%m").to_string(),
            day: dt.format("%d").to_string(),
            hour: dt.format("%H").to_string(),
        }
    }
}

pub fn parse_time_zone(name: &str) -> Result<Tz, ConfigError> {
    name.parse::<Tz>()
        .map_err(|_| ConfigError::UnknownTimeZone(name.to_string()))
}

/// Localizes a Unix epoch (seconds, fractional allowed) under the named zone.
pub fn localize(epoch_seconds: f64, time_zone_name: &str) -> Result<LocalizedTime, ProcessingError> {
    let tz = parse_time_zone(time_zone_name)?;
    Ok(localize_in(epoch_seconds, tz)?)
}

pub fn localize_in(epoch_seconds: f64, tz: Tz) -> Result<LocalizedTime, NormalizationError> {
    let utc = utc_from_epoch(epoch_seconds)?;
    Ok(localize_datetime(utc, tz))
}

pub fn localize_datetime(at: DateTime<Utc>, tz: Tz) -> LocalizedTime {
    LocalizedTime::from(&at.with_timezone(&tz))
}

pub fn utc_from_epoch(epoch_seconds: f64) -> Result<DateTime<Utc>, NormalizationError> {
    let out_of_range = || NormalizationError::OutOfRange {
        field: "epoch_seconds",
        value: epoch_seconds.to_string(),
    };

    if !epoch_seconds.is_finite() {
        return Err(NormalizationError::NonFinite {
            field: "epoch_seconds".into(),
            value: epoch_seconds.to_string(),
        });
    }

    let whole = epoch_seconds.floor();
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return Err(out_of_range());
    }
    let nanos = (((epoch_seconds - whole) * 1e9).round() as u32).min(999_999_999);

    DateTime::from_timestamp(whole as i64, nanos).ok_or_else(out_of_range)
}
