use crate::config::{S3Config, ServiceConfig};
use std::fmt;

/// Path segment between the centre id and the file name
pub const SYNOP_PREFIX: &str = "data/core/weather/surface-based-observations/synop";

/// Location of an object in the store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub bucket: String,
    pub path: String,
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.path)
    }
}

/// Derives object keys for SYNOP records
///
/// Keys depend only on the configured identifiers, the logger id and the
/// timestamp, so a redelivered message overwrites its earlier objects.
#[derive(Debug, Clone)]
pub struct ObjectKeyBuilder {
    country_id: String,
    centre_id: String,
    bucket: String,
}

impl ObjectKeyBuilder {
    pub fn new(
        country_id: impl Into<String>,
        centre_id: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            country_id: country_id.into(),
            centre_id: centre_id.into(),
            bucket: bucket.into(),
        }
    }

    pub fn from_config(service: &ServiceConfig, s3: &S3Config) -> Self {
        Self::new(&service.country_id, &service.centre_id, &s3.bucket)
    }

    /// Key for the record of `logger_id` at `timestamp`
    pub fn build(&self, logger_id: &str, timestamp: &str) -> ObjectKey {
        ObjectKey {
            bucket: self.bucket.clone(),
            path: object_path(&self.country_id, &self.centre_id, logger_id, timestamp),
        }
    }
}

/// `{country}/{centre}/data/core/weather/surface-based-observations/synop/{logger}_{ts}.csv`
pub fn object_path(country_id: &str, centre_id: &str, logger_id: &str, timestamp: &str) -> String {
    format!(
        "{country_id}/{centre_id}/{SYNOP_PREFIX}/{logger_id}_{ts}.csv",
        ts = normalize_timestamp(timestamp)
    )
}

/// Strip `:` and `-` from an ISO-8601 timestamp
pub fn normalize_timestamp(timestamp: &str) -> String {
    timestamp.chars().filter(|c| !matches!(c, ':' | '-')).collect()
}
