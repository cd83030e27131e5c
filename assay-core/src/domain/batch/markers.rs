// assay-core/src/domain/batch/markers.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::domain::error::DomainError;
use crate::domain::identity::{Fingerprint, IdDict};

/// Provenance metadata stamped on a batch when its data is loaded.
///
/// Always carries a `ge_load_time` entry; any other marker is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct BatchMarkers(IdDict);

impl BatchMarkers {
    pub const GE_LOAD_TIME: &'static str = "ge_load_time";
    pub const LOAD_TIME_FORMAT: &'static str = "%Y%m%dT%H%M%S%.6fZ";

    pub fn new(markers: IdDict) -> Result<Self, DomainError> {
        if !markers.contains_key(Self::GE_LOAD_TIME) {
            return Err(DomainError::InvalidBatchId(
                "BatchMarkers requires a ge_load_time".into(),
            ));
        }
        Ok(Self(markers))
    }

    /// Markers stamped with the current UTC time.
    pub fn stamped() -> Self {
        Self::stamped_at(Utc::now())
    }

    pub fn stamped_at(load_time: DateTime<Utc>) -> Self {
        Self(IdDict::new().with(
            Self::GE_LOAD_TIME,
            load_time.format(Self::LOAD_TIME_FORMAT).to_string(),
        ))
    }

    pub fn ge_load_time(&self) -> Option<&str> {
        self.0.get(Self::GE_LOAD_TIME).and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key, value);
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn as_id_dict(&self) -> &IdDict {
        &self.0
    }

    pub fn to_json_dict(&self) -> Map<String, Value> {
        self.0.as_map().clone()
    }
}

impl Default for BatchMarkers {
    fn default() -> Self {
        Self::stamped()
    }
}

impl Fingerprint for BatchMarkers {
    fn fingerprint(&self) -> Option<String> {
        self.0.to_id()
    }
}

impl TryFrom<Map<String, Value>> for BatchMarkers {
    type Error = DomainError;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        Self::new(IdDict::from(map))
    }
}

impl From<BatchMarkers> for Map<String, Value> {
    fn from(markers: BatchMarkers) -> Self {
        markers.0.into_map()
    }
}

impl fmt::Display for BatchMarkers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_missing_load_time_is_rejected() {
        let err = BatchMarkers::new(IdDict::new().with("row_count", 3)).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidBatchId("BatchMarkers requires a ge_load_time".into())
        );
    }

    #[test]
    fn test_stamped_at_formats_microseconds() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap()
            + chrono::Duration::microseconds(42);
        let markers = BatchMarkers::stamped_at(at);
        assert_eq!(markers.ge_load_time(), Some("20240309T070501.000042Z"));
    }

    #[test]
    fn test_single_marker_fingerprint_is_readable() {
        let markers = BatchMarkers::new(IdDict::new().with("ge_load_time", "20240101T000000.000000Z"))
            .unwrap();
        assert_eq!(
            markers.fingerprint().as_deref(),
            Some("ge_load_time=20240101T000000.000000Z")
        );
    }

    #[test]
    fn test_deserialize_requires_load_time() {
        assert!(serde_json::from_str::<BatchMarkers>(r#"{"row_count": 1}"#).is_err());

        let markers: BatchMarkers =
            serde_json::from_str(r#"{"ge_load_time": "20240101T000000.000000Z", "row_count": 1}"#)
                .unwrap();
        assert_eq!(markers.get("row_count"), Some(&Value::from(1)));
    }
}
