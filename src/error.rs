// Typed errors with thiserror. Surface meaningful messages to JS.

use thiserror::Error;

/// Map engine error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MapError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid record '{id}': {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("Duplicate record id: {0}")]
    DuplicateRecord(String),

    #[error("Unknown record id: {0}")]
    UnknownRecord(String),

    #[error("Map style is not loaded; custom layers cannot be added yet")]
    StyleNotLoaded,

    #[error("Cluster expansion lookup failed: {0}")]
    ClusterLookup(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl MapError {
    pub(crate) fn invalid_record(id: impl Into<String>, reason: impl Into<String>) -> Self {
        MapError::InvalidRecord {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for MapError {
    fn from(err: serde_json::Error) -> Self {
        MapError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = MapError::invalid_record("regal", "no category");
        assert!(err.to_string().contains("regal"));
        assert!(err.to_string().contains("no category"));
    }

    #[test]
    fn serde_errors_convert() {
        let err: MapError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, MapError::Serialization(_)));
    }
}
