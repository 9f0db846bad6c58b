use std::io;

use thiserror::Error;

use crate::expected_version::ExpectedVersion;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid stream id: {0}")]
    InvalidStreamId(String),
    #[error("invalid expected version {0}")]
    InvalidExpectedVersion(i64),
    #[error(
        "wrong expected version for stream '{stream}': expected {expected}, current {}",
        describe_head(.current)
    )]
    WrongExpectedVersion {
        stream: String,
        expected: ExpectedVersion,
        current: Option<u64>,
    },
    #[error("stream '{stream}' has been {}", deletion_mode(.hard))]
    StreamDeleted { stream: String, hard: bool },
    #[error("stream '{0}' has no versions left")]
    VersionExhausted(String),
    #[error("malformed index key: {0}")]
    MalformedKey(String),
    #[error("corrupted log record at position {position}: {reason}")]
    LogCorrupted { position: u64, reason: String },
    #[error("storage error: {0}")]
    Storage(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Current head carried by a concurrency failure, if any.
    pub fn current_head(&self) -> Option<u64> {
        match self {
            Self::WrongExpectedVersion { current, .. } => *current,
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::WrongExpectedVersion { .. } | Self::Storage(_))
    }
}

fn deletion_mode(hard: &bool) -> &'static str {
    if *hard {
        "hard deleted"
    } else {
        "soft deleted"
    }
}

fn describe_head(current: &Option<u64>) -> String {
    match current {
        Some(version) => version.to_string(),
        None => "no stream".to_string(),
    }
}

impl From<rocksdb::Error> for StoreError {
    fn from(err: rocksdb::Error) -> Self {
        Self::Storage(err.into_string())
    }
}

impl From<toml::de::Error> for StoreError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for StoreError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_expected_version_reports_current_head() {
        let err = StoreError::WrongExpectedVersion {
            stream: "orders-1".into(),
            expected: ExpectedVersion::Exact(0),
            current: Some(3),
        };
        assert_eq!(
            err.to_string(),
            "wrong expected version for stream 'orders-1': expected 0, current 3"
        );
        assert_eq!(err.current_head(), Some(3));
        assert!(err.is_retryable());
    }

    #[test]
    fn wrong_expected_version_on_missing_stream() {
        let err = StoreError::WrongExpectedVersion {
            stream: "orders-9".into(),
            expected: ExpectedVersion::StreamExists,
            current: None,
        };
        assert_eq!(
            err.to_string(),
            "wrong expected version for stream 'orders-9': expected stream exists, current no stream"
        );
    }

    #[test]
    fn stream_deleted_mentions_mode() {
        let hard = StoreError::StreamDeleted {
            stream: "cart-7".into(),
            hard: true,
        };
        assert_eq!(hard.to_string(), "stream 'cart-7' has been hard deleted");
        assert!(!hard.is_retryable());
    }
}
