use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, StoreError};

pub const ANY: i64 = -2;
pub const NO_STREAM: i64 = -1;
pub const INVALID: i64 = -3;
pub const STREAM_EXISTS: i64 = -4;

/// Optimistic-concurrency precondition attached to a write.
///
/// The `INVALID` wire sentinel has no variant: [`ExpectedVersion::from_wire`]
/// rejects it, so an invalid expectation never reaches the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpectedVersion {
    /// Skip the check.
    Any,
    /// The stream must not exist yet.
    NoStream,
    /// The stream or its metastream must exist, at any version.
    StreamExists,
    /// The stream head must be exactly this version.
    Exact(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Proceed,
    Conflict,
}

impl ExpectedVersion {
    pub fn from_wire(value: i64) -> Result<Self> {
        match value {
            ANY => Ok(Self::Any),
            NO_STREAM => Ok(Self::NoStream),
            STREAM_EXISTS => Ok(Self::StreamExists),
            version if version >= 0 => Ok(Self::Exact(version as u64)),
            other => Err(StoreError::InvalidExpectedVersion(other)),
        }
    }

    pub fn to_wire(self) -> i64 {
        match self {
            Self::Any => ANY,
            Self::NoStream => NO_STREAM,
            Self::StreamExists => STREAM_EXISTS,
            Self::Exact(version) => i64::try_from(version).unwrap_or(i64::MAX),
        }
    }

    /// Whether [`resolve`](Self::resolve) needs to know if the metastream exists.
    pub fn needs_metastream(self, head: Option<u64>) -> bool {
        self == Self::StreamExists && head.is_none()
    }

    /// Decides whether a write may proceed given the stream's current head.
    ///
    /// `metastream_present` is only consulted for `StreamExists` on an absent
    /// stream.
    pub fn resolve(self, head: Option<u64>, metastream_present: bool) -> Resolution {
        let proceed = match (self, head) {
            (Self::Any, _) => true,
            (Self::NoStream, None) => true,
            (Self::NoStream, Some(_)) => false,
            (Self::StreamExists, Some(_)) => true,
            (Self::StreamExists, None) => metastream_present,
            (Self::Exact(expected), Some(current)) => expected == current,
            (Self::Exact(_), None) => false,
        };
        if proceed {
            Resolution::Proceed
        } else {
            Resolution::Conflict
        }
    }
}

impl fmt::Display for ExpectedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::NoStream => f.write_str("no stream"),
            Self::StreamExists => f.write_str("stream exists"),
            Self::Exact(version) => write!(f, "{version}"),
        }
    }
}

impl std::str::FromStr for ExpectedVersion {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "any" => Ok(Self::Any),
            "no-stream" | "no_stream" | "nostream" => Ok(Self::NoStream),
            "stream-exists" | "stream_exists" | "exists" => Ok(Self::StreamExists),
            other => {
                let wire = other
                    .parse::<i64>()
                    .map_err(|_| format!("unsupported expected version '{value}'"))?;
                Self::from_wire(wire).map_err(|err| err.to_string())
            }
        }
    }
}

impl Serialize for ExpectedVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.to_wire())
    }
}

impl<'de> Deserialize<'de> for ExpectedVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Self::from_wire(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wire_sentinels() {
        assert_eq!(ExpectedVersion::from_wire(-2).unwrap(), ExpectedVersion::Any);
        assert_eq!(
            ExpectedVersion::from_wire(-1).unwrap(),
            ExpectedVersion::NoStream
        );
        assert_eq!(
            ExpectedVersion::from_wire(-4).unwrap(),
            ExpectedVersion::StreamExists
        );
        assert_eq!(
            ExpectedVersion::from_wire(7).unwrap(),
            ExpectedVersion::Exact(7)
        );
    }

    #[test]
    fn rejects_invalid_and_out_of_domain() {
        for raw in [INVALID, -5, i64::MIN] {
            let err = ExpectedVersion::from_wire(raw).unwrap_err();
            assert!(matches!(err, StoreError::InvalidExpectedVersion(value) if value == raw));
        }
    }

    #[test]
    fn resolution_table() {
        use ExpectedVersion::*;
        use Resolution::*;

        assert_eq!(Any.resolve(None, false), Proceed);
        assert_eq!(Any.resolve(Some(9), false), Proceed);
        assert_eq!(NoStream.resolve(None, false), Proceed);
        assert_eq!(NoStream.resolve(Some(0), false), Conflict);
        assert_eq!(StreamExists.resolve(Some(4), false), Proceed);
        assert_eq!(StreamExists.resolve(None, false), Conflict);
        assert_eq!(StreamExists.resolve(None, true), Proceed);
        assert_eq!(Exact(2).resolve(Some(2), false), Proceed);
        assert_eq!(Exact(2).resolve(Some(3), false), Conflict);
        assert_eq!(Exact(0).resolve(None, false), Conflict);
    }

    #[test]
    fn metastream_lookup_only_for_missing_stream() {
        assert!(ExpectedVersion::StreamExists.needs_metastream(None));
        assert!(!ExpectedVersion::StreamExists.needs_metastream(Some(0)));
        assert!(!ExpectedVersion::Any.needs_metastream(None));
    }

    #[test]
    fn parses_cli_spellings() {
        assert_eq!("any".parse::<ExpectedVersion>(), Ok(ExpectedVersion::Any));
        assert_eq!(
            "no-stream".parse::<ExpectedVersion>(),
            Ok(ExpectedVersion::NoStream)
        );
        assert_eq!("-4".parse::<ExpectedVersion>(), Ok(ExpectedVersion::StreamExists));
        assert_eq!("12".parse::<ExpectedVersion>(), Ok(ExpectedVersion::Exact(12)));
        assert!("-3".parse::<ExpectedVersion>().is_err());
        assert!("latest".parse::<ExpectedVersion>().is_err());
    }

    #[test]
    fn serializes_as_wire_integer() {
        let json = serde_json::to_string(&ExpectedVersion::NoStream).unwrap();
        assert_eq!(json, "-1");
        let decoded: ExpectedVersion = serde_json::from_str("5").unwrap();
        assert_eq!(decoded, ExpectedVersion::Exact(5));
        assert!(serde_json::from_str::<ExpectedVersion>("-3").is_err());
    }
}
