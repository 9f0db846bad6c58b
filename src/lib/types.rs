use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::storage::Direction;

/// Global log position. `START` and `END` are logical markers; `END` is
/// never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position(i64);

impl Position {
    pub const START: Position = Position(0);
    pub const END: Position = Position(-1);

    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn at(position: u64) -> Self {
        Self(i64::try_from(position).unwrap_or(i64::MAX))
    }

    pub fn value(self) -> i64 {
        self.0
    }

    pub fn is_end(self) -> bool {
        self.0 < 0
    }

    /// Concrete offset, or `None` for `END`.
    pub fn offset(self) -> Option<u64> {
        u64::try_from(self.0).ok()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_end() {
            f.write_str("end")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    pub event_id: Uuid,
    pub event_type: String,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl EventData {
    pub fn new(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event_type.into(),
            data,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A record as stored in the event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub stream_id: String,
    pub version: u64,
    pub event_id: Uuid,
    pub event_type: String,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub position: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMode {
    Soft,
    Hard,
}

impl DeleteMode {
    pub fn from_hard(hard: bool) -> Self {
        if hard { Self::Hard } else { Self::Soft }
    }

    pub fn is_hard(self) -> bool {
        self == Self::Hard
    }
}

/// Value stored under each index key; the literal stream name confirms
/// entries found by hash-prefix scans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexValue {
    pub stream: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tombstone: Option<DeleteMode>,
}

/// Value stored under each `$all` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllValue {
    pub stream: String,
    pub version: u64,
}

/// Value stored under each stream name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamRecord {
    pub hash: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexedEvent {
    pub version: u64,
    pub position: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadStatus {
    Success,
    NoStream,
    SoftDeleted,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreamSlice {
    pub stream_id: String,
    pub status: ReadStatus,
    pub direction: Direction,
    pub entries: Vec<IndexedEvent>,
    pub next_version: Option<u64>,
    pub last_version: Option<u64>,
    pub is_end_of_stream: bool,
}

impl StreamSlice {
    pub(crate) fn empty(stream_id: &str, status: ReadStatus, direction: Direction) -> Self {
        Self {
            stream_id: stream_id.to_string(),
            status,
            direction,
            entries: Vec::new(),
            next_version: None,
            last_version: None,
            is_end_of_stream: true,
        }
    }

    pub fn versions(&self) -> Vec<u64> {
        self.entries.iter().map(|entry| entry.version).collect()
    }

    pub fn positions(&self) -> Vec<u64> {
        self.entries.iter().map(|entry| entry.position).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllEntry {
    pub position: u64,
    pub stream_id: String,
    pub version: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AllSlice {
    pub direction: Direction,
    pub entries: Vec<AllEntry>,
    pub next_position: Position,
    pub is_end: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppendResult {
    /// Head after the append; `None` only for an empty append to a missing stream.
    pub head: Option<u64>,
    pub positions: Vec<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeleteResult {
    pub mode: DeleteMode,
    pub tombstone_position: u64,
    pub removed_entries: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreamInfo {
    pub stream_id: String,
    pub hash: u32,
    pub head: Option<u64>,
    pub deleted: Option<DeleteMode>,
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_sentinels() {
        assert_eq!(Position::START.offset(), Some(0));
        assert!(Position::END.is_end());
        assert_eq!(Position::END.offset(), None);
        assert_eq!(Position::at(42).value(), 42);
        assert_eq!(Position::END.to_string(), "end");
    }

    #[test]
    fn index_value_omits_missing_tombstone() {
        let value = IndexValue {
            stream: "orders-1".into(),
            tombstone: None,
        };
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"stream":"orders-1"}"#
        );
        let hard: IndexValue =
            serde_json::from_str(r#"{"stream":"orders-1","tombstone":"hard"}"#).unwrap();
        assert_eq!(hard.tombstone, Some(DeleteMode::Hard));
    }

    #[test]
    fn recorded_event_position_is_not_serialized() {
        let event = RecordedEvent {
            stream_id: "orders-1".into(),
            version: 0,
            event_id: Uuid::nil(),
            event_type: "order-placed".into(),
            data: serde_json::json!({ "total": 10 }),
            metadata: None,
            created_at: Utc::now(),
            position: 99,
        };
        let encoded = serde_json::to_vec(&event).unwrap();
        let decoded: RecordedEvent = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded.position, 0);
        assert_eq!(decoded.event_type, "order-placed");
    }
}
