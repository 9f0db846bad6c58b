//! Binary layout of the stream index.
//!
//! Every event is indexed under a 16-byte key:
//!
//! ```text
//! | stream hash (4, BE) | version (4, BE) | log position (8, BE) |
//! ```
//!
//! Big-endian fields make byte order equal numeric order, so a prefix scan
//! over `hash` visits a stream's entries by ascending version.

use std::fmt;

use crate::error::{Result, StoreError};

pub const STREAM_KEY_LEN: usize = 16;
pub const HASH_PREFIX_LEN: usize = 4;
pub const VERSION_PREFIX_LEN: usize = 8;
pub const POSITION_KEY_LEN: usize = 8;

/// Version slot holding a stream's tombstone; sorts after every event.
pub const TOMBSTONE_VERSION: u32 = u32::MAX;
/// Largest version an event can occupy.
pub const MAX_EVENT_VERSION: u64 = (TOMBSTONE_VERSION - 1) as u64;

pub type StreamHasher = fn(&str) -> u32;

/// XXH32 with a zero seed over the UTF-8 bytes of the stream id.
pub fn hash_of(stream_id: &str) -> u32 {
    xxhash_rust::xxh32::xxh32(stream_id.as_bytes(), 0)
}

pub fn stream_prefix(hash: u32) -> [u8; HASH_PREFIX_LEN] {
    hash.to_be_bytes()
}

pub fn version_prefix(hash: u32, version: u32) -> [u8; VERSION_PREFIX_LEN] {
    let mut buf = [0u8; VERSION_PREFIX_LEN];
    buf[..4].copy_from_slice(&hash.to_be_bytes());
    buf[4..].copy_from_slice(&version.to_be_bytes());
    buf
}

/// Smallest key strictly greater than every key starting with `prefix`.
/// `None` when the prefix is all `0xFF` and the range is unbounded.
pub fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last != u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamKey {
    pub hash: u32,
    pub version: u32,
    pub position: u64,
}

impl StreamKey {
    pub fn new(hash: u32, version: u32, position: u64) -> Self {
        Self {
            hash,
            version,
            position,
        }
    }

    pub fn encode(&self) -> [u8; STREAM_KEY_LEN] {
        let mut buf = [0u8; STREAM_KEY_LEN];
        buf[..4].copy_from_slice(&self.hash.to_be_bytes());
        buf[4..8].copy_from_slice(&self.version.to_be_bytes());
        buf[8..].copy_from_slice(&self.position.to_be_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let buf: &[u8; STREAM_KEY_LEN] = bytes.try_into().map_err(|_| {
            StoreError::MalformedKey(format!(
                "expected {STREAM_KEY_LEN} bytes, found {}",
                bytes.len()
            ))
        })?;
        let mut hash = [0u8; 4];
        let mut version = [0u8; 4];
        let mut position = [0u8; 8];
        hash.copy_from_slice(&buf[..4]);
        version.copy_from_slice(&buf[4..8]);
        position.copy_from_slice(&buf[8..]);
        Ok(Self {
            hash: u32::from_be_bytes(hash),
            version: u32::from_be_bytes(version),
            position: u64::from_be_bytes(position),
        })
    }

    pub fn is_tombstone(&self) -> bool {
        self.version == TOMBSTONE_VERSION
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}:{}@{}", self.hash, self.version, self.position)
    }
}

/// Logical index key built per event before its log position is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexKey {
    pub stream_id: String,
    pub version: u64,
    pub hash: u32,
}

impl IndexKey {
    pub fn new(stream_id: impl Into<String>, version: u64) -> Self {
        Self::with_hash(stream_id, version, 0)
    }

    pub fn with_hash(stream_id: impl Into<String>, version: u64, hash: u32) -> Self {
        Self {
            stream_id: stream_id.into(),
            version,
            hash,
        }
    }

    pub fn resolve(mut self, hasher: StreamHasher) -> Self {
        self.hash = hasher(&self.stream_id);
        self
    }

    pub fn into_stream_key(self, position: u64) -> Result<StreamKey> {
        if self.version > MAX_EVENT_VERSION {
            return Err(StoreError::VersionExhausted(self.stream_id));
        }
        Ok(StreamKey::new(self.hash, self.version as u32, position))
    }
}

pub fn encode_position(position: u64) -> [u8; POSITION_KEY_LEN] {
    position.to_be_bytes()
}

pub fn decode_position(bytes: &[u8]) -> Result<u64> {
    let buf: [u8; POSITION_KEY_LEN] = bytes.try_into().map_err(|_| {
        StoreError::MalformedKey(format!(
            "expected {POSITION_KEY_LEN}-byte position key, found {} bytes",
            bytes.len()
        ))
    })?;
    Ok(u64::from_be_bytes(buf))
}
