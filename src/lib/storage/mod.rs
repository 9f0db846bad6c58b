//! Storage abstraction over an embedded sorted key-value engine.
//!
//! Reads always go through a [`ReadView`] obtained from
//! [`IndexStore::snapshot`]; the view is a consistent point-in-time image
//! released when dropped. Writes are grouped into a [`WriteBatch`] that
//! commits atomically.

mod memory;
mod rocks;

use serde::Serialize;

use crate::error::Result;

pub use memory::{MemoryIndexStore, MemorySnapshot};
pub use rocks::{RocksIndexStore, RocksSnapshot};

pub type KvPair = (Box<[u8]>, Box<[u8]>);
pub type KvIter<'a> = Box<dyn Iterator<Item = Result<KvPair>> + 'a>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySpace {
    /// 16-byte stream keys to index values.
    StreamIndex,
    /// Global log positions to `(stream, version)`.
    All,
    /// Stream names to stream records.
    Streams,
}

impl KeySpace {
    pub const ALL: [KeySpace; 3] = [KeySpace::StreamIndex, KeySpace::All, KeySpace::Streams];

    pub fn name(self) -> &'static str {
        match self {
            KeySpace::StreamIndex => "stream_index",
            KeySpace::All => "all",
            KeySpace::Streams => "streams",
        }
    }

    fn slot(self) -> usize {
        match self {
            KeySpace::StreamIndex => 0,
            KeySpace::All => 1,
            KeySpace::Streams => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put {
        space: KeySpace,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    Delete {
        space: KeySpace,
        key: Vec<u8>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn put(&mut self, space: KeySpace, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Put {
            space,
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn delete(&mut self, space: KeySpace, key: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Delete {
            space,
            key: key.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

pub trait ReadView {
    fn get(&self, space: KeySpace, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Lazily iterates keys in `[start, end)`; `end = None` is unbounded.
    /// Backward iteration yields the same keys in descending order.
    fn iterate_range<'a>(
        &'a self,
        space: KeySpace,
        start: &[u8],
        end: Option<&[u8]>,
        direction: Direction,
    ) -> Result<KvIter<'a>>;

    fn iterate_prefix<'a>(&'a self, space: KeySpace, prefix: &[u8]) -> Result<KvIter<'a>> {
        let end = crate::codec::prefix_successor(prefix);
        self.iterate_range(space, prefix, end.as_deref(), Direction::Forward)
    }
}

pub trait IndexStore: Send + Sync {
    type Snapshot<'a>: ReadView
    where
        Self: 'a;

    fn snapshot(&self) -> Self::Snapshot<'_>;

    fn write_batch(&self, batch: WriteBatch) -> Result<()>;

    fn flush(&self) -> Result<()>;

    /// Asks the engine to physically reclaim deleted entries in `[start, end)`.
    fn compact_range(&self, space: KeySpace, start: Option<&[u8]>, end: Option<&[u8]>)
    -> Result<()>;

    fn close(self) -> Result<()>
    where
        Self: Sized;

    fn get(&self, space: KeySpace, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.snapshot().get(space, key)
    }
}

/// Clamps a raw engine iterator, positioned at the first candidate key, to
/// `[start, end)`.
pub(crate) fn bounded<'a, I>(
    iter: I,
    start: Vec<u8>,
    end: Option<Vec<u8>>,
    direction: Direction,
) -> KvIter<'a>
where
    I: Iterator<Item = Result<KvPair>> + 'a,
{
    match direction {
        Direction::Forward => Box::new(iter.take_while(move |item| match item {
            Ok((key, _)) => end.as_deref().map_or(true, |end| key.as_ref() < end),
            Err(_) => true,
        })),
        Direction::Backward => Box::new(
            iter.skip_while(move |item| match item {
                Ok((key, _)) => end.as_deref().is_some_and(|end| key.as_ref() >= end),
                Err(_) => false,
            })
            .take_while(move |item| match item {
                Ok((key, _)) => key.as_ref() >= start.as_slice(),
                Err(_) => true,
            }),
        ),
    }
}
