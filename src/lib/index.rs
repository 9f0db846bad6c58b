//! Stream index: maps `(stream, version)` to log positions and enforces
//! optimistic concurrency on writes.
//!
//! Appends and deletes hold the lock stripe of the stream hash across the
//! check and the batch write. Log positions are taken and committed under a
//! single commit lock, so `$all` becomes visible in position order. Reads
//! never lock; each works on one snapshot.

use std::time::Instant;

use chrono::Utc;
use parking_lot::{Mutex, MutexGuard};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    codec::{
        self, IndexKey, MAX_EVENT_VERSION, StreamHasher, StreamKey, TOMBSTONE_VERSION,
        decode_position, encode_position, prefix_successor, stream_prefix, version_prefix,
    },
    config::{Config, DEFAULT_LOCK_STRIPES, DEFAULT_MAX_READ_COUNT},
    error::{Result, StoreError},
    expected_version::{ExpectedVersion, Resolution},
    log::{EventLog, FileLog, MemoryLog},
    observability::record_index_op,
    storage::{
        Direction, IndexStore, KeySpace, MemoryIndexStore, ReadView, RocksIndexStore, WriteBatch,
    },
    system_streams::{self, ALL_STREAM, STREAM_DELETED_EVENT_TYPE},
    types::{
        AllEntry, AllSlice, AllValue, AppendResult, DeleteMode, DeleteResult, EventData,
        IndexValue, IndexedEvent, Position, ReadStatus, RecordedEvent, StreamInfo, StreamRecord,
        StreamSlice,
    },
};

/// `from_version` for a backward read starting at the current head.
pub const END_OF_STREAM: u64 = u64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOptions {
    pub lock_stripes: usize,
    pub max_read_count: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            lock_stripes: DEFAULT_LOCK_STRIPES,
            max_read_count: DEFAULT_MAX_READ_COUNT,
        }
    }
}

impl From<&Config> for IndexOptions {
    fn from(config: &Config) -> Self {
        Self {
            lock_stripes: config.lock_stripes,
            max_read_count: config.max_read_count,
        }
    }
}

struct StreamLocks {
    stripes: Box<[Mutex<()>]>,
}

impl StreamLocks {
    fn new(count: usize) -> Self {
        Self {
            stripes: (0..count.max(1)).map(|_| Mutex::new(())).collect(),
        }
    }

    fn lock(&self, hash: u32) -> MutexGuard<'_, ()> {
        self.stripes[hash as usize % self.stripes.len()].lock()
    }
}

#[derive(Debug, Clone, Copy)]
struct Tombstone {
    mode: DeleteMode,
    key: StreamKey,
}

#[derive(Debug, Default)]
struct StreamState {
    head: Option<u64>,
    tombstone: Option<Tombstone>,
}

impl StreamState {
    fn deleted(&self) -> Option<DeleteMode> {
        self.tombstone.map(|tombstone| tombstone.mode)
    }
}

pub struct StreamIndex<S: IndexStore, L: EventLog> {
    store: S,
    log: L,
    locks: StreamLocks,
    /// Held from the first log append to the batch write.
    commit: Mutex<()>,
    hasher: StreamHasher,
    max_read_count: usize,
}

pub type RocksStreamIndex = StreamIndex<RocksIndexStore, FileLog>;
pub type MemoryStreamIndex = StreamIndex<MemoryIndexStore, MemoryLog>;

impl StreamIndex<RocksIndexStore, FileLog> {
    /// Opens the RocksDB index and the file log under `config.data_dir`.
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        config.ensure_data_dir()?;
        let store = RocksIndexStore::open(config.index_path(), config.sync_writes)?;
        let log = FileLog::open(config.log_path(), config.sync_writes)?;
        info!(data_dir = %config.data_dir.display(), "opened stream index");
        Ok(Self::new(store, log, IndexOptions::from(config)))
    }
}

impl StreamIndex<MemoryIndexStore, MemoryLog> {
    pub fn in_memory() -> Self {
        Self::new(
            MemoryIndexStore::new(),
            MemoryLog::new(),
            IndexOptions::default(),
        )
    }
}

impl<S: IndexStore, L: EventLog> StreamIndex<S, L> {
    pub fn new(store: S, log: L, options: IndexOptions) -> Self {
        Self {
            store,
            log,
            locks: StreamLocks::new(options.lock_stripes),
            commit: Mutex::new(()),
            hasher: codec::hash_of,
            max_read_count: options.max_read_count.max(1),
        }
    }

    /// Replaces the stream hash function. The same hasher must be used for
    /// the whole life of the data directory.
    pub fn with_hasher(mut self, hasher: StreamHasher) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn append(
        &self,
        stream_id: &str,
        expected: ExpectedVersion,
        events: &[EventData],
    ) -> Result<AppendResult> {
        let start = Instant::now();
        let result = self.append_inner(stream_id, expected, events);
        record_index_op("append", status_of(&result), start.elapsed().as_secs_f64());
        result
    }

    fn append_inner(
        &self,
        stream_id: &str,
        expected: ExpectedVersion,
        events: &[EventData],
    ) -> Result<AppendResult> {
        ensure_stream_id(stream_id)?;
        let hash = (self.hasher)(stream_id);
        let _guard = self.locks.lock(hash);
        let snapshot = self.store.snapshot();

        let state = self.stream_state(&snapshot, stream_id, hash)?;
        if state.deleted() == Some(DeleteMode::Hard) {
            return Err(StoreError::StreamDeleted {
                stream: stream_id.to_string(),
                hard: true,
            });
        }
        self.check_expected(&snapshot, stream_id, expected, &state)?;
        if state.deleted() == Some(DeleteMode::Soft) {
            return Err(StoreError::StreamDeleted {
                stream: stream_id.to_string(),
                hard: false,
            });
        }
        if events.is_empty() {
            return Ok(AppendResult {
                head: state.head,
                positions: Vec::new(),
            });
        }

        let first_version = state.head.map_or(0, |head| head + 1);
        let last_version = first_version + events.len() as u64 - 1;
        if last_version > MAX_EVENT_VERSION {
            return Err(StoreError::VersionExhausted(stream_id.to_string()));
        }

        let mut batch = WriteBatch::default();
        if snapshot.get(KeySpace::Streams, stream_id.as_bytes())?.is_none() {
            let record = StreamRecord {
                hash,
                created_at: Utc::now(),
            };
            batch.put(
                KeySpace::Streams,
                stream_id.as_bytes(),
                serde_json::to_vec(&record)?,
            );
        }
        drop(snapshot);

        let index_value = serde_json::to_vec(&IndexValue {
            stream: stream_id.to_string(),
            tombstone: None,
        })?;
        let mut positions = Vec::with_capacity(events.len());
        let _commit = self.commit.lock();
        for (version, event) in (first_version..).zip(events) {
            let record = RecordedEvent {
                stream_id: stream_id.to_string(),
                version,
                event_id: event.event_id,
                event_type: event.event_type.clone(),
                data: event.data.clone(),
                metadata: event.metadata.clone(),
                created_at: Utc::now(),
                position: 0,
            };
            let position = self.log.append(&serde_json::to_vec(&record)?)?;
            let key = IndexKey::new(stream_id, version)
                .resolve(self.hasher)
                .into_stream_key(position)?;
            batch.put(KeySpace::StreamIndex, key.encode(), index_value.clone());
            batch.put(
                KeySpace::All,
                encode_position(position),
                serde_json::to_vec(&AllValue {
                    stream: stream_id.to_string(),
                    version,
                })?,
            );
            positions.push(position);
        }
        self.store.write_batch(batch)?;

        debug!(
            stream = stream_id,
            first_version,
            last_version,
            count = events.len(),
            "appended events"
        );
        Ok(AppendResult {
            head: Some(last_version),
            positions,
        })
    }

    pub fn read_forward(
        &self,
        stream_id: &str,
        from_version: u64,
        max_count: usize,
    ) -> Result<StreamSlice> {
        let start = Instant::now();
        let result = self.read_forward_inner(stream_id, from_version, max_count);
        record_index_op(
            "read_forward",
            status_of(&result),
            start.elapsed().as_secs_f64(),
        );
        result
    }

    fn read_forward_inner(
        &self,
        stream_id: &str,
        from_version: u64,
        max_count: usize,
    ) -> Result<StreamSlice> {
        ensure_stream_id(stream_id)?;
        let max_count = max_count.min(self.max_read_count);
        let hash = (self.hasher)(stream_id);
        let snapshot = self.store.snapshot();
        let state = self.stream_state(&snapshot, stream_id, hash)?;
        let status = read_status(stream_id, &state)?;

        let Some(head) = state.head else {
            return Ok(StreamSlice::empty(stream_id, status, Direction::Forward));
        };
        let mut slice = StreamSlice {
            stream_id: stream_id.to_string(),
            status,
            direction: Direction::Forward,
            entries: Vec::new(),
            next_version: None,
            last_version: Some(head),
            is_end_of_stream: from_version > head,
        };
        if from_version > head {
            return Ok(slice);
        }
        if max_count == 0 {
            slice.next_version = Some(from_version);
            return Ok(slice);
        }

        let lower = version_prefix(hash, from_version as u32);
        let upper = version_prefix(hash, TOMBSTONE_VERSION);
        let iter = snapshot.iterate_range(
            KeySpace::StreamIndex,
            &lower,
            Some(&upper),
            Direction::Forward,
        )?;
        for item in iter {
            let (raw_key, raw_value) = item?;
            let key = StreamKey::decode(&raw_key)?;
            if self.confirm(&key, &raw_value, stream_id)?.is_none() {
                continue;
            }
            slice.entries.push(IndexedEvent {
                version: u64::from(key.version),
                position: key.position,
            });
            if slice.entries.len() == max_count {
                break;
            }
        }

        match slice.entries.last() {
            Some(last) if last.version < head => slice.next_version = Some(last.version + 1),
            _ => slice.is_end_of_stream = true,
        }
        Ok(slice)
    }

    /// Reads from `from_version` (or the head, if `from_version` is above it)
    /// down towards version 0.
    pub fn read_backward(
        &self,
        stream_id: &str,
        from_version: u64,
        max_count: usize,
    ) -> Result<StreamSlice> {
        let start = Instant::now();
        let result = self.read_backward_inner(stream_id, from_version, max_count);
        record_index_op(
            "read_backward",
            status_of(&result),
            start.elapsed().as_secs_f64(),
        );
        result
    }

    fn read_backward_inner(
        &self,
        stream_id: &str,
        from_version: u64,
        max_count: usize,
    ) -> Result<StreamSlice> {
        ensure_stream_id(stream_id)?;
        let max_count = max_count.min(self.max_read_count);
        let hash = (self.hasher)(stream_id);
        let snapshot = self.store.snapshot();
        let state = self.stream_state(&snapshot, stream_id, hash)?;
        let status = read_status(stream_id, &state)?;

        let Some(head) = state.head else {
            return Ok(StreamSlice::empty(stream_id, status, Direction::Backward));
        };
        let from_version = from_version.min(head);
        let mut slice = StreamSlice {
            stream_id: stream_id.to_string(),
            status,
            direction: Direction::Backward,
            entries: Vec::new(),
            next_version: Some(from_version),
            last_version: Some(head),
            is_end_of_stream: false,
        };
        if max_count == 0 {
            return Ok(slice);
        }

        let lower = stream_prefix(hash);
        let upper = version_prefix(hash, from_version as u32 + 1);
        let iter = snapshot.iterate_range(
            KeySpace::StreamIndex,
            &lower,
            Some(&upper),
            Direction::Backward,
        )?;
        for item in iter {
            let (raw_key, raw_value) = item?;
            let key = StreamKey::decode(&raw_key)?;
            if self.confirm(&key, &raw_value, stream_id)?.is_none() {
                continue;
            }
            slice.entries.push(IndexedEvent {
                version: u64::from(key.version),
                position: key.position,
            });
            if slice.entries.len() == max_count {
                break;
            }
        }

        match slice.entries.last() {
            Some(last) if last.version > 0 => slice.next_version = Some(last.version - 1),
            _ => {
                slice.next_version = None;
                slice.is_end_of_stream = true;
            }
        }
        Ok(slice)
    }

    /// Soft delete keeps history readable and blocks further writes; hard
    /// delete also drops every index entry of the stream.
    pub fn delete_stream(
        &self,
        stream_id: &str,
        expected: ExpectedVersion,
        hard: bool,
    ) -> Result<DeleteResult> {
        let start = Instant::now();
        let result = self.delete_stream_inner(stream_id, expected, DeleteMode::from_hard(hard));
        record_index_op(
            if hard { "hard_delete" } else { "soft_delete" },
            status_of(&result),
            start.elapsed().as_secs_f64(),
        );
        result
    }

    fn delete_stream_inner(
        &self,
        stream_id: &str,
        expected: ExpectedVersion,
        mode: DeleteMode,
    ) -> Result<DeleteResult> {
        ensure_stream_id(stream_id)?;
        let hash = (self.hasher)(stream_id);
        let _guard = self.locks.lock(hash);
        let snapshot = self.store.snapshot();

        let state = self.stream_state(&snapshot, stream_id, hash)?;
        if state.deleted() == Some(DeleteMode::Hard) {
            return Err(StoreError::StreamDeleted {
                stream: stream_id.to_string(),
                hard: true,
            });
        }
        self.check_expected(&snapshot, stream_id, expected, &state)?;
        if state.deleted() == Some(DeleteMode::Soft) && !mode.is_hard() {
            return Err(StoreError::StreamDeleted {
                stream: stream_id.to_string(),
                hard: false,
            });
        }

        let mut batch = WriteBatch::default();
        if snapshot.get(KeySpace::Streams, stream_id.as_bytes())?.is_none() {
            let record = StreamRecord {
                hash,
                created_at: Utc::now(),
            };
            batch.put(
                KeySpace::Streams,
                stream_id.as_bytes(),
                serde_json::to_vec(&record)?,
            );
        }
        if let Some(previous) = state.tombstone {
            batch.delete(KeySpace::StreamIndex, previous.key.encode());
            batch.delete(KeySpace::All, encode_position(previous.key.position));
        }

        let mut removed_entries = 0usize;
        if mode.is_hard() {
            let lower = stream_prefix(hash);
            let upper = version_prefix(hash, TOMBSTONE_VERSION);
            let iter = snapshot.iterate_range(
                KeySpace::StreamIndex,
                &lower,
                Some(&upper),
                Direction::Forward,
            )?;
            for item in iter {
                let (raw_key, raw_value) = item?;
                let key = StreamKey::decode(&raw_key)?;
                if self.confirm(&key, &raw_value, stream_id)?.is_none() {
                    continue;
                }
                batch.delete(KeySpace::StreamIndex, raw_key.to_vec());
                batch.delete(KeySpace::All, encode_position(key.position));
                removed_entries += 1;
            }
        }
        drop(snapshot);

        let tombstone_version = u64::from(TOMBSTONE_VERSION);
        let record = RecordedEvent {
            stream_id: stream_id.to_string(),
            version: tombstone_version,
            event_id: Uuid::new_v4(),
            event_type: STREAM_DELETED_EVENT_TYPE.to_string(),
            data: json!({ "hard": mode.is_hard(), "last_version": state.head }),
            metadata: None,
            created_at: Utc::now(),
            position: 0,
        };
        let _commit = self.commit.lock();
        let position = self.log.append(&serde_json::to_vec(&record)?)?;
        let key = StreamKey::new(hash, TOMBSTONE_VERSION, position);
        batch.put(
            KeySpace::StreamIndex,
            key.encode(),
            serde_json::to_vec(&IndexValue {
                stream: stream_id.to_string(),
                tombstone: Some(mode),
            })?,
        );
        batch.put(
            KeySpace::All,
            encode_position(position),
            serde_json::to_vec(&AllValue {
                stream: stream_id.to_string(),
                version: tombstone_version,
            })?,
        );
        self.store.write_batch(batch)?;

        info!(
            stream = stream_id,
            mode = ?mode,
            removed_entries,
            tombstone_position = position,
            "deleted stream"
        );
        Ok(DeleteResult {
            mode,
            tombstone_position: position,
            removed_entries,
        })
    }

    /// Reads `$all` in log order starting at `from` (inclusive).
    pub fn read_all_forward(&self, from: Position, max_count: usize) -> Result<AllSlice> {
        let start = Instant::now();
        let result = self.read_all(from, max_count, Direction::Forward);
        record_index_op(
            "read_all_forward",
            status_of(&result),
            start.elapsed().as_secs_f64(),
        );
        result
    }

    /// Reads `$all` in reverse log order from just before `from`;
    /// `Position::END` starts at the last committed entry.
    pub fn read_all_backward(&self, from: Position, max_count: usize) -> Result<AllSlice> {
        let start = Instant::now();
        let result = self.read_all(from, max_count, Direction::Backward);
        record_index_op(
            "read_all_backward",
            status_of(&result),
            start.elapsed().as_secs_f64(),
        );
        result
    }

    fn read_all(&self, from: Position, max_count: usize, direction: Direction) -> Result<AllSlice> {
        let max_count = max_count.min(self.max_read_count);
        let mut slice = AllSlice {
            direction,
            entries: Vec::new(),
            next_position: from,
            is_end: false,
        };
        let snapshot = self.store.snapshot();
        let bound = from.offset().map(encode_position);
        let iter = match direction {
            Direction::Forward => {
                let Some(lower) = bound else {
                    slice.is_end = true;
                    return Ok(slice);
                };
                snapshot.iterate_range(KeySpace::All, &lower, None, direction)?
            }
            Direction::Backward => snapshot.iterate_range(
                KeySpace::All,
                &encode_position(0),
                bound.as_ref().map(|bound| bound.as_slice()),
                direction,
            )?,
        };

        let mut iter = iter;
        while slice.entries.len() < max_count {
            let Some(item) = iter.next() else {
                break;
            };
            let (raw_key, raw_value) = item?;
            let value: AllValue = serde_json::from_slice(&raw_value)?;
            slice.entries.push(AllEntry {
                position: decode_position(&raw_key)?,
                stream_id: value.stream,
                version: value.version,
            });
        }

        match iter.next().transpose()? {
            Some((raw_key, _)) => {
                let next = decode_position(&raw_key)?;
                slice.next_position = match direction {
                    Direction::Forward => Position::at(next),
                    Direction::Backward => Position::at(next + 1),
                };
            }
            None => {
                slice.is_end = true;
                if let Some(last) = slice.entries.last() {
                    slice.next_position = match direction {
                        Direction::Forward => Position::at(last.position + 1),
                        Direction::Backward => Position::at(last.position),
                    };
                }
            }
        }
        Ok(slice)
    }

    pub fn read_event(&self, position: u64) -> Result<RecordedEvent> {
        let bytes = self.log.read_at(position)?;
        let mut event: RecordedEvent = serde_json::from_slice(&bytes).map_err(|err| {
            StoreError::LogCorrupted {
                position,
                reason: err.to_string(),
            }
        })?;
        event.position = position;
        Ok(event)
    }

    /// Loads the log records referenced by a slice, in slice order.
    pub fn load_events(&self, slice: &StreamSlice) -> Result<Vec<RecordedEvent>> {
        slice
            .entries
            .iter()
            .map(|entry| self.read_event(entry.position))
            .collect()
    }

    pub fn stream_info(&self, stream_id: &str) -> Result<StreamInfo> {
        ensure_stream_id(stream_id)?;
        let hash = (self.hasher)(stream_id);
        let snapshot = self.store.snapshot();
        let state = self.stream_state(&snapshot, stream_id, hash)?;
        let created_at = snapshot
            .get(KeySpace::Streams, stream_id.as_bytes())?
            .map(|raw| serde_json::from_slice::<StreamRecord>(&raw))
            .transpose()?
            .map(|record| record.created_at);
        Ok(StreamInfo {
            stream_id: stream_id.to_string(),
            hash,
            head: state.head,
            deleted: state.deleted(),
            created_at,
        })
    }

    /// Stream names in byte order, starting after `after`.
    pub fn list_streams(&self, after: Option<&str>, max_count: usize) -> Result<Vec<String>> {
        let max_count = max_count.min(self.max_read_count);
        let snapshot = self.store.snapshot();
        let lower = match after {
            Some(after) => {
                let mut lower = after.as_bytes().to_vec();
                lower.push(0);
                lower
            }
            None => Vec::new(),
        };
        let mut streams = Vec::new();
        for item in snapshot
            .iterate_range(KeySpace::Streams, &lower, None, Direction::Forward)?
            .take(max_count)
        {
            let (raw_key, _) = item?;
            let name = String::from_utf8(raw_key.to_vec()).map_err(|err| {
                StoreError::MalformedKey(format!("stream name is not valid utf-8: {err}"))
            })?;
            streams.push(name);
        }
        Ok(streams)
    }

    pub fn flush(&self) -> Result<()> {
        let start = Instant::now();
        let result = self.log.flush().and_then(|_| self.store.flush());
        record_index_op("flush", status_of(&result), start.elapsed().as_secs_f64());
        result
    }

    /// Compacts every key space so entries removed by hard deletes are
    /// physically reclaimed.
    pub fn scavenge(&self) -> Result<()> {
        let start = Instant::now();
        let result = KeySpace::ALL
            .iter()
            .try_for_each(|space| self.store.compact_range(*space, None, None));
        record_index_op("scavenge", status_of(&result), start.elapsed().as_secs_f64());
        if result.is_ok() {
            info!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                "scavenge completed"
            );
        }
        result
    }

    pub fn close(self) -> Result<()> {
        self.flush()?;
        self.store.close()
    }

    /// Finds the head and tombstone of `stream_id` by scanning its hash
    /// prefix from the highest key down.
    fn stream_state<V: ReadView>(
        &self,
        view: &V,
        stream_id: &str,
        hash: u32,
    ) -> Result<StreamState> {
        let lower = stream_prefix(hash);
        let upper = prefix_successor(&lower);
        let mut state = StreamState::default();
        for item in view.iterate_range(
            KeySpace::StreamIndex,
            &lower,
            upper.as_deref(),
            Direction::Backward,
        )? {
            let (raw_key, raw_value) = item?;
            let key = StreamKey::decode(&raw_key)?;
            let Some(value) = self.confirm(&key, &raw_value, stream_id)? else {
                continue;
            };
            match value.tombstone {
                Some(mode) if key.is_tombstone() => {
                    state.tombstone = Some(Tombstone { mode, key });
                }
                _ => {
                    state.head = Some(u64::from(key.version));
                    break;
                }
            }
        }
        Ok(state)
    }

    fn check_expected<V: ReadView>(
        &self,
        view: &V,
        stream_id: &str,
        expected: ExpectedVersion,
        state: &StreamState,
    ) -> Result<()> {
        let metastream_present = if expected.needs_metastream(state.head) {
            let metastream = system_streams::metastream_of(stream_id);
            let hash = (self.hasher)(&metastream);
            let meta = self.stream_state(view, &metastream, hash)?;
            meta.head.is_some() || meta.tombstone.is_some()
        } else {
            false
        };
        match expected.resolve(state.head, metastream_present) {
            Resolution::Proceed => Ok(()),
            Resolution::Conflict => Err(StoreError::WrongExpectedVersion {
                stream: stream_id.to_string(),
                expected,
                current: state.head,
            }),
        }
    }

    /// Confirms an entry reached through a hash-prefix scan against the
    /// literal stream name stored in its value. `None` means the entry
    /// belongs to a different stream sharing the hash.
    fn confirm(
        &self,
        key: &StreamKey,
        raw_value: &[u8],
        stream_id: &str,
    ) -> Result<Option<IndexValue>> {
        let value: IndexValue = serde_json::from_slice(raw_value)?;
        if value.stream == stream_id {
            return Ok(Some(value));
        }
        if (self.hasher)(&value.stream) == key.hash {
            return Ok(None);
        }
        warn!(
            key = %key,
            stored_stream = %value.stream,
            "index entry does not belong to its hash prefix"
        );
        Err(StoreError::MalformedKey(format!(
            "entry {key} names stream '{}' which does not hash to {:08x}",
            value.stream, key.hash
        )))
    }
}

fn ensure_stream_id(stream_id: &str) -> Result<()> {
    if stream_id.is_empty() {
        return Err(StoreError::InvalidStreamId(
            "stream id must not be empty".to_string(),
        ));
    }
    if stream_id == ALL_STREAM {
        return Err(StoreError::InvalidStreamId(format!(
            "'{ALL_STREAM}' is read through the global log readers"
        )));
    }
    Ok(())
}

fn read_status(stream_id: &str, state: &StreamState) -> Result<ReadStatus> {
    match state.deleted() {
        Some(DeleteMode::Hard) => Err(StoreError::StreamDeleted {
            stream: stream_id.to_string(),
            hard: true,
        }),
        Some(DeleteMode::Soft) => Ok(ReadStatus::SoftDeleted),
        None if state.head.is_none() => Ok(ReadStatus::NoStream),
        None => Ok(ReadStatus::Success),
    }
}

fn status_of<T>(result: &Result<T>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(StoreError::WrongExpectedVersion { .. }) => "conflict",
        Err(StoreError::StreamDeleted { .. }) => "deleted",
        Err(_) => "err",
    }
}
