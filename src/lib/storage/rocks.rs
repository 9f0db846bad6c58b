use std::{path::Path, sync::Arc, time::Instant};

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, SnapshotWithThreadMode, WriteOptions,
};
use tracing::debug;

use super::{BatchOp, Direction, IndexStore, KeySpace, KvIter, ReadView, WriteBatch, bounded};
use crate::{
    error::{Result, StoreError},
    observability::record_store_op,
};

type Db = DBWithThreadMode<MultiThreaded>;

/// Index store backed by RocksDB, one column family per key space.
pub struct RocksIndexStore {
    db: Db,
    sync_writes: bool,
}

pub struct RocksSnapshot<'a> {
    db: &'a Db,
    snapshot: SnapshotWithThreadMode<'a, Db>,
}

impl RocksIndexStore {
    pub fn open(path: impl AsRef<Path>, sync_writes: bool) -> Result<Self> {
        let path = path.as_ref();
        let mut options = Options::default();
        options.create_if_missing(true);
        options.create_missing_column_families(true);

        let descriptors = KeySpace::ALL
            .iter()
            .map(|space| ColumnFamilyDescriptor::new(space.name(), Options::default()))
            .collect::<Vec<_>>();
        let db = Db::open_cf_descriptors(&options, path, descriptors)
            .map_err(|err| StoreError::Storage(err.to_string()))?;
        debug!(path = %path.display(), sync_writes, "opened rocksdb index store");

        Ok(Self { db, sync_writes })
    }
}

fn column<'a>(db: &'a Db, space: KeySpace) -> Result<Arc<BoundColumnFamily<'a>>> {
    db.cf_handle(space.name()).ok_or_else(|| {
        StoreError::Storage(format!("column family '{}' is missing", space.name()))
    })
}

impl IndexStore for RocksIndexStore {
    type Snapshot<'a> = RocksSnapshot<'a>;

    fn snapshot(&self) -> Self::Snapshot<'_> {
        RocksSnapshot {
            db: &self.db,
            snapshot: self.db.snapshot(),
        }
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<()> {
        let start = Instant::now();
        let result = (|| {
            let mut native = rocksdb::WriteBatch::default();
            for op in batch.into_ops() {
                match op {
                    BatchOp::Put { space, key, value } => {
                        native.put_cf(&column(&self.db, space)?, key, value)
                    }
                    BatchOp::Delete { space, key } => {
                        native.delete_cf(&column(&self.db, space)?, key)
                    }
                }
            }
            let mut options = WriteOptions::default();
            options.set_sync(self.sync_writes);
            self.db
                .write_opt(native, &options)
                .map_err(|err| StoreError::Storage(err.to_string()))
        })();
        record_store_op(
            "rocksdb_write",
            if result.is_ok() { "ok" } else { "err" },
            start.elapsed().as_secs_f64(),
        );
        result
    }

    fn flush(&self) -> Result<()> {
        for space in KeySpace::ALL {
            self.db.flush_cf(&column(&self.db, space)?)?;
        }
        self.db.flush_wal(true)?;
        Ok(())
    }

    fn compact_range(
        &self,
        space: KeySpace,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<()> {
        let started = Instant::now();
        let cf = column(&self.db, space)?;
        self.db.compact_range_cf(&cf, start, end);
        record_store_op("rocksdb_compact", "ok", started.elapsed().as_secs_f64());
        Ok(())
    }

    fn close(self) -> Result<()> {
        self.flush()?;
        drop(self);
        Ok(())
    }
}

impl ReadView for RocksSnapshot<'_> {
    fn get(&self, space: KeySpace, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let start = Instant::now();
        let result = column(self.db, space).and_then(|cf| {
            self.snapshot
                .get_cf(&cf, key)
                .map_err(|err| StoreError::Storage(err.to_string()))
        });
        record_store_op(
            "rocksdb_get",
            if result.is_ok() { "ok" } else { "err" },
            start.elapsed().as_secs_f64(),
        );
        result
    }

    fn iterate_range<'a>(
        &'a self,
        space: KeySpace,
        start: &[u8],
        end: Option<&[u8]>,
        direction: Direction,
    ) -> Result<KvIter<'a>> {
        let cf = column(self.db, space)?;
        let mode = match (direction, end) {
            (Direction::Forward, _) => IteratorMode::From(start, rocksdb::Direction::Forward),
            (Direction::Backward, Some(end)) => IteratorMode::From(end, rocksdb::Direction::Reverse),
            (Direction::Backward, None) => IteratorMode::End,
        };
        let raw = self
            .snapshot
            .iterator_cf(&cf, mode)
            .map(|item| item.map_err(|err| StoreError::Storage(err.to_string())));
        Ok(bounded(
            raw,
            start.to_vec(),
            end.map(<[u8]>::to_vec),
            direction,
        ))
    }
}
