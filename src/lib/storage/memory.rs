use std::{
    collections::BTreeMap,
    ops::Bound,
    sync::Arc,
};

use parking_lot::RwLock;

use super::{BatchOp, Direction, IndexStore, KeySpace, KvIter, ReadView, WriteBatch};
use crate::error::Result;

type Space = BTreeMap<Vec<u8>, Vec<u8>>;
type Spaces = [Arc<Space>; 3];

/// Ephemeral index store.
///
/// Each key space is shared with live snapshots and copied on the first
/// write that touches it while a snapshot still holds it. A write racing a
/// reader therefore costs O(n) in the size of every key space it touches;
/// spaces the batch leaves alone stay shared. Meant for tests and short-lived
/// stores, not large data sets.
#[derive(Debug, Default)]
pub struct MemoryIndexStore {
    spaces: RwLock<Spaces>,
}

pub struct MemorySnapshot {
    spaces: Spaces,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, space: KeySpace) -> usize {
        self.spaces.read()[space.slot()].len()
    }
}

impl IndexStore for MemoryIndexStore {
    type Snapshot<'a> = MemorySnapshot;

    fn snapshot(&self) -> Self::Snapshot<'_> {
        MemorySnapshot {
            spaces: self.spaces.read().clone(),
        }
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<()> {
        let mut spaces = self.spaces.write();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { space, key, value } => {
                    Arc::make_mut(&mut spaces[space.slot()]).insert(key, value);
                }
                BatchOp::Delete { space, key } => {
                    Arc::make_mut(&mut spaces[space.slot()]).remove(&key);
                }
            }
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn compact_range(
        &self,
        _space: KeySpace,
        _start: Option<&[u8]>,
        _end: Option<&[u8]>,
    ) -> Result<()> {
        Ok(())
    }

    fn close(self) -> Result<()> {
        Ok(())
    }
}

impl ReadView for MemorySnapshot {
    fn get(&self, space: KeySpace, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.spaces[space.slot()].get(key).cloned())
    }

    fn iterate_range<'a>(
        &'a self,
        space: KeySpace,
        start: &[u8],
        end: Option<&[u8]>,
        direction: Direction,
    ) -> Result<KvIter<'a>> {
        if end.is_some_and(|end| end <= start) {
            return Ok(Box::new(std::iter::empty()));
        }
        let upper = match end {
            Some(end) => Bound::Excluded(end),
            None => Bound::Unbounded,
        };
        let range = self.spaces[space.slot()]
            .range::<[u8], _>((Bound::Included(start), upper))
            .map(|(key, value)| {
                Ok((
                    key.clone().into_boxed_slice(),
                    value.clone().into_boxed_slice(),
                ))
            });
        Ok(match direction {
            Direction::Forward => Box::new(range),
            Direction::Backward => Box::new(range.rev()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tests::exercise_engine;

    #[test]
    fn memory_engine_behaviour() {
        let store = MemoryIndexStore::new();
        exercise_engine(&store);
        assert_eq!(store.len(KeySpace::StreamIndex), 4);
        store.close().unwrap();
    }

    #[test]
    fn writes_copy_only_the_spaces_they_touch() {
        let store = MemoryIndexStore::new();
        let mut batch = WriteBatch::default();
        batch.put(KeySpace::Streams, b"orders-1".to_vec(), vec![1]);
        batch.put(KeySpace::All, vec![0], vec![2]);
        store.write_batch(batch).unwrap();

        let before = store.snapshot();
        let mut batch = WriteBatch::default();
        batch.put(KeySpace::All, vec![1], vec![3]);
        store.write_batch(batch).unwrap();
        let after = store.snapshot();

        let streams = KeySpace::Streams.slot();
        let all = KeySpace::All.slot();
        assert!(Arc::ptr_eq(&before.spaces[streams], &after.spaces[streams]));
        assert!(!Arc::ptr_eq(&before.spaces[all], &after.spaces[all]));
        assert_eq!(before.spaces[all].len(), 1);
        assert_eq!(after.spaces[all].len(), 2);
    }

    #[test]
    fn empty_or_inverted_range_yields_nothing() {
        let store = MemoryIndexStore::new();
        let mut batch = WriteBatch::default();
        batch.put(KeySpace::All, vec![5], vec![]);
        store.write_batch(batch).unwrap();

        let snapshot = store.snapshot();
        for direction in [Direction::Forward, Direction::Backward] {
            assert_eq!(
                snapshot
                    .iterate_range(KeySpace::All, &[6], Some(&[5]), direction)
                    .unwrap()
                    .count(),
                0
            );
        }
    }
}
