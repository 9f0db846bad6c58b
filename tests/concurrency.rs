use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;

use ruscello::{
    EventData, ExpectedVersion, IndexOptions, Position, StoreError, StreamIndex, config::Config,
    log::{EventLog, MemoryLog},
    storage::MemoryIndexStore,
};

const WRITERS: usize = 8;

fn race<S, L>(index: Arc<StreamIndex<S, L>>, stream: &'static str) -> (usize, Vec<StoreError>)
where
    S: ruscello::storage::IndexStore + 'static,
    L: ruscello::log::EventLog + 'static,
{
    index
        .append(stream, ExpectedVersion::NoStream, &[EventData::new("opened", json!({}))])
        .unwrap();

    let barrier = Arc::new(Barrier::new(WRITERS));
    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let index = Arc::clone(&index);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let event = EventData::new("claimed", json!({ "writer": writer }));
                barrier.wait();
                index.append(stream, ExpectedVersion::Exact(0), &[event])
            })
        })
        .collect();

    let mut successes = 0;
    let mut failures = Vec::new();
    for handle in handles {
        match handle.join().unwrap() {
            Ok(_) => successes += 1,
            Err(err) => failures.push(err),
        }
    }
    (successes, failures)
}

#[test]
fn exactly_one_racing_appender_wins_in_memory() {
    let index = Arc::new(StreamIndex::in_memory());
    let (successes, failures) = race(Arc::clone(&index), "seat-1");

    assert_eq!(successes, 1);
    assert_eq!(failures.len(), WRITERS - 1);
    for err in failures {
        assert!(matches!(err, StoreError::WrongExpectedVersion { .. }));
        assert_eq!(err.current_head(), Some(1));
    }
    assert_eq!(index.read_forward("seat-1", 0, 10).unwrap().versions(), vec![0, 1]);
}

#[test]
fn exactly_one_racing_appender_wins_on_rocksdb() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::with_data_dir(dir.path());
    config.sync_writes = false;
    let index = Arc::new(StreamIndex::open(&config).unwrap());
    let (successes, failures) = race(Arc::clone(&index), "seat-2");

    assert_eq!(successes, 1);
    assert!(
        failures
            .iter()
            .all(|err| matches!(err, StoreError::WrongExpectedVersion { current: Some(1), .. }))
    );
}

#[test]
fn independent_streams_append_in_parallel() {
    let index = Arc::new(StreamIndex::new(
        MemoryIndexStore::new(),
        MemoryLog::new(),
        IndexOptions {
            lock_stripes: 4,
            ..IndexOptions::default()
        },
    ));
    let barrier = Arc::new(Barrier::new(WRITERS));
    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let index = Arc::clone(&index);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let stream = format!("account-{writer}");
                barrier.wait();
                for version in 0..25u64 {
                    let expected = match version {
                        0 => ExpectedVersion::NoStream,
                        n => ExpectedVersion::Exact(n - 1),
                    };
                    index
                        .append(&stream, expected, &[EventData::new("deposited", json!({ "n": version }))])
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for writer in 0..WRITERS {
        let slice = index
            .read_forward(&format!("account-{writer}"), 0, 100)
            .unwrap();
        assert_eq!(slice.versions(), (0..25).collect::<Vec<u64>>());
    }
}

#[test]
fn readers_see_whole_batches_only() {
    let index = Arc::new(StreamIndex::in_memory());
    let writer = {
        let index = Arc::clone(&index);
        thread::spawn(move || {
            for _ in 0..50 {
                let batch: Vec<EventData> = (0..4)
                    .map(|i| EventData::new("tick", json!({ "i": i })))
                    .collect();
                index.append("clock", ExpectedVersion::Any, &batch).unwrap();
            }
        })
    };

    for _ in 0..200 {
        let slice = index.read_forward("clock", 0, 1_000).unwrap();
        assert_eq!(slice.entries.len() % 4, 0);
    }
    writer.join().unwrap();
    assert_eq!(index.read_forward("clock", 0, 1_000).unwrap().entries.len(), 200);
}

/// Memory log whose second append parks until the test releases it.
struct GatedLog {
    inner: MemoryLog,
    appends: AtomicUsize,
    gate: Mutex<Option<(Sender<()>, Receiver<()>)>>,
}

impl GatedLog {
    fn new(entered: Sender<()>, release: Receiver<()>) -> Self {
        Self {
            inner: MemoryLog::new(),
            appends: AtomicUsize::new(0),
            gate: Mutex::new(Some((entered, release))),
        }
    }
}

impl EventLog for GatedLog {
    fn append(&self, record: &[u8]) -> ruscello::Result<u64> {
        if self.appends.fetch_add(1, Ordering::SeqCst) == 1 {
            if let Some((entered, release)) = self.gate.lock().take() {
                entered.send(()).unwrap();
                release.recv().unwrap();
            }
        }
        self.inner.append(record)
    }

    fn read_at(&self, position: u64) -> ruscello::Result<Vec<u8>> {
        self.inner.read_at(position)
    }

    fn end_position(&self) -> u64 {
        self.inner.end_position()
    }

    fn flush(&self) -> ruscello::Result<()> {
        self.inner.flush()
    }
}

#[test]
fn all_pager_never_skips_a_slow_commit() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let index = Arc::new(StreamIndex::new(
        MemoryIndexStore::new(),
        GatedLog::new(entered_tx, release_rx),
        IndexOptions::default(),
    ));

    let slow = {
        let index = Arc::clone(&index);
        thread::spawn(move || {
            let batch = [
                EventData::new("step", json!({ "n": 0 })),
                EventData::new("step", json!({ "n": 1 })),
            ];
            index.append("slow", ExpectedVersion::Any, &batch).unwrap()
        })
    };
    entered_rx.recv().unwrap();

    let fast = {
        let index = Arc::clone(&index);
        thread::spawn(move || {
            index
                .append("fast", ExpectedVersion::Any, &[EventData::new("step", json!({}))])
                .unwrap()
        })
    };
    thread::sleep(Duration::from_millis(50));

    let first_page = index.read_all_forward(Position::START, 100).unwrap();
    release_tx.send(()).unwrap();
    let mut committed = slow.join().unwrap().positions;
    committed.extend(fast.join().unwrap().positions);
    committed.sort_unstable();

    let second_page = index
        .read_all_forward(first_page.next_position, 100)
        .unwrap();
    let mut seen: Vec<u64> = first_page
        .entries
        .iter()
        .chain(&second_page.entries)
        .map(|entry| entry.position)
        .collect();
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen, committed);
}
