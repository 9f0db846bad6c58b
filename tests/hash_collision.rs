use std::collections::HashMap;

use serde_json::json;

use ruscello::{
    DeleteMode, END_OF_STREAM, EventData, ExpectedVersion, IndexOptions, ReadStatus, StoreError,
    StreamIndex, codec::hash_of, log::MemoryLog, storage::MemoryIndexStore,
};

/// Searches `stream-N` names until two share an XXH32 hash.
fn colliding_pair() -> (String, String) {
    let mut seen: HashMap<u32, u32> = HashMap::new();
    for candidate in 0..2_000_000u32 {
        let hash = hash_of(&format!("stream-{candidate}"));
        if let Some(previous) = seen.insert(hash, candidate) {
            return (format!("stream-{previous}"), format!("stream-{candidate}"));
        }
    }
    panic!("no xxh32 collision among the candidates");
}

fn bucket(_: &str) -> u32 {
    7
}

fn payload(owner: &str, seq: usize) -> EventData {
    EventData::new("touched", json!({ "owner": owner, "seq": seq }))
}

#[test]
fn real_collision_keeps_streams_apart() {
    let (left, right) = colliding_pair();
    assert_ne!(left, right);
    assert_eq!(hash_of(&left), hash_of(&right));

    let index = StreamIndex::in_memory();
    for seq in 0..3 {
        index
            .append(&left, ExpectedVersion::Any, &[payload(&left, seq)])
            .unwrap();
        index
            .append(&right, ExpectedVersion::Any, &[payload(&right, seq)])
            .unwrap();
    }

    for stream in [&left, &right] {
        let slice = index.read_forward(stream, 0, 100).unwrap();
        assert_eq!(slice.versions(), vec![0, 1, 2]);
        let events = index.load_events(&slice).unwrap();
        assert!(events.iter().all(|event| &event.stream_id == stream));

        let back = index.read_backward(stream, END_OF_STREAM, 100).unwrap();
        assert_eq!(back.versions(), vec![2, 1, 0]);
    }

    index
        .append(&right, ExpectedVersion::Exact(2), &[payload(&right, 3)])
        .unwrap();
    assert!(matches!(
        index.append(&left, ExpectedVersion::Exact(3), &[payload(&left, 3)]),
        Err(StoreError::WrongExpectedVersion { current: Some(2), .. })
    ));
}

#[test]
fn deleting_one_colliding_stream_leaves_the_other() {
    let index = StreamIndex::new(
        MemoryIndexStore::new(),
        MemoryLog::new(),
        IndexOptions::default(),
    )
    .with_hasher(bucket);

    index
        .append("ledger-a", ExpectedVersion::NoStream, &[payload("ledger-a", 0), payload("ledger-a", 1)])
        .unwrap();
    index
        .append("ledger-b", ExpectedVersion::NoStream, &[payload("ledger-b", 0)])
        .unwrap();

    let deleted = index
        .delete_stream("ledger-a", ExpectedVersion::Exact(1), true)
        .unwrap();
    assert_eq!(deleted.mode, DeleteMode::Hard);
    assert_eq!(deleted.removed_entries, 2);

    let survivor = index.read_forward("ledger-b", 0, 10).unwrap();
    assert_eq!(survivor.status, ReadStatus::Success);
    assert_eq!(survivor.versions(), vec![0]);
    assert_eq!(index.stream_info("ledger-b").unwrap().deleted, None);

    index
        .append("ledger-b", ExpectedVersion::Exact(0), &[payload("ledger-b", 1)])
        .unwrap();
    assert!(matches!(
        index.append("ledger-a", ExpectedVersion::Any, &[payload("ledger-a", 2)]),
        Err(StoreError::StreamDeleted { hard: true, .. })
    ));
}

#[test]
fn soft_delete_under_collision_hides_only_its_stream() {
    let index = StreamIndex::in_memory().with_hasher(bucket);
    index
        .append("profile-1", ExpectedVersion::Any, &[payload("profile-1", 0)])
        .unwrap();
    index
        .append("profile-2", ExpectedVersion::Any, &[payload("profile-2", 0)])
        .unwrap();

    index
        .delete_stream("profile-1", ExpectedVersion::Any, false)
        .unwrap();

    assert_eq!(
        index.read_forward("profile-1", 0, 10).unwrap().status,
        ReadStatus::SoftDeleted
    );
    assert_eq!(
        index.read_forward("profile-2", 0, 10).unwrap().status,
        ReadStatus::Success
    );
    assert_eq!(index.stream_info("profile-2").unwrap().head, Some(0));
}
