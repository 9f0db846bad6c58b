use anyhow::Result;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::{Rng, SeedableRng, distributions::Alphanumeric, rngs::StdRng};
use serde_json::{Value, json};
use tempfile::TempDir;

use ruscello::{
    END_OF_STREAM, EventData, ExpectedVersion, MemoryStreamIndex, Position, RocksStreamIndex,
    StreamIndex, config::Config,
};

const PAYLOAD_SIZES: &[usize] = &[256, 1024, 4096];
const BATCH_SIZES: &[usize] = &[1, 16, 128];
const SEED_STREAMS: usize = 64;
const SEED_EVENTS: usize = 256;
const READ_LIMIT: usize = 128;

fn criterion_benches() -> Criterion {
    Criterion::default().warm_up_time(std::time::Duration::from_secs(3))
}

struct RocksBackend {
    _dir: TempDir,
    index: RocksStreamIndex,
}

impl RocksBackend {
    fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let mut config = Config::with_data_dir(dir.path());
        config.sync_writes = false;
        let index = StreamIndex::open(&config)?;
        Ok(Self { _dir: dir, index })
    }
}

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("append");
    let memory = MemoryStreamIndex::in_memory();
    let rocks = RocksBackend::new().expect("rocksdb backend");

    for &size in PAYLOAD_SIZES {
        let event = EventData::new("order-placed", build_payload(size));
        group.bench_with_input(BenchmarkId::new("memory", size), &event, |b, event| {
            b.iter(|| {
                let result = memory
                    .append("bench-append", ExpectedVersion::Any, std::slice::from_ref(event))
                    .expect("memory append");
                black_box(result.head);
            });
        });
        group.bench_with_input(BenchmarkId::new("rocksdb", size), &event, |b, event| {
            b.iter(|| {
                let result = rocks
                    .index
                    .append("bench-append", ExpectedVersion::Any, std::slice::from_ref(event))
                    .expect("rocksdb append");
                black_box(result.head);
            });
        });
    }

    for &batch in BATCH_SIZES {
        let events: Vec<EventData> = (0..batch)
            .map(|_| EventData::new("line-added", build_payload(256)))
            .collect();
        group.bench_with_input(BenchmarkId::new("rocksdb-batch", batch), &events, |b, events| {
            b.iter(|| {
                let result = rocks
                    .index
                    .append("bench-batch", ExpectedVersion::Any, events)
                    .expect("rocksdb batch append");
                black_box(result.positions.len());
            });
        });
    }
    group.finish();
}

fn bench_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("read");
    let memory = MemoryStreamIndex::in_memory();
    let rocks = RocksBackend::new().expect("rocksdb backend");
    seed(&memory).expect("seed memory");
    seed(&rocks.index).expect("seed rocksdb");

    group.bench_function(BenchmarkId::new("forward", "memory"), |b| {
        let mut stream = 0;
        b.iter(|| {
            stream = (stream + 1) % SEED_STREAMS;
            let slice = memory
                .read_forward(&stream_name(stream), 0, READ_LIMIT)
                .expect("memory read");
            black_box(slice.entries.len());
        });
    });
    group.bench_function(BenchmarkId::new("forward", "rocksdb"), |b| {
        let mut stream = 0;
        b.iter(|| {
            stream = (stream + 1) % SEED_STREAMS;
            let slice = rocks
                .index
                .read_forward(&stream_name(stream), 0, READ_LIMIT)
                .expect("rocksdb read");
            black_box(slice.entries.len());
        });
    });
    group.bench_function(BenchmarkId::new("backward", "rocksdb"), |b| {
        let mut stream = 0;
        b.iter(|| {
            stream = (stream + 1) % SEED_STREAMS;
            let slice = rocks
                .index
                .read_backward(&stream_name(stream), END_OF_STREAM, READ_LIMIT)
                .expect("rocksdb read");
            black_box(slice.entries.len());
        });
    });
    group.bench_function(BenchmarkId::new("all", "rocksdb"), |b| {
        b.iter(|| {
            let slice = rocks
                .index
                .read_all_backward(Position::END, READ_LIMIT)
                .expect("rocksdb read all");
            black_box(slice.entries.len());
        });
    });
    group.bench_function(BenchmarkId::new("events", "rocksdb"), |b| {
        let slice = rocks
            .index
            .read_forward(&stream_name(0), 0, READ_LIMIT)
            .expect("rocksdb read");
        b.iter(|| {
            let events = rocks.index.load_events(&slice).expect("load events");
            black_box(events.len());
        });
    });
    group.finish();
}

criterion_group! {
    name = benches;
    config = criterion_benches();
    targets = bench_append, bench_read
}
criterion_main!(benches);

fn seed<S, L>(index: &StreamIndex<S, L>) -> Result<()>
where
    S: ruscello::storage::IndexStore,
    L: ruscello::log::EventLog,
{
    for stream in 0..SEED_STREAMS {
        let events: Vec<EventData> = (0..SEED_EVENTS)
            .map(|seq| EventData::new("seeded", json!({ "seq": seq })))
            .collect();
        index.append(&stream_name(stream), ExpectedVersion::NoStream, &events)?;
    }
    Ok(())
}

fn stream_name(stream: usize) -> String {
    format!("bench-stream-{stream}")
}

fn build_payload(size: usize) -> Value {
    let mut rng = StdRng::from_entropy();
    let text: String = (0..size)
        .map(|_| rng.sample(Alphanumeric) as char)
        .collect();
    json!({
        "amount": 42,
        "currency": "USD",
        "description": text,
    })
}
