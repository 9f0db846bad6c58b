use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use ruscello::{
    EventData, ExpectedVersion, IndexOptions, Position, StreamIndex, StreamSlice,
    config::{Config, StoreBackend, load_or_default},
    log::{EventLog, MemoryLog},
    storage::{IndexStore, MemoryIndexStore},
};

use super::parse_json_arg;

#[derive(Subcommand)]
pub enum StreamCommands {
    /// Append events to a stream
    Append(AppendArgs),
    /// Read a stream forward or backward
    Read(ReadArgs),
    /// Read the global $all log
    ReadAll(ReadAllArgs),
    /// Soft or hard delete a stream
    Delete(DeleteArgs),
    /// Show the head, hash and deletion state of a stream
    Info(InfoArgs),
    /// List stream names
    Streams(StreamsArgs),
    /// Compact the index to reclaim space held by hard-deleted streams
    Scavenge,
}

#[derive(Args)]
pub struct AppendArgs {
    /// Stream identifier
    pub stream: String,

    /// Event type; omit with --batch
    pub event_type: Option<String>,

    /// Event payload as JSON, @file or - for stdin
    #[arg(long, default_value = "{}")]
    pub data: String,

    /// Event metadata as JSON
    #[arg(long)]
    pub metadata: Option<String>,

    /// JSON array of {"event_type", "data", "metadata"} objects, @file or -
    #[arg(long, conflicts_with = "event_type")]
    pub batch: Option<String>,

    /// any, no-stream, stream-exists or an exact version
    #[arg(long, default_value = "any", allow_hyphen_values = true)]
    pub expected: ExpectedVersion,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct ReadArgs {
    /// Stream identifier
    pub stream: String,

    /// First version to read; defaults to 0, or the head when reading backward
    #[arg(long)]
    pub from: Option<u64>,

    #[arg(long, default_value_t = 100)]
    pub max: usize,

    #[arg(long, default_value_t = false)]
    pub backward: bool,

    /// Load event bodies from the log
    #[arg(long, default_value_t = false)]
    pub events: bool,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct ReadAllArgs {
    /// Log position to start from; -1 means the end of the log
    #[arg(long, allow_hyphen_values = true)]
    pub from: Option<i64>,

    #[arg(long, default_value_t = 100)]
    pub max: usize,

    #[arg(long, default_value_t = false)]
    pub backward: bool,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Stream identifier
    pub stream: String,

    #[arg(long, default_value = "any", allow_hyphen_values = true)]
    pub expected: ExpectedVersion,

    /// Remove every index entry instead of hiding the stream
    #[arg(long, default_value_t = false)]
    pub hard: bool,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct InfoArgs {
    /// Stream identifier
    pub stream: String,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct StreamsArgs {
    /// Only list names sorting after this one
    #[arg(long)]
    pub after: Option<String>,

    #[arg(long, default_value_t = 100)]
    pub max: usize,
}

#[derive(Deserialize)]
struct BatchEvent {
    event_type: String,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    metadata: Option<Value>,
}

pub fn execute(config_path: Option<PathBuf>, command: StreamCommands) -> Result<()> {
    let (config, _) = load_or_default(config_path)?;
    match config.backend {
        StoreBackend::Rocksdb => {
            let index = StreamIndex::open(&config).with_context(|| {
                format!("failed to open stream index in {}", config.data_dir.display())
            })?;
            run(&index, command)?;
            index.close()?;
        }
        StoreBackend::Memory => {
            warn!("memory backend selected; nothing is kept after this command exits");
            let index = in_memory(&config);
            run(&index, command)?;
        }
    }
    Ok(())
}

fn in_memory(config: &Config) -> StreamIndex<MemoryIndexStore, MemoryLog> {
    StreamIndex::new(
        MemoryIndexStore::new(),
        MemoryLog::new(),
        IndexOptions::from(config),
    )
}

fn run<S: IndexStore, L: EventLog>(index: &StreamIndex<S, L>, command: StreamCommands) -> Result<()> {
    match command {
        StreamCommands::Append(args) => {
            let events = collect_events(&args)?;
            let result = index.append(&args.stream, args.expected, &events)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!(
                    "stream={} head={} appended={}",
                    args.stream,
                    describe(result.head),
                    result.positions.len()
                );
            }
        }
        StreamCommands::Read(args) => {
            let slice = if args.backward {
                let from = args.from.unwrap_or(ruscello::END_OF_STREAM);
                index.read_backward(&args.stream, from, args.max)?
            } else {
                index.read_forward(&args.stream, args.from.unwrap_or(0), args.max)?
            };
            print_slice(index, &slice, args.events, args.json)?;
        }
        StreamCommands::ReadAll(args) => {
            let from = match args.from {
                Some(value) if value < Position::END.value() => {
                    bail!("--from must be a log position or -1 for the end, got {value}")
                }
                Some(value) => Position::new(value),
                None if args.backward => Position::END,
                None => Position::START,
            };
            let slice = if args.backward {
                index.read_all_backward(from, args.max)?
            } else {
                index.read_all_forward(from, args.max)?
            };
            if args.json {
                println!("{}", serde_json::to_string_pretty(&slice)?);
            } else {
                for entry in &slice.entries {
                    println!(
                        "position={} stream={} version={}",
                        entry.position, entry.stream_id, entry.version
                    );
                }
                println!("next_position={} end={}", slice.next_position, slice.is_end);
            }
        }
        StreamCommands::Delete(args) => {
            let result = index.delete_stream(&args.stream, args.expected, args.hard)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!(
                    "stream={} deleted mode={:?} removed_entries={}",
                    args.stream, result.mode, result.removed_entries
                );
            }
        }
        StreamCommands::Info(args) => {
            let info = index.stream_info(&args.stream)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!(
                    "stream={} hash={:08x} head={} deleted={}",
                    info.stream_id,
                    info.hash,
                    describe(info.head),
                    info.deleted
                        .map(|mode| format!("{mode:?}").to_lowercase())
                        .unwrap_or_else(|| "no".to_string())
                );
            }
        }
        StreamCommands::Streams(args) => {
            let streams = index.list_streams(args.after.as_deref(), args.max)?;
            if streams.is_empty() {
                println!("no streams");
            }
            for stream in streams {
                println!("{stream}");
            }
        }
        StreamCommands::Scavenge => {
            index.scavenge()?;
            println!("scavenge completed");
        }
    }
    Ok(())
}

fn collect_events(args: &AppendArgs) -> Result<Vec<EventData>> {
    if let Some(batch) = &args.batch {
        let parsed: Vec<BatchEvent> = serde_json::from_value(parse_json_arg(batch)?)
            .context("--batch must be a JSON array of events")?;
        return Ok(parsed
            .into_iter()
            .map(|event| EventData {
                metadata: event.metadata,
                ..EventData::new(event.event_type, event.data)
            })
            .collect());
    }

    let Some(event_type) = args.event_type.as_deref() else {
        bail!("an event type or --batch is required");
    };
    let mut event = EventData::new(event_type, parse_json_arg(&args.data)?);
    if let Some(metadata) = &args.metadata {
        event = event.with_metadata(parse_json_arg(metadata)?);
    }
    Ok(vec![event])
}

fn print_slice<S: IndexStore, L: EventLog>(
    index: &StreamIndex<S, L>,
    slice: &StreamSlice,
    with_events: bool,
    json: bool,
) -> Result<()> {
    let events = if with_events {
        Some(index.load_events(slice)?)
    } else {
        None
    };

    if json {
        let mut value = serde_json::to_value(slice)?;
        if let Some(events) = &events {
            value["events"] = serde_json::to_value(events)?;
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match &events {
        Some(events) => {
            for event in events {
                println!(
                    "version={} position={} type={} data={}",
                    event.version, event.position, event.event_type, event.data
                );
            }
        }
        None => {
            for entry in &slice.entries {
                println!("version={} position={}", entry.version, entry.position);
            }
        }
    }
    println!(
        "status={:?} last_version={} end={}",
        slice.status,
        describe(slice.last_version),
        slice.is_end_of_stream
    );
    Ok(())
}

fn describe(version: Option<u64>) -> String {
    version.map_or_else(|| "none".to_string(), |version| version.to_string())
}
