pub mod codec;
pub mod config;
pub mod error;
pub mod expected_version;
pub mod index;
pub mod log;
pub mod observability;
pub mod storage;
pub mod system_streams;
pub mod types;

pub use error::{Result, StoreError};
pub use expected_version::ExpectedVersion;
pub use index::{
    END_OF_STREAM, IndexOptions, MemoryStreamIndex, RocksStreamIndex, StreamIndex,
};
pub use types::{
    AllEntry, AllSlice, AppendResult, DeleteMode, DeleteResult, EventData, IndexedEvent, Position,
    ReadStatus, RecordedEvent, StreamInfo, StreamSlice,
};
