//! Append-only physical event log.
//!
//! Records are framed as `| len (4, BE) | crc32 (4, BE) | payload |` and
//! addressed by the byte offset of their frame.

use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    time::Instant,
};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::{
    error::{Result, StoreError},
    observability::record_store_op,
};

pub const FRAME_HEADER_LEN: u64 = 8;
pub const MAX_RECORD_LEN: usize = 16 * 1024 * 1024;

pub trait EventLog: Send + Sync {
    /// Appends one record and returns its position.
    fn append(&self, record: &[u8]) -> Result<u64>;

    fn read_at(&self, position: u64) -> Result<Vec<u8>>;

    /// Position the next record will receive.
    fn end_position(&self) -> u64;

    fn flush(&self) -> Result<()>;
}

struct LogFile {
    file: File,
    end: u64,
}

pub struct FileLog {
    path: PathBuf,
    inner: Mutex<LogFile>,
    sync_writes: bool,
}

impl FileLog {
    /// Opens or creates the log, truncating a torn or corrupt tail left by
    /// an interrupted write.
    pub fn open(path: impl AsRef<Path>, sync_writes: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        let valid = scan_valid_prefix(&data);
        if valid < data.len() as u64 {
            warn!(
                path = %path.display(),
                valid_bytes = valid,
                discarded_bytes = data.len() as u64 - valid,
                "truncating torn tail of event log"
            );
            file.set_len(valid)?;
            file.sync_all()?;
        }
        debug!(path = %path.display(), end = valid, "opened event log");

        Ok(Self {
            path,
            inner: Mutex::new(LogFile { file, end: valid }),
            sync_writes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Length of the longest prefix of `data` made of complete, intact frames.
fn scan_valid_prefix(data: &[u8]) -> u64 {
    let mut offset = 0usize;
    while offset + FRAME_HEADER_LEN as usize <= data.len() {
        let header = &data[offset..offset + FRAME_HEADER_LEN as usize];
        let (len, crc) = split_header(header);
        let start = offset + FRAME_HEADER_LEN as usize;
        if len > MAX_RECORD_LEN || start + len > data.len() {
            break;
        }
        if crc32fast::hash(&data[start..start + len]) != crc {
            break;
        }
        offset = start + len;
    }
    offset as u64
}

fn split_header(header: &[u8]) -> (usize, u32) {
    let mut len = [0u8; 4];
    let mut crc = [0u8; 4];
    len.copy_from_slice(&header[..4]);
    crc.copy_from_slice(&header[4..8]);
    (u32::from_be_bytes(len) as usize, u32::from_be_bytes(crc))
}

fn frame(record: &[u8]) -> Result<Vec<u8>> {
    if record.len() > MAX_RECORD_LEN {
        return Err(StoreError::Storage(format!(
            "record of {} bytes exceeds the {MAX_RECORD_LEN} byte limit",
            record.len()
        )));
    }
    let mut buf = Vec::with_capacity(FRAME_HEADER_LEN as usize + record.len());
    buf.extend_from_slice(&(record.len() as u32).to_be_bytes());
    buf.extend_from_slice(&crc32fast::hash(record).to_be_bytes());
    buf.extend_from_slice(record);
    Ok(buf)
}

impl EventLog for FileLog {
    fn append(&self, record: &[u8]) -> Result<u64> {
        let start = Instant::now();
        let framed = frame(record)?;
        let mut inner = self.inner.lock();
        let position = inner.end;
        let result: Result<()> = (|| {
            inner.file.seek(SeekFrom::Start(position))?;
            inner.file.write_all(&framed)?;
            if self.sync_writes {
                inner.file.sync_data()?;
            }
            Ok(())
        })();
        record_store_op(
            "log_append",
            if result.is_ok() { "ok" } else { "err" },
            start.elapsed().as_secs_f64(),
        );
        result?;
        inner.end = position + framed.len() as u64;
        Ok(position)
    }

    fn read_at(&self, position: u64) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock();
        if position.saturating_add(FRAME_HEADER_LEN) > inner.end {
            return Err(StoreError::LogCorrupted {
                position,
                reason: format!("position is beyond the end of the log ({})", inner.end),
            });
        }
        let mut header = [0u8; FRAME_HEADER_LEN as usize];
        inner.file.seek(SeekFrom::Start(position))?;
        inner.file.read_exact(&mut header)?;
        let (len, crc) = split_header(&header);
        if len > MAX_RECORD_LEN || position + FRAME_HEADER_LEN + len as u64 > inner.end {
            return Err(StoreError::LogCorrupted {
                position,
                reason: format!("frame length {len} overruns the log"),
            });
        }
        let mut payload = vec![0u8; len];
        inner.file.read_exact(&mut payload)?;
        if crc32fast::hash(&payload) != crc {
            return Err(StoreError::LogCorrupted {
                position,
                reason: "checksum mismatch".to_string(),
            });
        }
        Ok(payload)
    }

    fn end_position(&self) -> u64 {
        self.inner.lock().end
    }

    fn flush(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.file.flush()?;
        inner.file.sync_all()?;
        Ok(())
    }
}

/// In-memory log using the same framing, so positions match a [`FileLog`]
/// holding the same records.
#[derive(Default)]
pub struct MemoryLog {
    data: RwLock<Vec<u8>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventLog for MemoryLog {
    fn append(&self, record: &[u8]) -> Result<u64> {
        let framed = frame(record)?;
        let mut data = self.data.write();
        let position = data.len() as u64;
        data.extend_from_slice(&framed);
        Ok(position)
    }

    fn read_at(&self, position: u64) -> Result<Vec<u8>> {
        let data = self.data.read();
        let start = usize::try_from(position).unwrap_or(usize::MAX);
        let corrupted = |reason: &str| StoreError::LogCorrupted {
            position,
            reason: reason.to_string(),
        };
        let header = start
            .checked_add(FRAME_HEADER_LEN as usize)
            .and_then(|end| data.get(start..end))
            .ok_or_else(|| corrupted("position is beyond the end of the log"))?;
        let (len, crc) = split_header(header);
        let body = start + FRAME_HEADER_LEN as usize;
        let payload = data
            .get(body..body + len)
            .ok_or_else(|| corrupted("frame length overruns the log"))?;
        if crc32fast::hash(payload) != crc {
            return Err(corrupted("checksum mismatch"));
        }
        Ok(payload.to_vec())
    }

    fn end_position(&self) -> u64 {
        self.data.read().len() as u64
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}
