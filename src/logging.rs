use std::{
    cmp::Reverse,
    ffi::OsStr,
    fs,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
    time::SystemTime,
};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use parking_lot::Mutex;
use tracing::warn;
use tracing_appender::non_blocking::{self, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_DIR_ENV: &str = "RUSCELLO_LOG_DIR";
const LOG_RETENTION_ENV: &str = "RUSCELLO_LOG_RETENTION";
const LOG_PREFIX: &str = "ruscello";
const ACTIVE_FILE_NAME: &str = "ruscello.log";
const DEFAULT_RETAINED_LOGS: usize = 14;

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static PANIC_HOOK: OnceLock<()> = OnceLock::new();

/// Installs the global subscriber: human-readable events on stderr and a
/// daily-rotated file under `RUSCELLO_LOG_DIR` (default `~/.ruscello/logs`).
pub fn init() -> Result<()> {
    if FILE_GUARD.get().is_some() {
        return Ok(());
    }

    let writer = DailyFileWriter::new(resolve_log_dir()?, resolve_retention())?;
    let (file_writer, guard) = non_blocking::NonBlockingBuilder::default()
        .lossy(false)
        .finish(writer);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console_layer = fmt::layer().with_writer(io::stderr).with_target(false);
    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_target(true)
        .with_ansi(false);

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    if installed.is_ok() {
        let _ = FILE_GUARD.set(guard);
        install_panic_hook();
    }
    Ok(())
}

#[derive(Clone)]
struct DailyFileWriter {
    shared: Arc<Shared>,
}

struct Shared {
    dir: PathBuf,
    retained: usize,
    state: Mutex<ActiveFile>,
}

struct ActiveFile {
    writer: Option<BufWriter<fs::File>>,
    day: NaiveDate,
    opened_at: DateTime<Local>,
}

impl DailyFileWriter {
    fn new(dir: PathBuf, retained: usize) -> Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create log directory {}", dir.display()))?;

        let active = dir.join(ACTIVE_FILE_NAME);
        let now = Local::now();
        if let Some(modified) = last_modified(&active)? {
            if modified.date_naive() != now.date_naive() {
                archive(&dir, &active, modified)?;
                prune(&dir, retained);
            }
        }

        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ActiveFile {
                    writer: Some(open_append(&active)?),
                    day: now.date_naive(),
                    opened_at: now,
                }),
                dir,
                retained,
            }),
        })
    }

    fn active_path(&self) -> PathBuf {
        self.shared.dir.join(ACTIVE_FILE_NAME)
    }

    fn roll(&self, state: &mut ActiveFile, now: DateTime<Local>) -> Result<()> {
        if let Some(mut writer) = state.writer.take() {
            writer.flush().context("failed to flush log before rotation")?;
        }
        let active = self.active_path();
        if active.exists() {
            archive(&self.shared.dir, &active, state.opened_at)?;
            prune(&self.shared.dir, self.shared.retained);
        }
        state.writer = Some(open_append(&active)?);
        state.day = now.date_naive();
        state.opened_at = now;
        Ok(())
    }
}

impl Write for DailyFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let now = Local::now();
        let mut state = self.shared.state.lock();
        if now.date_naive() != state.day || state.writer.is_none() {
            self.roll(&mut state, now).map_err(io::Error::other)?;
        }
        let writer = state
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::other("log file is not open"))?;
        writer.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.shared.state.lock().writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

fn open_append(path: &Path) -> Result<BufWriter<fs::File>> {
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn last_modified(path: &Path) -> Result<Option<DateTime<Local>>> {
    match fs::metadata(path) {
        Ok(metadata) => Ok(metadata.modified().ok().map(DateTime::<Local>::from)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("unable to inspect {}", path.display())),
    }
}

/// Renames the active file to a timestamped name that does not exist yet.
fn archive(dir: &Path, active: &Path, stamp: DateTime<Local>) -> Result<PathBuf> {
    let base = format!("{LOG_PREFIX}_{}", stamp.format("%Y-%m-%d_%H-%M-%S"));
    let mut target = dir.join(format!("{base}.log"));
    let mut suffix = 1;
    while target.exists() {
        target = dir.join(format!("{base}-{suffix}.log"));
        suffix += 1;
    }
    fs::rename(active, &target).with_context(|| {
        format!(
            "failed to rotate log {} -> {}",
            active.display(),
            target.display()
        )
    })?;
    Ok(target)
}

/// Keeps the `retained` most recent archived files.
fn prune(dir: &Path, retained: usize) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("failed to inspect log directory {}: {err}", dir.display());
            return;
        }
    };
    let mut archived: Vec<(SystemTime, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(OsStr::to_str)
                    .is_some_and(|name| name != ACTIVE_FILE_NAME && name.starts_with(LOG_PREFIX))
        })
        .map(|path| {
            let modified = fs::metadata(&path)
                .and_then(|metadata| metadata.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, path)
        })
        .collect();

    archived.sort_by_key(|(modified, _)| Reverse(*modified));
    for (_, path) in archived.into_iter().skip(retained) {
        if let Err(err) = fs::remove_file(&path) {
            warn!("failed to remove expired log {}: {err}", path.display());
        }
    }
}

fn resolve_log_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(LOG_DIR_ENV) {
        let path = PathBuf::from(dir);
        if path.is_absolute() {
            return Ok(path);
        }
        let cwd = std::env::current_dir().context("failed to resolve current directory")?;
        return Ok(cwd.join(path));
    }
    let home = dirs::home_dir().context("unable to locate user home directory")?;
    Ok(home.join(".ruscello").join("logs"))
}

fn resolve_retention() -> usize {
    std::env::var(LOG_RETENTION_ENV)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(DEFAULT_RETAINED_LOGS)
}

fn install_panic_hook() {
    PANIC_HOOK.get_or_init(|| {
        let default_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            match info.location() {
                Some(location) => tracing::error!(
                    target: "panic",
                    file = location.file(),
                    line = location.line(),
                    message = %info
                ),
                None => tracing::error!(target: "panic", message = %info),
            }
            default_hook(info);
        }));
    });
}
