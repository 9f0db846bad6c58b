use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{Result, StoreError};

pub const DEFAULT_LOCK_STRIPES: usize = 64;
pub const DEFAULT_MAX_READ_COUNT: usize = 4_096;
pub const CONFIG_DIR_NAME: &str = ".ruscello";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Rocksdb,
    Memory,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Rocksdb => f.write_str("rocksdb"),
            StoreBackend::Memory => f.write_str("memory"),
        }
    }
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rocksdb" | "rocks" => Ok(StoreBackend::Rocksdb),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => Err(format!("unsupported backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data_dir: PathBuf,
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_sync_writes")]
    pub sync_writes: bool,
    #[serde(default = "default_lock_stripes")]
    pub lock_stripes: usize,
    #[serde(default = "default_max_read_count")]
    pub max_read_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Config {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            data_dir: default_data_dir(),
            backend: StoreBackend::default(),
            sync_writes: default_sync_writes(),
            lock_stripes: default_lock_stripes(),
            max_read_count: default_max_read_count(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub data_dir: Option<PathBuf>,
    pub backend: Option<StoreBackend>,
    pub sync_writes: Option<bool>,
    pub lock_stripes: Option<usize>,
    pub max_read_count: Option<usize>,
}

impl ConfigUpdate {
    pub fn is_empty(&self) -> bool {
        self.data_dir.is_none()
            && self.backend.is_none()
            && self.sync_writes.is_none()
            && self.lock_stripes.is_none()
            && self.max_read_count.is_none()
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    let mut path = default_config_root()?;
    path.push("config.toml");
    Ok(path)
}

pub fn load_or_default(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let config_path = match path {
        Some(path) => path,
        None => default_config_path()?,
    };
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    if config_path.exists() {
        let contents = fs::read_to_string(&config_path)?;
        let cfg: Config = toml::from_str(&contents)?;
        cfg.validate()?;
        cfg.ensure_data_dir()?;
        Ok((cfg, config_path))
    } else {
        let cfg = Config::default();
        cfg.ensure_data_dir()?;
        cfg.save(&config_path)?;
        Ok((cfg, config_path))
    }
}

impl Config {
    /// Config rooted at `data_dir`, used by tests and embedders that manage
    /// their own directories.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.lock_stripes == 0 {
            return Err(StoreError::Config(
                "lock_stripes must be at least 1".to_string(),
            ));
        }
        if self.max_read_count == 0 {
            return Err(StoreError::Config(
                "max_read_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn apply_update(&mut self, update: ConfigUpdate) {
        if let Some(dir) = update.data_dir {
            self.data_dir = dir;
        }
        if let Some(backend) = update.backend {
            self.backend = backend;
        }
        if let Some(sync_writes) = update.sync_writes {
            self.sync_writes = sync_writes;
        }
        if let Some(stripes) = update.lock_stripes {
            self.lock_stripes = stripes.max(1);
        }
        if let Some(max_read_count) = update.max_read_count {
            self.max_read_count = max_read_count.max(1);
        }
        self.updated_at = Utc::now();
    }

    pub fn ensure_data_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join("index")
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("events.log")
    }
}

fn default_config_root() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        Ok(home.join(CONFIG_DIR_NAME))
    } else {
        env::current_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME))
            .map_err(|err| StoreError::Config(err.to_string()))
    }
}

fn default_data_dir() -> PathBuf {
    default_config_root()
        .map(|root| root.join("data"))
        .unwrap_or_else(|_| PathBuf::from(CONFIG_DIR_NAME).join("data"))
}

fn default_sync_writes() -> bool {
    true
}

fn default_lock_stripes() -> usize {
    DEFAULT_LOCK_STRIPES
}

fn default_max_read_count() -> usize {
    DEFAULT_MAX_READ_COUNT
}
