use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use ruscello::config::{ConfigUpdate, StoreBackend, load_or_default};

#[derive(Args)]
pub struct ConfigArgs {
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// rocksdb or memory
    #[arg(long)]
    pub backend: Option<StoreBackend>,

    #[arg(long)]
    pub sync_writes: Option<bool>,

    #[arg(long)]
    pub lock_stripes: Option<usize>,

    #[arg(long)]
    pub max_read_count: Option<usize>,

    /// Print the resulting configuration as TOML
    #[arg(long, default_value_t = false)]
    pub show: bool,
}

pub fn execute(config_path: Option<PathBuf>, args: ConfigArgs) -> Result<()> {
    let (mut config, path) = load_or_default(config_path)?;

    let ConfigArgs {
        data_dir,
        backend,
        sync_writes,
        lock_stripes,
        max_read_count,
        show,
    } = args;
    let update = ConfigUpdate {
        data_dir,
        backend,
        sync_writes,
        lock_stripes,
        max_read_count,
    };

    let changed = !update.is_empty();
    if changed {
        config.apply_update(update);
        config.ensure_data_dir()?;
        config.save(&path)?;
        tracing::info!("Configuration saved to {}", path.display());
    }

    if show || !changed {
        print!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}
