mod commands;
mod logging;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{config::ConfigArgs, stream::StreamCommands};

#[derive(Parser)]
#[command(author, version, about = "Ruscello event stream store CLI")]
struct Cli {
    /// Path to the configuration file. Defaults to ~/.ruscello/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print Prometheus metrics collected while running the command
    #[arg(long, global = true, default_value_t = false)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Stream(StreamCommands),
    /// Show or update the configuration
    Config(ConfigArgs),
}

fn main() -> Result<()> {
    logging::init()?;

    let Cli {
        config,
        metrics,
        command,
    } = Cli::parse();

    if metrics {
        ruscello::observability::init()?;
    }

    match command {
        Commands::Stream(command) => commands::stream::execute(config, command)?,
        Commands::Config(args) => commands::config::execute(config, args)?,
    }

    if metrics {
        print!("{}", ruscello::observability::render_metrics());
    }
    Ok(())
}
