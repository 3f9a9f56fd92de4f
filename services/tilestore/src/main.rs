//! Container inspection and storage type tooling.

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use tilestore::commands;

#[derive(Parser, Debug)]
#[command(name = "tilestore")]
#[command(about = "Inspect time-series raster containers and storage types")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level
    #[arg(long, global = true, default_value = "info", env = "TILESTORE_LOG_LEVEL")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the dimensions, bands and attributes of a container
    Inspect {
        /// Container path
        container: PathBuf,
    },
    /// Validate storage type definition files
    StorageTypes {
        /// YAML or JSON files, optionally gzipped
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the metadata document path for a dataset
    MetadataPath {
        /// Dataset file or directory, or a metadata document
        dataset: PathBuf,
    },
    /// Print the effective configuration
    Config {
        /// Configuration files, later ones override earlier ones
        #[arg(short, long = "config")]
        files: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);
    if args.json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    match args.command {
        Command::Inspect { container } => print_json(&commands::inspect(&container)?),
        Command::StorageTypes { files } => print_json(&commands::storage_types(&files)?),
        Command::MetadataPath { dataset } => {
            println!("{}", tilestore::get_metadata_path(&dataset)?.display());
            Ok(())
        }
        Command::Config { files } => {
            let config = commands::show_config(&files)?;
            print!("{}", serde_yaml::to_string(&config)?);
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
