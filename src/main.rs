//! Command-line interface for city-sync
//!
//! # Usage Examples
//!
//! ```bash
//! # Start one pipeline per configured topic; Ctrl+C or SIGTERM drains them
//! city-sync run --config city-sync.toml
//!
//! # More detail from the pipelines
//! RUST_LOG=city_sync_pipeline=debug city-sync run --config city-sync.toml
//!
//! # Built-in topic schemas
//! city-sync schemas
//!
//! # Stored checkpoint of one topic partition
//! city-sync checkpoint --config city-sync.toml --topic gps_data --partition 1
//! ```
//!
//! ## Exit Codes
//! - `0`: every pipeline reached STOPPED
//! - `1`: a pipeline FAILED, or the configuration could not be loaded

use city_sync::{checkpoint, schema, sync, AppConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "city-sync")]
#[command(about = "Stream smart-city event topics from Kafka into Parquet files")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all topic pipelines until interrupted
    Run {
        /// Path to the TOML configuration file
        #[arg(long, env = "CITY_SYNC_CONFIG")]
        config: PathBuf,
    },

    /// Print the built-in topic schemas
    Schemas,

    /// Print the stored checkpoint of a topic partition
    Checkpoint {
        /// Path to the TOML configuration file
        #[arg(long, env = "CITY_SYNC_CONFIG")]
        config: PathBuf,

        /// Topic name
        #[arg(long)]
        topic: String,

        /// Partition of the topic
        #[arg(long, default_value_t = 0)]
        partition: i32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

async fn run() -> anyhow::Result<i32> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            let config = AppConfig::from_file(&config)?;
            sync::run_pipelines(&config).await
        }
        Commands::Schemas => {
            print!("{}", schema::describe_registry(&sync_core::SchemaRegistry::builtin()));
            Ok(0)
        }
        Commands::Checkpoint {
            config,
            topic,
            partition,
        } => {
            let config = AppConfig::from_file(&config)?;
            let store = config.checkpoint_storage()?.open().await;
            println!(
                "{}",
                checkpoint::describe_checkpoint(store.as_ref(), &topic, partition).await?
            );
            Ok(0)
        }
    }
}
