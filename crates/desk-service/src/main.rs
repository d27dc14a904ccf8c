//! Main entry point for the order desk service.
//!
//! This binary assembles a complete desk instance: storage backend,
//! broadcast channel transport, order state machine and channel sync
//! worker, plus the HTTP admin API that exposes the core operations to
//! the dispatch layer. It uses a modular architecture with pluggable
//! implementations for storage and channel transports.

use clap::Parser;
use desk_config::Config;
use desk_core::{DeskBuilder, DeskEngine, DeskFactories};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod server;

// Import implementations from individual crates
use desk_channel::implementations::telegram::create_channel as create_telegram_channel;
use desk_channel::ChannelFactory;
use desk_storage::implementations::file::create_storage as create_file_storage;
use desk_storage::implementations::memory::create_storage as create_memory_storage;
use desk_storage::StorageFactory;

/// Command-line arguments for the desk service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the desk service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the desk engine with all implementations
/// 5. Runs the desk until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt().with_env_filter(env_filter).with_target(true).init();

	tracing::info!("Started order desk");

	// Load configuration
	let config = Config::from_file(&args.config).await?;
	tracing::info!("Loaded configuration [{}]", config.desk.id);

	// Build desk engine with implementations
	let desk = Arc::new(build_desk(config.clone())?);

	// Check if the admin API should be started
	let api_config = config.api.clone().filter(|api| api.enabled);

	if let Some(api_config) = api_config {
		let api_desk = Arc::clone(&desk);

		// Run the engine and the API server concurrently
		tokio::select! {
			result = desk.run() => {
				tracing::info!("Desk finished");
				result?;
			}
			result = server::start_server(api_config, api_desk) => {
				tracing::info!("API server finished");
				result?;
				desk.shutdown().await;
			}
		}
	} else {
		tracing::info!("Starting desk without admin API");
		desk.run().await?;
	}

	tracing::info!("Stopped order desk");
	Ok(())
}

/// Builds the desk engine with all necessary implementations.
///
/// This function wires up the concrete implementations for:
/// - Storage backends (in-memory, file snapshot)
/// - Channel transports (Telegram Bot API)
fn build_desk(config: Config) -> Result<DeskEngine, Box<dyn std::error::Error>> {
	let builder = DeskBuilder::new(config);

	let mut storage_factories: HashMap<String, StorageFactory> = HashMap::new();
	storage_factories.insert("file".to_string(), create_file_storage);
	storage_factories.insert("memory".to_string(), create_memory_storage);

	let mut channel_factories: HashMap<String, ChannelFactory> = HashMap::new();
	channel_factories.insert("telegram".to_string(), create_telegram_channel);

	let desk = builder.build(DeskFactories {
		storage_factories,
		channel_factories,
	})?;

	Ok(desk)
}
