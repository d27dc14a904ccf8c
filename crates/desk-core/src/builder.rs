//! Builder pattern for constructing desk engines.
//!
//! Provides a flexible way to compose a DeskEngine from service
//! implementations using factory functions, supporting pluggable storage
//! backends and channel transports.

use crate::engine::DeskEngine;
use crate::service::OrderFlowService;
use crate::sync::ChannelSyncWorker;
use desk_channel::{ChannelError, ChannelInterface, ChannelService, RetryPolicy};
use desk_config::Config;
use desk_storage::{StorageInterface, StorageService, StoreError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Errors that can occur during desk engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
}

/// Container for the factory functions needed to build a DeskEngine.
///
/// Each factory function takes a TOML configuration value and returns
/// the corresponding implementation.
pub struct DeskFactories<SF, CF> {
	pub storage_factories: HashMap<String, SF>,
	pub channel_factories: HashMap<String, CF>,
}

/// Builder for constructing a DeskEngine with pluggable implementations.
pub struct DeskBuilder {
	config: Config,
}

impl DeskBuilder {
	/// Creates a new DeskBuilder with the given configuration.
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the DeskEngine using factories for each component type.
	///
	/// Spawns the channel sync worker task, so this must run inside a
	/// tokio runtime.
	pub fn build<SF, CF>(self, factories: DeskFactories<SF, CF>) -> Result<DeskEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StoreError>,
		CF: Fn(&toml::Value) -> Result<Box<dyn ChannelInterface>, ChannelError>,
	{
		let shutdown = CancellationToken::new();

		// Create the storage backend
		let storage_name = &self.config.storage.primary;
		let storage_config = self
			.config
			.storage
			.implementations
			.get(storage_name)
			.ok_or_else(|| {
				BuilderError::Config(format!(
					"Primary storage '{}' has no configuration",
					storage_name
				))
			})?;
		let storage_factory = factories.storage_factories.get(storage_name).ok_or_else(|| {
			BuilderError::Config(format!("Unknown storage implementation '{}'", storage_name))
		})?;
		let storage_backend = storage_factory(storage_config).map_err(|e| {
			BuilderError::Config(format!(
				"Failed to create storage implementation '{}': {}",
				storage_name, e
			))
		})?;
		tracing::info!(component = "storage", implementation = %storage_name, "Loaded");
		let storage = Arc::new(StorageService::new(storage_backend));

		// Create the channel transport, when announcing is enabled
		let channel_backend = if self.config.channel.enabled {
			let channel_name = self.config.channel.primary.as_ref().ok_or_else(|| {
				BuilderError::Config("channel.primary is required when channel is enabled".into())
			})?;
			let channel_config = self
				.config
				.channel
				.implementations
				.get(channel_name)
				.ok_or_else(|| {
					BuilderError::Config(format!(
						"Primary channel '{}' has no configuration",
						channel_name
					))
				})?;
			let channel_factory =
				factories.channel_factories.get(channel_name).ok_or_else(|| {
					BuilderError::Config(format!(
						"Unknown channel implementation '{}'",
						channel_name
					))
				})?;
			let backend = channel_factory(channel_config).map_err(|e| {
				BuilderError::Config(format!(
					"Failed to create channel implementation '{}': {}",
					channel_name, e
				))
			})?;
			tracing::info!(component = "channel", implementation = %channel_name, "Loaded");
			Some(backend)
		} else {
			tracing::info!(component = "channel", "Announcing disabled");
			None
		};

		let retry = RetryPolicy {
			max_attempts: self.config.channel.max_attempts,
			base_delay: Duration::from_millis(self.config.channel.base_delay_ms),
			max_delay: Duration::from_millis(self.config.channel.max_delay_ms),
		};
		let channel = Arc::new(ChannelService::new(
			channel_backend,
			retry,
			self.config.channel.contact_url.clone(),
			shutdown.clone(),
		));

		// Wire the order flow to the sync worker and start it
		let (sync_tx, sync_rx) = mpsc::unbounded_channel();
		let orders = Arc::new(OrderFlowService::new(storage.clone(), sync_tx));
		let worker = ChannelSyncWorker::new(storage.clone(), channel.clone());
		let sync_task = tokio::spawn(worker.run(sync_rx, shutdown.clone()));

		Ok(DeskEngine::new(
			self.config,
			storage,
			orders,
			shutdown,
			sync_task,
		))
	}
}
