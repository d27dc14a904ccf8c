//! Desk engine: lifecycle of an assembled desk instance.
//!
//! Holds the wired services, waits for the shutdown signal, and tears
//! the instance down in order: cancel the shutdown token (which abandons
//! in-flight channel retries), then wait for the sync worker to stop.
//! Committed order state is never touched by shutdown.

use crate::service::OrderFlowService;
use desk_config::Config;
use desk_storage::StorageService;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Service error: {0}")]
	Service(String),
}

/// A fully wired desk instance.
pub struct DeskEngine {
	config: Config,
	storage: Arc<StorageService>,
	orders: Arc<OrderFlowService>,
	shutdown: CancellationToken,
	sync_task: Mutex<Option<JoinHandle<()>>>,
}

impl DeskEngine {
	pub(crate) fn new(
		config: Config,
		storage: Arc<StorageService>,
		orders: Arc<OrderFlowService>,
		shutdown: CancellationToken,
		sync_task: JoinHandle<()>,
	) -> Self {
		Self {
			config,
			storage,
			orders,
			shutdown,
			sync_task: Mutex::new(Some(sync_task)),
		}
	}

	/// The configuration this engine was built from.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// The persistence handle.
	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}

	/// The order state machine service.
	pub fn orders(&self) -> &Arc<OrderFlowService> {
		&self.orders
	}

	/// Token cancelled when the engine shuts down.
	pub fn shutdown_token(&self) -> CancellationToken {
		self.shutdown.clone()
	}

	/// Runs until interrupted, then shuts down gracefully.
	pub async fn run(&self) -> Result<(), EngineError> {
		tokio::signal::ctrl_c()
			.await
			.map_err(|e| EngineError::Service(e.to_string()))?;
		tracing::info!("Shutdown signal received");
		self.shutdown().await;
		Ok(())
	}

	/// Cancels the shutdown token and waits for the sync worker to stop.
	pub async fn shutdown(&self) {
		self.shutdown.cancel();
		let sync_task = match self.sync_task.lock() {
			Ok(mut guard) => guard.take(),
			Err(_) => None,
		};
		if let Some(task) = sync_task {
			if let Err(e) = task.await {
				tracing::warn!(error = %e, "Channel sync worker ended abnormally");
			}
		}
	}
}
