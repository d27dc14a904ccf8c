//! Storage module for the order desk system.
//!
//! This module provides abstractions for persistent storage of desk data:
//! orders, their append-only status history, and claim applications. It
//! supports different backend implementations such as in-memory or
//! file-based storage.
//!
//! Every mutating operation is atomic: the backend applies the full set
//! of writes (including the history row that accompanies each status
//! change) or nothing at all. Conditional transitions carry the expected
//! current status so that concurrent mutations are decided by a
//! compare-and-swap instead of a read-then-write race.

use async_trait::async_trait;
use desk_types::{
	Application, ApplicationStatus, NewOrder, Order, OrderStatus, OrderTransition, StatusRecord,
};
use thiserror::Error;

mod tables;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
	/// Error that occurs when a requested entity is not found.
	#[error("Not found")]
	NotFound,
	/// Error that occurs when a conditional update finds unexpected state.
	#[error("Conflict: {0}")]
	Conflict(String),
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the low-level interface for storage backends.
///
/// This trait must be implemented by any storage backend that wants to
/// integrate with the desk system. Each method is a single atomic unit of
/// work against the backing store.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Inserts a new order with the given initial status.
	///
	/// Assigns the order id and appends the creation history record
	/// (`from_status = None`) in the same unit.
	async fn insert_order(&self, new: NewOrder, status: OrderStatus) -> Result<Order, StoreError>;

	/// Retrieves an order by id.
	async fn get_order(&self, order_id: u64) -> Result<Order, StoreError>;

	/// Lists orders created by or claimed by the given actor, most
	/// recently updated first, up to `limit` entries.
	async fn list_orders_for_actor(&self, actor: i64, limit: usize)
		-> Result<Vec<Order>, StoreError>;

	/// Stores the broadcast channel message id on an order.
	async fn set_channel_message(&self, order_id: u64, message_id: i64)
		-> Result<Order, StoreError>;

	/// Applies a conditional status transition.
	///
	/// Fails with [`StoreError::Conflict`] without writing anything when
	/// the order's current status differs from `transition.expected`.
	/// Otherwise the status change, field updates and history record are
	/// committed together.
	async fn transition_order(
		&self,
		order_id: u64,
		transition: OrderTransition,
	) -> Result<Order, StoreError>;

	/// Returns an order's history records in chronological order.
	async fn list_history(&self, order_id: u64) -> Result<Vec<StatusRecord>, StoreError>;

	/// Creates an application, or returns the existing row for the same
	/// (order, applicant) pair. The boolean is `true` when a new row was
	/// created.
	async fn create_or_get_application(
		&self,
		order_id: u64,
		applicant: i64,
		applicant_name: Option<String>,
	) -> Result<(Application, bool), StoreError>;

	/// Retrieves an application by id.
	async fn get_application(&self, app_id: u64) -> Result<Application, StoreError>;

	/// Lists applications for an order, oldest first, optionally filtered
	/// by status.
	async fn list_applications(
		&self,
		order_id: u64,
		status: Option<ApplicationStatus>,
	) -> Result<Vec<Application>, StoreError>;

	/// Rewrites an application's status.
	async fn update_application(
		&self,
		app_id: u64,
		status: ApplicationStatus,
	) -> Result<Application, StoreError>;

	/// Approves an application and claims the order for the applicant as
	/// one atomic unit: the application becomes Approved, its pending
	/// siblings become Rejected, and the order transitions New -> Claimed
	/// with the applicant recorded as claimant.
	///
	/// Fails with [`StoreError::Conflict`] when the order is no longer in
	/// the New status; nothing is written in that case.
	async fn approve_application(
		&self,
		order_id: u64,
		app_id: u64,
		approver: i64,
		note: Option<String>,
	) -> Result<(Order, Application), StoreError>;

	/// Removes an order, its history records, and rewrites its
	/// applications to Rejected.
	async fn delete_order(&self, order_id: u64) -> Result<(), StoreError>;
}

/// Type alias for storage factory functions.
///
/// This is the function signature that all storage implementations must
/// provide to create instances of their storage interface.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StoreError>;

/// High-level storage service used by the rest of the workspace.
///
/// The StorageService wraps a storage backend and is the single
/// persistence handle other crates hold. Mutations are traced here so
/// backends stay free of logging concerns.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	/// Inserts a new order with the given initial status.
	pub async fn insert_order(
		&self,
		new: NewOrder,
		status: OrderStatus,
	) -> Result<Order, StoreError> {
		let order = self.backend.insert_order(new, status).await?;
		tracing::debug!(order_id = order.id, status = %order.status, "Order inserted");
		Ok(order)
	}

	/// Retrieves an order by id.
	pub async fn get_order(&self, order_id: u64) -> Result<Order, StoreError> {
		self.backend.get_order(order_id).await
	}

	/// Lists orders created by or claimed by the given actor.
	pub async fn list_orders_for_actor(
		&self,
		actor: i64,
		limit: usize,
	) -> Result<Vec<Order>, StoreError> {
		self.backend.list_orders_for_actor(actor, limit).await
	}

	/// Stores the broadcast channel message id on an order.
	pub async fn set_channel_message(
		&self,
		order_id: u64,
		message_id: i64,
	) -> Result<Order, StoreError> {
		let order = self.backend.set_channel_message(order_id, message_id).await?;
		tracing::debug!(order_id, message_id, "Channel message recorded");
		Ok(order)
	}

	/// Applies a conditional status transition.
	pub async fn transition_order(
		&self,
		order_id: u64,
		transition: OrderTransition,
	) -> Result<Order, StoreError> {
		let to = transition.to;
		let order = self.backend.transition_order(order_id, transition).await?;
		tracing::debug!(order_id, status = %to, "Order transitioned");
		Ok(order)
	}

	/// Returns an order's history records in chronological order.
	pub async fn list_history(&self, order_id: u64) -> Result<Vec<StatusRecord>, StoreError> {
		self.backend.list_history(order_id).await
	}

	/// Creates an application or returns the existing row.
	pub async fn create_or_get_application(
		&self,
		order_id: u64,
		applicant: i64,
		applicant_name: Option<String>,
	) -> Result<(Application, bool), StoreError> {
		let (application, created) = self
			.backend
			.create_or_get_application(order_id, applicant, applicant_name)
			.await?;
		if created {
			tracing::debug!(order_id, app_id = application.id, "Application created");
		}
		Ok((application, created))
	}

	/// Retrieves an application by id.
	pub async fn get_application(&self, app_id: u64) -> Result<Application, StoreError> {
		self.backend.get_application(app_id).await
	}

	/// Lists applications for an order, optionally filtered by status.
	pub async fn list_applications(
		&self,
		order_id: u64,
		status: Option<ApplicationStatus>,
	) -> Result<Vec<Application>, StoreError> {
		self.backend.list_applications(order_id, status).await
	}

	/// Rewrites an application's status.
	pub async fn update_application(
		&self,
		app_id: u64,
		status: ApplicationStatus,
	) -> Result<Application, StoreError> {
		let application = self.backend.update_application(app_id, status).await?;
		tracing::debug!(app_id, status = %status, "Application updated");
		Ok(application)
	}

	/// Approves an application and claims the order atomically.
	pub async fn approve_application(
		&self,
		order_id: u64,
		app_id: u64,
		approver: i64,
		note: Option<String>,
	) -> Result<(Order, Application), StoreError> {
		let (order, application) = self
			.backend
			.approve_application(order_id, app_id, approver, note)
			.await?;
		tracing::debug!(order_id, app_id, "Application approved");
		Ok((order, application))
	}

	/// Removes an order with cascade semantics.
	pub async fn delete_order(&self, order_id: u64) -> Result<(), StoreError> {
		self.backend.delete_order(order_id).await?;
		tracing::debug!(order_id, "Order deleted");
		Ok(())
	}
}
