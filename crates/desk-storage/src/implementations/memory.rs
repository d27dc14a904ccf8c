//! In-memory storage backend implementation for the desk service.
//!
//! This module provides a memory-based implementation of the StorageInterface
//! trait, useful for testing and development scenarios where persistence is
//! not required.

use crate::tables::Tables;
use crate::{StorageInterface, StoreError};
use async_trait::async_trait;
use desk_types::{
	Application, ApplicationStatus, NewOrder, Order, OrderStatus, OrderTransition, StatusRecord,
};
use tokio::sync::RwLock;

/// In-memory storage implementation.
///
/// This implementation keeps all tables in memory behind a read-write
/// lock, providing fast access but no persistence across restarts. The
/// write lock is the transaction boundary: table mutations validate
/// before writing, so a failed operation leaves the state untouched.
pub struct MemoryStorage {
	tables: RwLock<Tables>,
}

impl MemoryStorage {
	/// Creates a new empty MemoryStorage instance.
	pub fn new() -> Self {
		Self {
			tables: RwLock::new(Tables::default()),
		}
	}
}

impl Default for MemoryStorage {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn insert_order(&self, new: NewOrder, status: OrderStatus) -> Result<Order, StoreError> {
		self.tables.write().await.insert_order(new, status)
	}

	async fn get_order(&self, order_id: u64) -> Result<Order, StoreError> {
		self.tables.read().await.get_order(order_id)
	}

	async fn list_orders_for_actor(
		&self,
		actor: i64,
		limit: usize,
	) -> Result<Vec<Order>, StoreError> {
		Ok(self.tables.read().await.list_orders_for_actor(actor, limit))
	}

	async fn set_channel_message(
		&self,
		order_id: u64,
		message_id: i64,
	) -> Result<Order, StoreError> {
		self.tables.write().await.set_channel_message(order_id, message_id)
	}

	async fn transition_order(
		&self,
		order_id: u64,
		transition: OrderTransition,
	) -> Result<Order, StoreError> {
		self.tables.write().await.transition_order(order_id, transition)
	}

	async fn list_history(&self, order_id: u64) -> Result<Vec<StatusRecord>, StoreError> {
		self.tables.read().await.list_history(order_id)
	}

	async fn create_or_get_application(
		&self,
		order_id: u64,
		applicant: i64,
		applicant_name: Option<String>,
	) -> Result<(Application, bool), StoreError> {
		self.tables
			.write()
			.await
			.create_or_get_application(order_id, applicant, applicant_name)
	}

	async fn get_application(&self, app_id: u64) -> Result<Application, StoreError> {
		self.tables.read().await.get_application(app_id)
	}

	async fn list_applications(
		&self,
		order_id: u64,
		status: Option<ApplicationStatus>,
	) -> Result<Vec<Application>, StoreError> {
		Ok(self.tables.read().await.list_applications(order_id, status))
	}

	async fn update_application(
		&self,
		app_id: u64,
		status: ApplicationStatus,
	) -> Result<Application, StoreError> {
		self.tables.write().await.update_application(app_id, status)
	}

	async fn approve_application(
		&self,
		order_id: u64,
		app_id: u64,
		approver: i64,
		note: Option<String>,
	) -> Result<(Order, Application), StoreError> {
		self.tables
			.write()
			.await
			.approve_application(order_id, app_id, approver, note)
	}

	async fn delete_order(&self, order_id: u64) -> Result<(), StoreError> {
		self.tables.write().await.delete_order(order_id)
	}
}

/// Factory function to create a memory storage backend from configuration.
///
/// Configuration parameters:
/// - None required for memory storage
pub fn create_storage(_config: &toml::Value) -> Result<Box<dyn StorageInterface>, StoreError> {
	Ok(Box::new(MemoryStorage::new()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use desk_types::OrderChanges;

	fn sample_order(created_by: i64) -> NewOrder {
		NewOrder {
			title: "Fix the fence".into(),
			content: "North side, two broken panels".into(),
			created_by,
			..NewOrder::default()
		}
	}

	#[tokio::test]
	async fn test_insert_writes_creation_record() {
		let storage = MemoryStorage::new();
		let order = storage
			.insert_order(sample_order(10), OrderStatus::New)
			.await
			.unwrap();
		assert_eq!(order.id, 1);
		assert_eq!(order.status, OrderStatus::New);
		assert!(order.claimed_by.is_none());

		let history = storage.list_history(order.id).await.unwrap();
		assert_eq!(history.len(), 1);
		assert_eq!(history[0].from_status, None);
		assert_eq!(history[0].to_status, OrderStatus::New);
		assert_eq!(history[0].actor, 10);
	}

	#[tokio::test]
	async fn test_transition_checks_expected_status() {
		let storage = MemoryStorage::new();
		let order = storage
			.insert_order(sample_order(10), OrderStatus::New)
			.await
			.unwrap();

		let claimed = storage
			.transition_order(
				order.id,
				OrderTransition {
					expected: OrderStatus::New,
					to: OrderStatus::Claimed,
					changes: OrderChanges::claim(20, Some("op".into())),
					actor: 20,
					note: None,
				},
			)
			.await
			.unwrap();
		assert_eq!(claimed.status, OrderStatus::Claimed);
		assert_eq!(claimed.claimed_by, Some(20));

		// A stale expectation must fail without writing anything.
		let err = storage
			.transition_order(
				order.id,
				OrderTransition {
					expected: OrderStatus::New,
					to: OrderStatus::Claimed,
					changes: OrderChanges::claim(30, None),
					actor: 30,
					note: None,
				},
			)
			.await
			.unwrap_err();
		assert!(matches!(err, StoreError::Conflict(_)));

		let unchanged = storage.get_order(order.id).await.unwrap();
		assert_eq!(unchanged.claimed_by, Some(20));
		assert_eq!(storage.list_history(order.id).await.unwrap().len(), 2);
	}

	#[tokio::test]
	async fn test_reapplying_returns_existing_application() {
		let storage = MemoryStorage::new();
		let order = storage
			.insert_order(sample_order(10), OrderStatus::New)
			.await
			.unwrap();

		let (first, created) = storage
			.create_or_get_application(order.id, 42, Some("alice".into()))
			.await
			.unwrap();
		assert!(created);

		let (second, created) = storage
			.create_or_get_application(order.id, 42, Some("alice".into()))
			.await
			.unwrap();
		assert!(!created);
		assert_eq!(first.id, second.id);
	}

	#[tokio::test]
	async fn test_approve_rejects_pending_siblings() {
		let storage = MemoryStorage::new();
		let order = storage
			.insert_order(sample_order(10), OrderStatus::New)
			.await
			.unwrap();
		let (winner, _) = storage
			.create_or_get_application(order.id, 42, None)
			.await
			.unwrap();
		let (loser, _) = storage
			.create_or_get_application(order.id, 43, None)
			.await
			.unwrap();

		let (order, approved) = storage
			.approve_application(order.id, winner.id, 1, None)
			.await
			.unwrap();
		assert_eq!(order.status, OrderStatus::Claimed);
		assert_eq!(order.claimed_by, Some(42));
		assert_eq!(approved.status, ApplicationStatus::Approved);

		let rejected = storage.get_application(loser.id).await.unwrap();
		assert_eq!(rejected.status, ApplicationStatus::Rejected);
	}

	#[tokio::test]
	async fn test_delete_cascades() {
		let storage = MemoryStorage::new();
		let order = storage
			.insert_order(sample_order(10), OrderStatus::New)
			.await
			.unwrap();
		let (app, _) = storage
			.create_or_get_application(order.id, 42, None)
			.await
			.unwrap();

		storage.delete_order(order.id).await.unwrap();

		assert!(matches!(
			storage.get_order(order.id).await,
			Err(StoreError::NotFound)
		));
		assert!(matches!(
			storage.list_history(order.id).await,
			Err(StoreError::NotFound)
		));
		let app = storage.get_application(app.id).await.unwrap();
		assert_eq!(app.status, ApplicationStatus::Rejected);
	}
}
