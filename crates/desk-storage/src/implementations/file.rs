//! File-based storage backend implementation for the desk service.
//!
//! This module stores the complete table state as a JSON snapshot on the
//! filesystem, providing simple persistence without external
//! dependencies. Mutations are applied to a copy of the state and only
//! become visible after the snapshot has been written, so a failed write
//! rolls the whole unit back.

use crate::tables::Tables;
use crate::{StorageInterface, StoreError};
use async_trait::async_trait;
use desk_types::{
	Application, ApplicationStatus, NewOrder, Order, OrderStatus, OrderTransition, StatusRecord,
};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;

/// File-backed storage implementation.
///
/// The in-memory tables are the working copy; every committed mutation is
/// serialized to `path` via a temp-file write followed by an atomic
/// rename, so the snapshot on disk is always a complete, parseable state.
pub struct FileStorage {
	path: PathBuf,
	tables: RwLock<Tables>,
}

impl FileStorage {
	/// Opens a file-backed store, loading the existing snapshot when the
	/// file is present.
	pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
		let path = path.as_ref().to_path_buf();
		let tables = match std::fs::read(&path) {
			Ok(bytes) => serde_json::from_slice(&bytes)
				.map_err(|e| StoreError::Serialization(e.to_string()))?,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Tables::default(),
			Err(e) => return Err(StoreError::Backend(e.to_string())),
		};
		Ok(Self {
			path,
			tables: RwLock::new(tables),
		})
	}

	/// Writes a snapshot atomically (temp file + rename).
	async fn persist(&self, tables: &Tables) -> Result<(), StoreError> {
		if let Some(parent) = self.path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StoreError::Backend(e.to_string()))?;
		}

		let bytes = serde_json::to_vec_pretty(tables)
			.map_err(|e| StoreError::Serialization(e.to_string()))?;

		let temp_path = self.path.with_extension("tmp");
		fs::write(&temp_path, bytes)
			.await
			.map_err(|e| StoreError::Backend(e.to_string()))?;
		fs::rename(&temp_path, &self.path)
			.await
			.map_err(|e| StoreError::Backend(e.to_string()))?;

		Ok(())
	}

	/// Runs a mutation against a copy of the tables and commits it only
	/// after the snapshot write succeeded.
	async fn commit<T>(
		&self,
		mutate: impl FnOnce(&mut Tables) -> Result<T, StoreError>,
	) -> Result<T, StoreError> {
		let mut guard = self.tables.write().await;
		let mut next = guard.clone();
		let out = mutate(&mut next)?;
		self.persist(&next).await?;
		*guard = next;
		Ok(out)
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn insert_order(&self, new: NewOrder, status: OrderStatus) -> Result<Order, StoreError> {
		self.commit(|t| t.insert_order(new, status)).await
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
		self.commit(|t| t.set_channel_message(order_id, message_id)).await
	}

	async fn transition_order(
		&self,
		order_id: u64,
		transition: OrderTransition,
	) -> Result<Order, StoreError> {
		self.commit(|t| t.transition_order(order_id, transition)).await
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
		self.commit(|t| t.create_or_get_application(order_id, applicant, applicant_name))
			.await
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
		self.commit(|t| t.update_application(app_id, status)).await
	}

	async fn approve_application(
		&self,
		order_id: u64,
		app_id: u64,
		approver: i64,
		note: Option<String>,
	) -> Result<(Order, Application), StoreError> {
		self.commit(|t| t.approve_application(order_id, app_id, approver, note))
			.await
	}

	async fn delete_order(&self, order_id: u64) -> Result<(), StoreError> {
		self.commit(|t| t.delete_order(order_id)).await
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: Snapshot file location (default: "./data/orderdesk.json")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StoreError> {
	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or("./data/orderdesk.json")
		.to_string();

	Ok(Box::new(FileStorage::open(PathBuf::from(storage_path))?))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample_order() -> NewOrder {
		NewOrder {
			title: "Paint the shed".into(),
			content: "Green, two coats".into(),
			created_by: 7,
			..NewOrder::default()
		}
	}

	#[tokio::test]
	async fn test_snapshot_survives_reopen() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("desk.json");

		let storage = FileStorage::open(&path).unwrap();
		let order = storage
			.insert_order(sample_order(), OrderStatus::New)
			.await
			.unwrap();
		drop(storage);

		let reopened = FileStorage::open(&path).unwrap();
		let loaded = reopened.get_order(order.id).await.unwrap();
		assert_eq!(loaded.title, "Paint the shed");
		assert_eq!(loaded.status, OrderStatus::New);
		assert_eq!(reopened.list_history(order.id).await.unwrap().len(), 1);

		// Ids keep counting from the snapshot.
		let second = reopened
			.insert_order(sample_order(), OrderStatus::Draft)
			.await
			.unwrap();
		assert_eq!(second.id, order.id + 1);
	}

	#[tokio::test]
	async fn test_failed_mutation_leaves_snapshot_unchanged() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("desk.json");

		let storage = FileStorage::open(&path).unwrap();
		let order = storage
			.insert_order(sample_order(), OrderStatus::New)
			.await
			.unwrap();

		let err = storage
			.transition_order(
				order.id,
				OrderTransition {
					expected: OrderStatus::Draft,
					to: OrderStatus::New,
					changes: Default::default(),
					actor: 7,
					note: None,
				},
			)
			.await
			.unwrap_err();
		assert!(matches!(err, StoreError::Conflict(_)));

		let reopened = FileStorage::open(&path).unwrap();
		let loaded = reopened.get_order(order.id).await.unwrap();
		assert_eq!(loaded.status, OrderStatus::New);
		assert_eq!(reopened.list_history(order.id).await.unwrap().len(), 1);
	}
}
