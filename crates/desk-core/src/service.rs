//! Order flow service: the state machine's operations.
//!
//! Every order mutation in the system goes through this service. Each
//! operation reads the current row, validates it against the transition
//! table, and commits the status change together with its history record
//! in one conditional storage call. Channel synchronization is dispatched
//! strictly after the commit, over an in-process queue, so external I/O
//! never runs inside the storage critical section and a failing sink
//! never fails an operation.

use crate::state::is_valid_transition;
use desk_types::{
	Application, ApplicationStatus, NewOrder, Order, OrderChanges, OrderStatus, OrderTransition,
	StatusRecord, SyncRequest,
};
use desk_storage::{StorageService, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::instrument;

/// Maximum number of entries returned by the related-orders listing.
const RELATED_ORDERS_LIMIT: usize = 20;

/// Business errors for invalid transitions, missing entities, and
/// failed conditional updates.
///
/// All variants except [`OrderFlowError::Storage`] are expected
/// user-facing rejections: the dispatch layer renders them verbatim and
/// they are not system faults. `Storage` is the infrastructure class;
/// the failed unit of work has been rolled back by the backend.
#[derive(Debug, Error)]
pub enum OrderFlowError {
	#[error("order_not_found")]
	OrderNotFound,
	#[error("application_not_found")]
	ApplicationNotFound,
	#[error("invalid_transition: {from} -> {to}")]
	InvalidTransition { from: OrderStatus, to: OrderStatus },
	#[error("only_NEW_can_be_claimed")]
	OnlyNewCanBeClaimed,
	#[error("update_failed")]
	UpdateFailed,
	#[error("Storage error: {0}")]
	Storage(StoreError),
}

impl OrderFlowError {
	/// Returns `true` for expected business rejections, `false` for
	/// infrastructure faults.
	pub fn is_business(&self) -> bool {
		!matches!(self, OrderFlowError::Storage(_))
	}
}

/// Maps storage errors from order lookups.
fn order_err(e: StoreError) -> OrderFlowError {
	match e {
		StoreError::NotFound => OrderFlowError::OrderNotFound,
		other => OrderFlowError::Storage(other),
	}
}

/// Maps storage errors from application lookups.
fn application_err(e: StoreError) -> OrderFlowError {
	match e {
		StoreError::NotFound => OrderFlowError::ApplicationNotFound,
		other => OrderFlowError::Storage(other),
	}
}

/// Service implementing the order state machine.
pub struct OrderFlowService {
	storage: Arc<StorageService>,
	sync: mpsc::UnboundedSender<SyncRequest>,
}

impl OrderFlowService {
	/// Creates a new OrderFlowService.
	///
	/// `sync` is the queue consumed by the channel sync worker; sends are
	/// fire-and-forget.
	pub fn new(storage: Arc<StorageService>, sync: mpsc::UnboundedSender<SyncRequest>) -> Self {
		Self { storage, sync }
	}

	/// Creates an order open for claiming and dispatches its announcement.
	#[instrument(skip_all, fields(created_by = new.created_by))]
	pub async fn create_order(&self, new: NewOrder) -> Result<Order, OrderFlowError> {
		let order = self
			.storage
			.insert_order(new, OrderStatus::New)
			.await
			.map_err(OrderFlowError::Storage)?;
		tracing::info!(order_id = order.id, "Order created");
		self.dispatch(SyncRequest::Publish { order_id: order.id });
		Ok(order)
	}

	/// Creates an order draft; nothing is announced until
	/// [`publish_draft`](Self::publish_draft).
	#[instrument(skip_all, fields(created_by = new.created_by))]
	pub async fn create_draft(&self, new: NewOrder) -> Result<Order, OrderFlowError> {
		let order = self
			.storage
			.insert_order(new, OrderStatus::Draft)
			.await
			.map_err(OrderFlowError::Storage)?;
		tracing::info!(order_id = order.id, "Draft created");
		Ok(order)
	}

	/// Opens a draft for claiming and dispatches its announcement.
	///
	/// Idempotent: on an already-open order the transition is skipped, and
	/// publishing is only dispatched while no channel message id is stored.
	#[instrument(skip(self))]
	pub async fn publish_draft(&self, order_id: u64) -> Result<Order, OrderFlowError> {
		let mut order = self.storage.get_order(order_id).await.map_err(order_err)?;

		if order.status == OrderStatus::Draft {
			self.ensure_transition(order.status, OrderStatus::New)?;
			order = self
				.storage
				.transition_order(
					order_id,
					OrderTransition {
						expected: OrderStatus::Draft,
						to: OrderStatus::New,
						changes: OrderChanges::default(),
						actor: order.created_by,
						note: None,
					},
				)
				.await
				.map_err(|e| match e {
					StoreError::NotFound => OrderFlowError::OrderNotFound,
					StoreError::Conflict(_) => OrderFlowError::UpdateFailed,
					other => OrderFlowError::Storage(other),
				})?;
			tracing::info!(order_id, "Draft opened for claiming");
		}

		if order.channel_message_id.is_none() {
			self.dispatch(SyncRequest::Publish { order_id });
		}
		Ok(order)
	}

	/// Claims an open order for `actor`.
	///
	/// Status and claimant change in the same atomic step. Concurrent
	/// claims are decided by the storage compare-and-swap: the loser gets
	/// [`OrderFlowError::OnlyNewCanBeClaimed`].
	#[instrument(skip(self, actor_name))]
	pub async fn claim_order(
		&self,
		order_id: u64,
		actor: i64,
		actor_name: Option<String>,
	) -> Result<Order, OrderFlowError> {
		let order = self.storage.get_order(order_id).await.map_err(order_err)?;
		if order.status != OrderStatus::New {
			return Err(OrderFlowError::OnlyNewCanBeClaimed);
		}
		self.ensure_transition(OrderStatus::New, OrderStatus::Claimed)?;

		let updated = self
			.storage
			.transition_order(
				order_id,
				OrderTransition {
					expected: OrderStatus::New,
					to: OrderStatus::Claimed,
					changes: OrderChanges::claim(actor, actor_name),
					actor,
					note: None,
				},
			)
			.await
			.map_err(|e| match e {
				StoreError::NotFound => OrderFlowError::OrderNotFound,
				StoreError::Conflict(_) => OrderFlowError::OnlyNewCanBeClaimed,
				other => OrderFlowError::Storage(other),
			})?;
		tracing::info!(order_id, actor, "Order claimed");

		self.dispatch(SyncRequest::Edit { order_id });
		Ok(updated)
	}

	/// Moves an order to `new_status`.
	///
	/// Requesting the current status is an idempotent no-op that returns
	/// the order unchanged and appends no history. Transitions into
	/// Claimed record `actor` as claimant; transitions into Canceled
	/// release the claimant.
	#[instrument(skip(self, note))]
	pub async fn update_status(
		&self,
		order_id: u64,
		new_status: OrderStatus,
		actor: i64,
		note: Option<String>,
	) -> Result<Order, OrderFlowError> {
		let order = self.storage.get_order(order_id).await.map_err(order_err)?;

		if order.status == new_status {
			return Ok(order);
		}
		self.ensure_transition(order.status, new_status)?;

		let changes = if new_status == OrderStatus::Claimed {
			OrderChanges::claim(actor, None)
		} else if new_status == OrderStatus::Canceled {
			OrderChanges::release_claim()
		} else {
			OrderChanges::default()
		};

		let updated = self
			.storage
			.transition_order(
				order_id,
				OrderTransition {
					expected: order.status,
					to: new_status,
					changes,
					actor,
					note,
				},
			)
			.await
			.map_err(|e| match e {
				StoreError::NotFound => OrderFlowError::OrderNotFound,
				StoreError::Conflict(_) => OrderFlowError::UpdateFailed,
				other => OrderFlowError::Storage(other),
			})?;
		tracing::info!(order_id, status = %new_status, "Order status updated");

		self.dispatch(SyncRequest::Edit { order_id });
		Ok(updated)
	}

	/// Records an application to claim an order.
	///
	/// The order is untouched; re-applying returns the existing row.
	#[instrument(skip(self, applicant_name))]
	pub async fn apply_for_order(
		&self,
		order_id: u64,
		applicant: i64,
		applicant_name: Option<String>,
	) -> Result<Application, OrderFlowError> {
		let (application, created) = self
			.storage
			.create_or_get_application(order_id, applicant, applicant_name)
			.await
			.map_err(order_err)?;
		if created {
			tracing::info!(order_id, applicant, app_id = application.id, "Application received");
		}
		Ok(application)
	}

	/// Approves an application: the applicant claims the order.
	///
	/// Application approval, rejection of pending sibling applications,
	/// the order transition and its history record commit as one unit or
	/// not at all.
	#[instrument(skip(self))]
	pub async fn approve_application(
		&self,
		order_id: u64,
		app_id: u64,
		approver: i64,
	) -> Result<Order, OrderFlowError> {
		let order = self.storage.get_order(order_id).await.map_err(order_err)?;
		if order.status != OrderStatus::New {
			return Err(OrderFlowError::OnlyNewCanBeClaimed);
		}
		self.ensure_transition(OrderStatus::New, OrderStatus::Claimed)?;

		let application = self
			.storage
			.get_application(app_id)
			.await
			.map_err(application_err)?;
		if application.order_id != order_id {
			return Err(OrderFlowError::ApplicationNotFound);
		}
		if application.status != ApplicationStatus::Pending {
			return Err(OrderFlowError::UpdateFailed);
		}

		let (updated, _application) = self
			.storage
			.approve_application(order_id, app_id, approver, None)
			.await
			.map_err(|e| match e {
				StoreError::Conflict(_) => OrderFlowError::OnlyNewCanBeClaimed,
				StoreError::NotFound => OrderFlowError::UpdateFailed,
				other => OrderFlowError::Storage(other),
			})?;
		tracing::info!(order_id, app_id, approver, "Application approved");

		self.dispatch(SyncRequest::Edit { order_id });
		Ok(updated)
	}

	/// Rejects a pending application; the order is untouched.
	#[instrument(skip(self))]
	pub async fn reject_application(
		&self,
		app_id: u64,
		reviewer: i64,
	) -> Result<Application, OrderFlowError> {
		let application = self
			.storage
			.get_application(app_id)
			.await
			.map_err(application_err)?;
		if application.status != ApplicationStatus::Pending {
			return Err(OrderFlowError::UpdateFailed);
		}

		let updated = self
			.storage
			.update_application(app_id, ApplicationStatus::Rejected)
			.await
			.map_err(application_err)?;
		tracing::info!(app_id, reviewer, "Application rejected");
		Ok(updated)
	}

	/// Removes an order.
	///
	/// Its history is removed and its applications are rewritten to
	/// Rejected in the same unit.
	#[instrument(skip(self))]
	pub async fn delete_order(&self, order_id: u64, actor: i64) -> Result<(), OrderFlowError> {
		self.storage.get_order(order_id).await.map_err(order_err)?;
		self.storage.delete_order(order_id).await.map_err(order_err)?;
		tracing::info!(order_id, actor, "Order deleted");
		Ok(())
	}

	/// Retrieves an order by id.
	pub async fn get_order(&self, order_id: u64) -> Result<Order, OrderFlowError> {
		self.storage.get_order(order_id).await.map_err(order_err)
	}

	/// Returns an order's status history, oldest first.
	pub async fn history(&self, order_id: u64) -> Result<Vec<StatusRecord>, OrderFlowError> {
		self.storage.list_history(order_id).await.map_err(order_err)
	}

	/// Lists orders created by or claimed by the actor, newest first.
	pub async fn orders_for_actor(&self, actor: i64) -> Result<Vec<Order>, OrderFlowError> {
		self.storage
			.list_orders_for_actor(actor, RELATED_ORDERS_LIMIT)
			.await
			.map_err(OrderFlowError::Storage)
	}

	/// Lists an order's applications, optionally filtered by status.
	pub async fn applications_for_order(
		&self,
		order_id: u64,
		status: Option<ApplicationStatus>,
	) -> Result<Vec<Application>, OrderFlowError> {
		self.storage.get_order(order_id).await.map_err(order_err)?;
		self.storage
			.list_applications(order_id, status)
			.await
			.map_err(OrderFlowError::Storage)
	}

	/// Rejects the transition when the table disallows it.
	fn ensure_transition(&self, from: OrderStatus, to: OrderStatus) -> Result<(), OrderFlowError> {
		if !is_valid_transition(&from, &to) {
			return Err(OrderFlowError::InvalidTransition { from, to });
		}
		Ok(())
	}

	/// Queues channel synchronization for the sync worker.
	///
	/// Fire-and-forget: a closed queue only means the worker has already
	/// shut down, which is not an error for the committed operation.
	fn dispatch(&self, request: SyncRequest) {
		if self.sync.send(request).is_err() {
			tracing::debug!("Channel sync worker is gone, dropping sync request");
		}
	}
}
