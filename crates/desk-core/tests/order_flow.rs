//! End-to-end tests for the order state machine.
//!
//! These tests drive the order flow service against the in-memory
//! storage backend and assert on the committed state, the history
//! ledger, and the sync requests queued for the channel worker.

use desk_core::state::is_valid_transition;
use desk_core::{OrderFlowError, OrderFlowService};
use desk_storage::implementations::memory::MemoryStorage;
use desk_storage::StorageService;
use desk_types::{ApplicationStatus, NewOrder, OrderStatus, SyncRequest};
use std::sync::Arc;
use tokio::sync::mpsc;

fn setup() -> (
	Arc<StorageService>,
	OrderFlowService,
	mpsc::UnboundedReceiver<SyncRequest>,
) {
	let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
	let (sync_tx, sync_rx) = mpsc::unbounded_channel();
	let orders = OrderFlowService::new(storage.clone(), sync_tx);
	(storage, orders, sync_rx)
}

fn new_order(creator: i64) -> NewOrder {
	NewOrder {
		title: "T".into(),
		content: "C".into(),
		created_by: creator,
		..NewOrder::default()
	}
}

fn drain(rx: &mut mpsc::UnboundedReceiver<SyncRequest>) -> Vec<SyncRequest> {
	let mut requests = Vec::new();
	while let Ok(request) = rx.try_recv() {
		requests.push(request);
	}
	requests
}

#[tokio::test]
async fn create_claim_and_reject_second_claim() {
	let (_storage, orders, mut rx) = setup();

	let order = orders.create_order(new_order(10)).await.unwrap();
	assert_eq!(order.status, OrderStatus::New);
	assert!(order.claimed_by.is_none());

	let history = orders.history(order.id).await.unwrap();
	assert_eq!(history.len(), 1);
	assert_eq!(history[0].from_status, None);
	assert_eq!(history[0].to_status, OrderStatus::New);

	let claimed = orders.claim_order(order.id, 20, Some("op".into())).await.unwrap();
	assert_eq!(claimed.status, OrderStatus::Claimed);
	assert_eq!(claimed.claimed_by, Some(20));
	assert_eq!(orders.history(order.id).await.unwrap().len(), 2);

	// Second claim loses: typed rejection, nothing changes.
	let err = orders.claim_order(order.id, 30, None).await.unwrap_err();
	assert!(matches!(err, OrderFlowError::OnlyNewCanBeClaimed));
	let unchanged = orders.get_order(order.id).await.unwrap();
	assert_eq!(unchanged.claimed_by, Some(20));
	assert_eq!(orders.history(order.id).await.unwrap().len(), 2);

	let requests = drain(&mut rx);
	assert_eq!(
		requests,
		vec![
			SyncRequest::Publish { order_id: order.id },
			SyncRequest::Edit { order_id: order.id },
		]
	);
}

#[tokio::test]
async fn illegal_jump_is_rejected_without_history() {
	let (_storage, orders, _rx) = setup();
	let order = orders.create_order(new_order(10)).await.unwrap();

	let err = orders
		.update_status(order.id, OrderStatus::Done, 10, None)
		.await
		.unwrap_err();
	assert!(matches!(
		err,
		OrderFlowError::InvalidTransition {
			from: OrderStatus::New,
			to: OrderStatus::Done,
		}
	));

	let unchanged = orders.get_order(order.id).await.unwrap();
	assert_eq!(unchanged.status, OrderStatus::New);
	assert_eq!(orders.history(order.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn same_status_update_is_idempotent() {
	let (_storage, orders, mut rx) = setup();
	let order = orders.create_order(new_order(10)).await.unwrap();
	drain(&mut rx);

	let unchanged = orders
		.update_status(order.id, OrderStatus::New, 10, None)
		.await
		.unwrap();
	assert_eq!(unchanged.status, OrderStatus::New);
	assert_eq!(orders.history(order.id).await.unwrap().len(), 1);
	assert!(drain(&mut rx).is_empty(), "no-op must not dispatch a sync");
}

#[tokio::test]
async fn full_lifecycle_history_is_chained_and_legal() {
	let (_storage, orders, _rx) = setup();
	let order = orders.create_order(new_order(10)).await.unwrap();
	orders.claim_order(order.id, 20, None).await.unwrap();
	orders
		.update_status(order.id, OrderStatus::InProgress, 20, None)
		.await
		.unwrap();
	orders
		.update_status(order.id, OrderStatus::Done, 20, Some("delivered".into()))
		.await
		.unwrap();

	let history = orders.history(order.id).await.unwrap();
	assert_eq!(history.len(), 4);
	assert_eq!(history[0].from_status, None);
	for pair in history.windows(2) {
		assert_eq!(pair[1].from_status, Some(pair[0].to_status));
		assert!(is_valid_transition(
			&pair[1].from_status.unwrap(),
			&pair[1].to_status
		));
	}
	assert_eq!(history[3].note.as_deref(), Some("delivered"));

	let done = orders.get_order(order.id).await.unwrap();
	assert_eq!(done.status, OrderStatus::Done);
	assert_eq!(done.claimed_by, Some(20), "completion keeps the claimant");
}

#[tokio::test]
async fn cancel_releases_the_claimant() {
	let (_storage, orders, _rx) = setup();
	let order = orders.create_order(new_order(10)).await.unwrap();
	orders.claim_order(order.id, 20, None).await.unwrap();

	let canceled = orders
		.update_status(order.id, OrderStatus::Canceled, 10, None)
		.await
		.unwrap();
	assert_eq!(canceled.status, OrderStatus::Canceled);
	assert!(canceled.claimed_by.is_none());
	assert!(canceled.claimed_by_name.is_none());
}

#[tokio::test]
async fn direct_claim_via_status_update_records_actor() {
	let (_storage, orders, _rx) = setup();
	let order = orders.create_order(new_order(10)).await.unwrap();

	let claimed = orders
		.update_status(order.id, OrderStatus::Claimed, 33, None)
		.await
		.unwrap();
	assert_eq!(claimed.claimed_by, Some(33));
}

#[tokio::test]
async fn draft_flow_publishes_once_opened() {
	let (_storage, orders, mut rx) = setup();

	let draft = orders.create_draft(new_order(10)).await.unwrap();
	assert_eq!(draft.status, OrderStatus::Draft);
	assert!(drain(&mut rx).is_empty(), "drafts are not announced");

	let opened = orders.publish_draft(draft.id).await.unwrap();
	assert_eq!(opened.status, OrderStatus::New);
	let history = orders.history(draft.id).await.unwrap();
	assert_eq!(history.len(), 2);
	assert_eq!(history[1].from_status, Some(OrderStatus::Draft));
	assert_eq!(history[1].to_status, OrderStatus::New);
	assert_eq!(
		drain(&mut rx),
		vec![SyncRequest::Publish { order_id: draft.id }]
	);

	// Publishing again skips the transition and appends no history.
	let again = orders.publish_draft(draft.id).await.unwrap();
	assert_eq!(again.status, OrderStatus::New);
	assert_eq!(orders.history(draft.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn missing_order_is_a_typed_error() {
	let (_storage, orders, _rx) = setup();
	assert!(matches!(
		orders.get_order(99).await.unwrap_err(),
		OrderFlowError::OrderNotFound
	));
	assert!(matches!(
		orders.claim_order(99, 20, None).await.unwrap_err(),
		OrderFlowError::OrderNotFound
	));
	assert!(matches!(
		orders.publish_draft(99).await.unwrap_err(),
		OrderFlowError::OrderNotFound
	));
	assert!(matches!(
		orders.delete_order(99, 1).await.unwrap_err(),
		OrderFlowError::OrderNotFound
	));
}

#[tokio::test]
async fn approval_claims_for_applicant_and_rejects_siblings() {
	let (_storage, orders, mut rx) = setup();
	let order = orders.create_order(new_order(10)).await.unwrap();
	drain(&mut rx);

	let first = orders
		.apply_for_order(order.id, 42, Some("alice".into()))
		.await
		.unwrap();
	let second = orders
		.apply_for_order(order.id, 43, Some("bob".into()))
		.await
		.unwrap();
	assert_eq!(first.status, ApplicationStatus::Pending);

	// Re-applying returns the existing application.
	let reapplied = orders
		.apply_for_order(order.id, 42, Some("alice".into()))
		.await
		.unwrap();
	assert_eq!(reapplied.id, first.id);

	let claimed = orders
		.approve_application(order.id, first.id, 1)
		.await
		.unwrap();
	assert_eq!(claimed.status, OrderStatus::Claimed);
	assert_eq!(claimed.claimed_by, Some(42));
	assert_eq!(claimed.claimed_by_name.as_deref(), Some("alice"));
	assert_eq!(drain(&mut rx), vec![SyncRequest::Edit { order_id: order.id }]);

	let applications = orders
		.applications_for_order(order.id, None)
		.await
		.unwrap();
	let winner = applications.iter().find(|a| a.id == first.id).unwrap();
	let loser = applications.iter().find(|a| a.id == second.id).unwrap();
	assert_eq!(winner.status, ApplicationStatus::Approved);
	assert_eq!(loser.status, ApplicationStatus::Rejected);
}

#[tokio::test]
async fn approval_requires_an_open_order() {
	let (_storage, orders, _rx) = setup();
	let order = orders.create_order(new_order(10)).await.unwrap();
	let application = orders.apply_for_order(order.id, 42, None).await.unwrap();

	orders.claim_order(order.id, 20, None).await.unwrap();

	let err = orders
		.approve_application(order.id, application.id, 1)
		.await
		.unwrap_err();
	assert!(matches!(err, OrderFlowError::OnlyNewCanBeClaimed));

	// The application is left pending for an order that can no longer be
	// claimed directly; only deletion or rejection resolves it.
	let pending = orders
		.applications_for_order(order.id, Some(ApplicationStatus::Pending))
		.await
		.unwrap();
	assert_eq!(pending.len(), 1);
}

#[tokio::test]
async fn approving_a_foreign_application_fails() {
	let (_storage, orders, _rx) = setup();
	let first = orders.create_order(new_order(10)).await.unwrap();
	let second = orders.create_order(new_order(11)).await.unwrap();
	let application = orders.apply_for_order(second.id, 42, None).await.unwrap();

	let err = orders
		.approve_application(first.id, application.id, 1)
		.await
		.unwrap_err();
	assert!(matches!(err, OrderFlowError::ApplicationNotFound));

	let err = orders.approve_application(first.id, 999, 1).await.unwrap_err();
	assert!(matches!(err, OrderFlowError::ApplicationNotFound));
}

#[tokio::test]
async fn rejection_is_terminal_and_leaves_the_order_alone() {
	let (_storage, orders, _rx) = setup();
	let order = orders.create_order(new_order(10)).await.unwrap();
	let application = orders.apply_for_order(order.id, 42, None).await.unwrap();

	let rejected = orders.reject_application(application.id, 1).await.unwrap();
	assert_eq!(rejected.status, ApplicationStatus::Rejected);
	assert_eq!(
		orders.get_order(order.id).await.unwrap().status,
		OrderStatus::New
	);

	let err = orders.reject_application(application.id, 1).await.unwrap_err();
	assert!(matches!(err, OrderFlowError::UpdateFailed));
}

#[tokio::test]
async fn deletion_cascades_to_history_and_applications() {
	let (storage, orders, _rx) = setup();
	let order = orders.create_order(new_order(10)).await.unwrap();
	let application = orders.apply_for_order(order.id, 42, None).await.unwrap();

	orders.delete_order(order.id, 10).await.unwrap();

	assert!(matches!(
		orders.get_order(order.id).await.unwrap_err(),
		OrderFlowError::OrderNotFound
	));
	assert!(matches!(
		orders.history(order.id).await.unwrap_err(),
		OrderFlowError::OrderNotFound
	));
	let application = storage.get_application(application.id).await.unwrap();
	assert_eq!(application.status, ApplicationStatus::Rejected);
}

#[tokio::test]
async fn related_orders_lists_created_and_claimed() {
	let (_storage, orders, _rx) = setup();
	let created = orders.create_order(new_order(10)).await.unwrap();
	let claimed = orders.create_order(new_order(11)).await.unwrap();
	orders.claim_order(claimed.id, 10, None).await.unwrap();
	orders.create_order(new_order(12)).await.unwrap(); // unrelated

	let related = orders.orders_for_actor(10).await.unwrap();
	let ids: Vec<u64> = related.iter().map(|o| o.id).collect();
	assert_eq!(related.len(), 2);
	assert!(ids.contains(&created.id));
	assert!(ids.contains(&claimed.id));
}
