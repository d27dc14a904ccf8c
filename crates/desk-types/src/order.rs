//! Order types for the desk system.
//!
//! This module defines the order entity, its status lifecycle, the
//! append-only status history ledger, and the write models used by the
//! persistence layer when creating and transitioning orders.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A unit of work published for claiming, tracked through its lifecycle.
///
/// Orders are created by users, claimed by operators, and progressed
/// through the status lifecycle exclusively via the state machine. The
/// optional channel message reference ties the order to its announcement
/// post in the external broadcast channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
	/// Store-assigned identifier, monotonically increasing.
	pub id: u64,
	/// Short human-readable title.
	pub title: String,
	/// Full order description.
	pub content: String,
	/// Optional payout amount.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub amount: Option<Decimal>,
	/// Optional reference to an attached image.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub image_ref: Option<String>,
	/// Current lifecycle status.
	pub status: OrderStatus,
	/// Identifier of the creating user.
	pub created_by: i64,
	/// Display name of the creating user, when known.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub created_by_name: Option<String>,
	/// Contact handle shown alongside the order, when provided.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub contact_name: Option<String>,
	/// Identifier of the claiming operator.
	///
	/// Set exactly when `status` is one of Claimed, InProgress or Done.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub claimed_by: Option<i64>,
	/// Display name of the claiming operator, when known.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub claimed_by_name: Option<String>,
	/// Message id of the announcement post in the broadcast channel.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub channel_message_id: Option<i64>,
	/// Timestamp when this order was created (unix seconds).
	pub created_at: u64,
	/// Timestamp when this order was last updated (unix seconds).
	pub updated_at: u64,
}

/// Status of an order in the desk system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
	/// Order has been drafted but not yet announced.
	Draft,
	/// Order is open for claiming.
	New,
	/// Order has been claimed by an operator.
	Claimed,
	/// Claimed order is being worked on.
	InProgress,
	/// Order is complete (terminal).
	Done,
	/// Order was canceled (terminal).
	Canceled,
}

impl OrderStatus {
	/// Returns `true` if no further transitions are possible.
	pub fn is_terminal(&self) -> bool {
		matches!(self, OrderStatus::Done | OrderStatus::Canceled)
	}

	/// Returns `true` if the status requires a claimant to be recorded.
	pub fn requires_claimant(&self) -> bool {
		matches!(
			self,
			OrderStatus::Claimed | OrderStatus::InProgress | OrderStatus::Done
		)
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OrderStatus::Draft => write!(f, "DRAFT"),
			OrderStatus::New => write!(f, "NEW"),
			OrderStatus::Claimed => write!(f, "CLAIMED"),
			OrderStatus::InProgress => write!(f, "IN_PROGRESS"),
			OrderStatus::Done => write!(f, "DONE"),
			OrderStatus::Canceled => write!(f, "CANCELED"),
		}
	}
}

/// One row of the append-only status history ledger.
///
/// Exactly one record exists per status change, including the initial
/// creation, for which `from_status` is `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
	/// Store-assigned identifier.
	pub id: u64,
	/// Order this record belongs to.
	pub order_id: u64,
	/// Status before the change; `None` for the creation record.
	pub from_status: Option<OrderStatus>,
	/// Status after the change.
	pub to_status: OrderStatus,
	/// Identifier of the user who triggered the change.
	pub actor: i64,
	/// Optional free-form note attached to the change.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub note: Option<String>,
	/// Timestamp when the change was recorded (unix seconds).
	pub created_at: u64,
}

/// Write model for inserting a new order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewOrder {
	pub title: String,
	pub content: String,
	pub amount: Option<Decimal>,
	pub image_ref: Option<String>,
	pub created_by: i64,
	pub created_by_name: Option<String>,
	pub contact_name: Option<String>,
}

/// Field updates applied together with a status transition.
///
/// Each field uses the double-`Option` patch convention: `None` leaves
/// the field untouched, `Some(None)` clears it and `Some(value)` sets it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderChanges {
	pub claimed_by: Option<Option<i64>>,
	pub claimed_by_name: Option<Option<String>>,
}

impl OrderChanges {
	/// Changes that record `claimant` as the claiming operator.
	pub fn claim(claimant: i64, claimant_name: Option<String>) -> Self {
		Self {
			claimed_by: Some(Some(claimant)),
			claimed_by_name: Some(claimant_name),
		}
	}

	/// Changes that clear the claimant fields.
	pub fn release_claim() -> Self {
		Self {
			claimed_by: Some(None),
			claimed_by_name: Some(None),
		}
	}
}

/// A conditional status transition applied as one atomic unit.
///
/// The store applies the transition only when the order's current status
/// equals `expected`; otherwise it fails without writing anything. The
/// matching history record is appended in the same unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderTransition {
	/// Status the order must currently be in.
	pub expected: OrderStatus,
	/// Status to transition to.
	pub to: OrderStatus,
	/// Field updates applied alongside the status change.
	pub changes: OrderChanges,
	/// Identifier of the user who triggered the transition.
	pub actor: i64,
	/// Optional note recorded on the history row.
	pub note: Option<String>,
}
