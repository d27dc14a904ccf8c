//! Application types for the claim review workflow.
//!
//! An application is a request by a user to claim a specific order. It is
//! reviewed by an approver, whose decision is recorded as a one-way status
//! change; applications are never physically deleted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A request to claim an order, subject to review.
///
/// At most one application exists per (order, applicant) pair;
/// re-applying returns the existing row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
	/// Store-assigned identifier.
	pub id: u64,
	/// Order this application targets.
	pub order_id: u64,
	/// Identifier of the applying user.
	pub applicant: i64,
	/// Display name of the applying user, when known.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub applicant_name: Option<String>,
	/// Review outcome.
	pub status: ApplicationStatus,
	/// Timestamp when the application was created (unix seconds).
	pub created_at: u64,
	/// Timestamp when the application was last updated (unix seconds).
	pub updated_at: u64,
}

/// Review status of an application.
///
/// Pending applications move to Approved or Rejected exactly once;
/// both outcomes are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
	Pending,
	Approved,
	Rejected,
}

impl fmt::Display for ApplicationStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ApplicationStatus::Pending => write!(f, "PENDING"),
			ApplicationStatus::Approved => write!(f, "APPROVED"),
			ApplicationStatus::Rejected => write!(f, "REJECTED"),
		}
	}
}
