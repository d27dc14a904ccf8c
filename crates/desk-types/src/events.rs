//! Channel synchronization request types.
//!
//! Requests flow from the order state machine to the channel sync worker
//! over an in-process queue, so announcement delivery happens strictly
//! after the storage commit and never inside it.

use serde::{Deserialize, Serialize};

/// Queued channel synchronization work for a single order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncRequest {
	/// Publish the order's announcement and store the returned message id.
	Publish { order_id: u64 },
	/// Re-render the order and edit its existing announcement.
	Edit { order_id: u64 },
}

impl SyncRequest {
	/// The order this request refers to.
	pub fn order_id(&self) -> u64 {
		match self {
			SyncRequest::Publish { order_id } => *order_id,
			SyncRequest::Edit { order_id } => *order_id,
		}
	}
}
