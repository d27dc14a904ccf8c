//! Channel synchronization worker.
//!
//! Consumes sync requests queued by the order flow service after each
//! storage commit and drives the channel sink: publishing announcements
//! for new orders and editing existing ones after status changes. The
//! worker re-reads the order for every request so the announcement always
//! renders the committed state, and records the channel message id after
//! the first successful publish.

use desk_channel::ChannelService;
use desk_storage::{StorageService, StoreError};
use desk_types::SyncRequest;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Worker task that keeps the broadcast channel in sync with order state.
pub struct ChannelSyncWorker {
	storage: Arc<StorageService>,
	channel: Arc<ChannelService>,
}

impl ChannelSyncWorker {
	/// Creates a new ChannelSyncWorker.
	pub fn new(storage: Arc<StorageService>, channel: Arc<ChannelService>) -> Self {
		Self { storage, channel }
	}

	/// Runs the worker until the queue closes or shutdown is requested.
	pub async fn run(
		self,
		mut requests: mpsc::UnboundedReceiver<SyncRequest>,
		shutdown: CancellationToken,
	) {
		loop {
			tokio::select! {
				_ = shutdown.cancelled() => break,
				request = requests.recv() => match request {
					Some(request) => self.handle(request).await,
					None => break,
				},
			}
		}
		tracing::debug!("Channel sync worker stopped");
	}

	/// Processes one sync request.
	///
	/// Failures are logged and swallowed: order state is the source of
	/// truth and announcement delivery stays best-effort.
	#[instrument(skip(self), fields(order_id = request.order_id()))]
	pub async fn handle(&self, request: SyncRequest) {
		let order_id = request.order_id();
		let order = match self.storage.get_order(order_id).await {
			Ok(order) => order,
			Err(StoreError::NotFound) => {
				tracing::debug!(order_id, "Order gone before sync, skipping");
				return;
			}
			Err(e) => {
				tracing::error!(order_id, error = %e, "Failed to load order for sync");
				return;
			}
		};

		match request {
			SyncRequest::Publish { .. } => {
				if let Some(message_id) = self.channel.publish(&order).await {
					if order.channel_message_id.is_none() {
						if let Err(e) = self
							.storage
							.set_channel_message(order_id, message_id)
							.await
						{
							tracing::error!(
								order_id,
								message_id,
								error = %e,
								"Failed to record channel message id"
							);
						}
					}
				}
			}
			SyncRequest::Edit { .. } => {
				if !self.channel.edit(&order).await {
					tracing::debug!(order_id, "Announcement edit was not delivered");
				}
			}
		}
	}
}
