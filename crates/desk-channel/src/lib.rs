//! Channel sink adapter for the order desk system.
//!
//! This module handles publishing and editing order announcements on an
//! external broadcast channel. It provides an abstraction over concrete
//! channel transports, manages retries with capped exponential backoff,
//! and guarantees that announcement delivery is best-effort: order state
//! is the source of truth and a failing sink never surfaces as an error
//! to the caller.

use async_trait::async_trait;
use desk_types::Order;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub mod render;

/// Re-export implementations
pub mod implementations {
	pub mod mock;
	pub mod telegram;
}

/// Errors that can occur during channel operations.
#[derive(Debug, Error)]
pub enum ChannelError {
	/// Transient transport failure (timeouts, connection loss, throttling).
	#[error("Network error: {0}")]
	Network(String),
	/// Permanent failure reported by the channel API.
	#[error("API error: {0}")]
	Api(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl ChannelError {
	/// Returns `true` when retrying the operation may succeed.
	pub fn is_transient(&self) -> bool {
		matches!(self, ChannelError::Network(_))
	}
}

/// Trait defining the interface for channel transports.
///
/// This trait must be implemented by any broadcast surface that wants to
/// integrate with the desk system. Implementations submit rendered text
/// and report the channel's message identifiers.
#[async_trait]
pub trait ChannelInterface: Send + Sync {
	/// Posts a new message and returns its channel message id.
	async fn post(&self, text: &str) -> Result<i64, ChannelError>;

	/// Replaces the text of an existing message.
	async fn edit(&self, message_id: i64, text: &str) -> Result<(), ChannelError>;
}

/// Type alias for channel factory functions.
pub type ChannelFactory = fn(&toml::Value) -> Result<Box<dyn ChannelInterface>, ChannelError>;

/// Retry policy for channel calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
	/// Total number of attempts, including the first.
	pub max_attempts: u32,
	/// Delay before the second attempt; doubles for each further attempt.
	pub base_delay: Duration,
	/// Upper bound for any single backoff delay.
	pub max_delay: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_millis(500),
			max_delay: Duration::from_secs(8),
		}
	}
}

impl RetryPolicy {
	/// Backoff delay after the given 1-based attempt.
	fn delay_after(&self, attempt: u32) -> Duration {
		let factor = 1u32 << (attempt.saturating_sub(1)).min(16);
		self.base_delay.saturating_mul(factor).min(self.max_delay)
	}
}

/// Service that keeps channel announcements in sync with order state.
///
/// The ChannelService wraps an optional transport backend and applies the
/// delivery policy: idempotent publishing keyed on the stored message id,
/// bounded retries with exponential backoff for transient failures, and
/// swallow-and-log semantics on exhaustion. A missing backend means
/// announcing is disabled, which is not an error.
pub struct ChannelService {
	backend: Option<Box<dyn ChannelInterface>>,
	retry: RetryPolicy,
	contact_url: Option<String>,
	shutdown: CancellationToken,
}

impl ChannelService {
	/// Creates a new ChannelService.
	///
	/// `backend = None` disables announcing entirely; `shutdown` aborts
	/// in-flight backoff sleeps when the service shuts down.
	pub fn new(
		backend: Option<Box<dyn ChannelInterface>>,
		retry: RetryPolicy,
		contact_url: Option<String>,
		shutdown: CancellationToken,
	) -> Self {
		Self {
			backend,
			retry,
			contact_url,
			shutdown,
		}
	}

	/// Returns `true` when a transport backend is configured.
	pub fn is_configured(&self) -> bool {
		self.backend.is_some()
	}

	/// Publishes the order's announcement.
	///
	/// Returns the channel message id on success. If the order already
	/// carries a message id, that id is returned without posting again.
	/// Returns `None` when no backend is configured or every attempt
	/// failed; failures are logged, never raised.
	pub async fn publish(&self, order: &Order) -> Option<i64> {
		if let Some(existing) = order.channel_message_id {
			return Some(existing);
		}
		let backend = match &self.backend {
			Some(backend) => backend,
			None => {
				tracing::debug!(order_id = order.id, "No channel configured, skipping publish");
				return None;
			}
		};

		let text = render::render_order(order, self.contact_url.as_deref());
		for attempt in 1..=self.retry.max_attempts {
			match backend.post(&text).await {
				Ok(message_id) => {
					tracing::info!(order_id = order.id, message_id, "Announcement published");
					return Some(message_id);
				}
				Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
					tracing::warn!(
						order_id = order.id,
						attempt,
						error = %e,
						"Publish attempt failed, backing off"
					);
					if !self.backoff(attempt).await {
						return None;
					}
				}
				Err(e) => {
					tracing::warn!(
						order_id = order.id,
						attempt,
						error = %e,
						"Publish failed, giving up"
					);
					return None;
				}
			}
		}
		None
	}

	/// Edits the order's existing announcement to match its current state.
	///
	/// A missing message id makes this a successful no-op. Returns `false`
	/// when no backend is configured or every attempt failed; failures are
	/// logged, never raised.
	pub async fn edit(&self, order: &Order) -> bool {
		let message_id = match order.channel_message_id {
			Some(message_id) => message_id,
			None => return true,
		};
		let backend = match &self.backend {
			Some(backend) => backend,
			None => {
				tracing::debug!(order_id = order.id, "No channel configured, skipping edit");
				return false;
			}
		};

		let text = render::render_order(order, self.contact_url.as_deref());
		for attempt in 1..=self.retry.max_attempts {
			match backend.edit(message_id, &text).await {
				Ok(()) => {
					tracing::info!(order_id = order.id, message_id, "Announcement updated");
					return true;
				}
				Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
					tracing::warn!(
						order_id = order.id,
						attempt,
						error = %e,
						"Edit attempt failed, backing off"
					);
					if !self.backoff(attempt).await {
						return false;
					}
				}
				Err(e) => {
					tracing::warn!(
						order_id = order.id,
						attempt,
						error = %e,
						"Edit failed, giving up"
					);
					return false;
				}
			}
		}
		false
	}

	/// Sleeps the backoff delay for the given attempt.
	///
	/// Returns `false` when the sleep was interrupted by shutdown; the
	/// caller abandons the remaining attempts.
	async fn backoff(&self, attempt: u32) -> bool {
		let delay = self.retry.delay_after(attempt);
		tokio::select! {
			_ = self.shutdown.cancelled() => {
				tracing::debug!("Shutdown requested, abandoning channel retries");
				false
			}
			_ = tokio::time::sleep(delay) => true,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::implementations::mock::MockChannel;
	use super::*;
	use desk_types::OrderStatus;

	fn service(backend: MockChannel) -> (ChannelService, CancellationToken) {
		let token = CancellationToken::new();
		let retry = RetryPolicy {
			max_attempts: 3,
			base_delay: Duration::ZERO,
			max_delay: Duration::ZERO,
		};
		(
			ChannelService::new(Some(Box::new(backend)), retry, None, token.clone()),
			token,
		)
	}

	fn sample_order(message_id: Option<i64>) -> Order {
		Order {
			id: 1,
			title: "Assemble the desk".into(),
			content: "Flat pack, all parts present".into(),
			amount: None,
			image_ref: None,
			status: OrderStatus::New,
			created_by: 10,
			created_by_name: None,
			contact_name: None,
			claimed_by: None,
			claimed_by_name: None,
			channel_message_id: message_id,
			created_at: 0,
			updated_at: 0,
		}
	}

	#[tokio::test]
	async fn test_publish_is_idempotent_on_stored_id() {
		let mock = MockChannel::new();
		let handle = mock.handle();
		let (service, _) = service(mock);

		let result = service.publish(&sample_order(Some(777))).await;
		assert_eq!(result, Some(777));
		assert_eq!(handle.post_attempts(), 0, "must not post a second announcement");
	}

	#[tokio::test]
	async fn test_publish_without_backend_is_quiet() {
		let service = ChannelService::new(
			None,
			RetryPolicy::default(),
			None,
			CancellationToken::new(),
		);
		assert_eq!(service.publish(&sample_order(None)).await, None);
		assert!(!service.edit(&sample_order(Some(5))).await);
	}

	#[tokio::test]
	async fn test_publish_retries_transient_failures() {
		let mock = MockChannel::failing_posts(2);
		let handle = mock.handle();
		let (service, _) = service(mock);

		let result = service.publish(&sample_order(None)).await;
		assert_eq!(result, Some(1));
		assert_eq!(handle.post_attempts(), 3);
		assert_eq!(handle.posts().len(), 1);
	}

	#[tokio::test]
	async fn test_publish_gives_up_after_exhausting_retries() {
		let mock = MockChannel::failing_posts(5);
		let handle = mock.handle();
		let (service, _) = service(mock);

		let result = service.publish(&sample_order(None)).await;
		assert_eq!(result, None);
		assert_eq!(handle.post_attempts(), 3);
		assert!(handle.posts().is_empty());
	}

	#[tokio::test]
	async fn test_permanent_error_stops_retrying() {
		let mock = MockChannel::permanent_failure();
		let handle = mock.handle();
		let (service, _) = service(mock);

		let result = service.publish(&sample_order(None)).await;
		assert_eq!(result, None);
		assert_eq!(handle.post_attempts(), 1);
	}

	#[tokio::test]
	async fn test_edit_without_message_id_is_noop() {
		let mock = MockChannel::new();
		let handle = mock.handle();
		let (service, _) = service(mock);

		assert!(service.edit(&sample_order(None)).await);
		assert_eq!(handle.edit_attempts(), 0);
	}

	#[tokio::test]
	async fn test_edit_retries_then_succeeds() {
		let mock = MockChannel::failing_edits(1);
		let handle = mock.handle();
		let (service, _) = service(mock);

		assert!(service.edit(&sample_order(Some(9))).await);
		assert_eq!(handle.edit_attempts(), 2);
		let edits = handle.edits();
		assert_eq!(edits.len(), 1);
		assert_eq!(edits[0].0, 9);
	}

	#[tokio::test]
	async fn test_shutdown_abandons_backoff() {
		let mock = MockChannel::failing_posts(5);
		let handle = mock.handle();
		let token = CancellationToken::new();
		let retry = RetryPolicy {
			max_attempts: 3,
			base_delay: Duration::from_secs(60),
			max_delay: Duration::from_secs(60),
		};
		let service = ChannelService::new(Some(Box::new(mock)), retry, None, token.clone());

		token.cancel();
		let result = service.publish(&sample_order(None)).await;
		assert_eq!(result, None);
		assert_eq!(handle.post_attempts(), 1, "backoff must not run after shutdown");
	}
}
