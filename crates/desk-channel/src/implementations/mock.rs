//! Mock channel transport for tests and development.
//!
//! Records every post and edit and can be scripted to fail a number of
//! leading attempts (transiently) or to fail permanently, which is how
//! the retry policy and best-effort semantics are exercised across the
//! workspace's tests.

use crate::{ChannelError, ChannelInterface};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct MockState {
	next_message_id: AtomicI64,
	remaining_post_failures: AtomicU32,
	remaining_edit_failures: AtomicU32,
	permanent_failure: AtomicBool,
	post_attempts: AtomicU32,
	edit_attempts: AtomicU32,
	posts: Mutex<Vec<String>>,
	edits: Mutex<Vec<(i64, String)>>,
}

/// Scriptable in-memory channel transport.
pub struct MockChannel {
	state: Arc<MockState>,
}

/// Inspection handle that stays usable after the mock has been boxed
/// into a [`ChannelService`](crate::ChannelService).
#[derive(Clone)]
pub struct MockHandle {
	state: Arc<MockState>,
}

impl MockChannel {
	/// A mock that succeeds on every call.
	pub fn new() -> Self {
		Self {
			state: Arc::new(MockState::default()),
		}
	}

	/// A mock whose first `n` posts fail transiently.
	pub fn failing_posts(n: u32) -> Self {
		let mock = Self::new();
		mock.state.remaining_post_failures.store(n, Ordering::SeqCst);
		mock
	}

	/// A mock whose first `n` edits fail transiently.
	pub fn failing_edits(n: u32) -> Self {
		let mock = Self::new();
		mock.state.remaining_edit_failures.store(n, Ordering::SeqCst);
		mock
	}

	/// A mock that fails every call with a permanent error.
	pub fn permanent_failure() -> Self {
		let mock = Self::new();
		mock.state.permanent_failure.store(true, Ordering::SeqCst);
		mock
	}

	/// Returns an inspection handle sharing this mock's state.
	pub fn handle(&self) -> MockHandle {
		MockHandle {
			state: self.state.clone(),
		}
	}
}

impl Default for MockChannel {
	fn default() -> Self {
		Self::new()
	}
}

impl MockHandle {
	/// Number of post calls made so far, including failed ones.
	pub fn post_attempts(&self) -> u32 {
		self.state.post_attempts.load(Ordering::SeqCst)
	}

	/// Number of edit calls made so far, including failed ones.
	pub fn edit_attempts(&self) -> u32 {
		self.state.edit_attempts.load(Ordering::SeqCst)
	}

	/// Texts of successfully posted messages, in order.
	pub fn posts(&self) -> Vec<String> {
		self.state.posts.lock().unwrap().clone()
	}

	/// (message id, text) pairs of successful edits, in order.
	pub fn edits(&self) -> Vec<(i64, String)> {
		self.state.edits.lock().unwrap().clone()
	}
}

#[async_trait]
impl ChannelInterface for MockChannel {
	async fn post(&self, text: &str) -> Result<i64, ChannelError> {
		self.state.post_attempts.fetch_add(1, Ordering::SeqCst);
		if self.state.permanent_failure.load(Ordering::SeqCst) {
			return Err(ChannelError::Api("scripted permanent failure".into()));
		}
		if self.state.remaining_post_failures.load(Ordering::SeqCst) > 0 {
			self.state.remaining_post_failures.fetch_sub(1, Ordering::SeqCst);
			return Err(ChannelError::Network("scripted transient failure".into()));
		}
		let message_id = self.state.next_message_id.fetch_add(1, Ordering::SeqCst) + 1;
		self.state.posts.lock().unwrap().push(text.to_string());
		Ok(message_id)
	}

	async fn edit(&self, message_id: i64, text: &str) -> Result<(), ChannelError> {
		self.state.edit_attempts.fetch_add(1, Ordering::SeqCst);
		if self.state.permanent_failure.load(Ordering::SeqCst) {
			return Err(ChannelError::Api("scripted permanent failure".into()));
		}
		if self.state.remaining_edit_failures.load(Ordering::SeqCst) > 0 {
			self.state.remaining_edit_failures.fetch_sub(1, Ordering::SeqCst);
			return Err(ChannelError::Network("scripted transient failure".into()));
		}
		self.state
			.edits
			.lock()
			.unwrap()
			.push((message_id, text.to_string()));
		Ok(())
	}
}
