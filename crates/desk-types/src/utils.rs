//! Utility functions shared across desk crates.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as unix seconds.
pub fn current_timestamp() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs()
}
