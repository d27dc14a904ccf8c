//! Order status transition table.
//!
//! The single source of truth for which status changes are legal. Every
//! mutation path (direct status updates, claiming, application approval)
//! consults this table instead of carrying its own checks, so the
//! business rules cannot diverge.

use desk_types::OrderStatus;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// Static transition table - each status maps to its allowed successors.
static TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<OrderStatus>>> = Lazy::new(|| {
	let mut m = HashMap::new();
	m.insert(
		OrderStatus::Draft,
		HashSet::from([OrderStatus::New, OrderStatus::Canceled]),
	);
	m.insert(
		OrderStatus::New,
		HashSet::from([OrderStatus::Claimed, OrderStatus::Canceled]),
	);
	m.insert(
		OrderStatus::Claimed,
		HashSet::from([OrderStatus::InProgress, OrderStatus::Canceled]),
	);
	m.insert(
		OrderStatus::InProgress,
		HashSet::from([OrderStatus::Done, OrderStatus::Canceled]),
	);
	m.insert(OrderStatus::Done, HashSet::new()); // terminal
	m.insert(OrderStatus::Canceled, HashSet::new()); // terminal
	m
});

/// Checks if a status transition is valid.
pub fn is_valid_transition(from: &OrderStatus, to: &OrderStatus) -> bool {
	TRANSITIONS.get(from).is_some_and(|set| set.contains(to))
}

#[cfg(test)]
mod tests {
	use super::*;
	use desk_types::OrderStatus::*;

	#[test]
	fn allowed_transitions() {
		assert!(is_valid_transition(&Draft, &New));
		assert!(is_valid_transition(&Draft, &Canceled));
		assert!(is_valid_transition(&New, &Claimed));
		assert!(is_valid_transition(&New, &Canceled));
		assert!(is_valid_transition(&Claimed, &InProgress));
		assert!(is_valid_transition(&Claimed, &Canceled));
		assert!(is_valid_transition(&InProgress, &Done));
		assert!(is_valid_transition(&InProgress, &Canceled));
	}

	#[test]
	fn terminal_statuses_have_no_successors() {
		for to in [Draft, New, Claimed, InProgress, Done, Canceled] {
			assert!(!is_valid_transition(&Done, &to));
			assert!(!is_valid_transition(&Canceled, &to));
		}
	}

	#[test]
	fn skipping_stages_is_rejected() {
		assert!(!is_valid_transition(&New, &Done));
		assert!(!is_valid_transition(&New, &InProgress));
		assert!(!is_valid_transition(&Draft, &Claimed));
		assert!(!is_valid_transition(&Claimed, &Done));
	}

	#[test]
	fn backwards_transitions_are_rejected() {
		assert!(!is_valid_transition(&Claimed, &New));
		assert!(!is_valid_transition(&InProgress, &Claimed));
		assert!(!is_valid_transition(&New, &Draft));
	}
}
