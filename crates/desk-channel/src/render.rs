//! Order announcement rendering.
//!
//! Turns an order into the plain-text summary shown in the broadcast
//! channel. The same rendering is used for the initial post and for
//! every subsequent edit, so the announcement always reflects the
//! order's current status.

use desk_types::Order;

/// Renders the announcement text for an order.
pub fn render_order(order: &Order, contact_url: Option<&str>) -> String {
	let mut lines = vec![format!("Order #{}: {}", order.id, order.title)];
	lines.push(String::new());
	lines.push(order.content.clone());
	if let Some(amount) = order.amount {
		lines.push(format!("Amount: {}", amount));
	}
	lines.push(format!("Status: {}", order.status));
	if let Some(url) = contact_url {
		lines.push(format!("Contact: {}", url));
	}
	lines.join("\n")
}

#[cfg(test)]
mod tests {
	use super::*;
	use desk_types::OrderStatus;
	use rust_decimal::Decimal;

	fn order() -> Order {
		Order {
			id: 42,
			title: "Move the piano".into(),
			content: "Third floor, no elevator".into(),
			amount: None,
			image_ref: None,
			status: OrderStatus::New,
			created_by: 1,
			created_by_name: None,
			contact_name: None,
			claimed_by: None,
			claimed_by_name: None,
			channel_message_id: None,
			created_at: 0,
			updated_at: 0,
		}
	}

	#[test]
	fn renders_basic_fields() {
		let text = render_order(&order(), None);
		assert!(text.starts_with("Order #42: Move the piano"));
		assert!(text.contains("Third floor, no elevator"));
		assert!(text.contains("Status: NEW"));
		assert!(!text.contains("Amount:"));
		assert!(!text.contains("Contact:"));
	}

	#[test]
	fn renders_amount_and_contact_when_present() {
		let mut order = order();
		order.amount = Some(Decimal::new(12550, 2));
		let text = render_order(&order, Some("https://t.me/desk_operator"));
		assert!(text.contains("Amount: 125.50"));
		assert!(text.contains("Contact: https://t.me/desk_operator"));
	}

	#[test]
	fn status_changes_show_up_in_rerenders() {
		let mut order = order();
		let before = render_order(&order, None);
		order.status = OrderStatus::Claimed;
		let after = render_order(&order, None);
		assert_ne!(before, after);
		assert!(after.contains("Status: CLAIMED"));
	}
}
