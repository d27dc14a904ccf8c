//! Shared table state for storage backends.
//!
//! Holds the three collections (orders, history, applications) plus the
//! id counters, and implements every domain mutation once so backends
//! only differ in locking and persistence. Mutating methods validate
//! everything before the first write, so a method that returns an error
//! has not touched the state.

use desk_types::{
	current_timestamp, Application, ApplicationStatus, NewOrder, Order, OrderStatus,
	OrderTransition, StatusRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::StoreError;

/// The complete persisted state of a desk store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Tables {
	orders: BTreeMap<u64, Order>,
	/// History records per order id, append-only, chronological.
	history: BTreeMap<u64, Vec<StatusRecord>>,
	applications: BTreeMap<u64, Application>,
	next_order_id: u64,
	next_record_id: u64,
	next_application_id: u64,
}

impl Tables {
	pub fn insert_order(&mut self, new: NewOrder, status: OrderStatus) -> Result<Order, StoreError> {
		let now = current_timestamp();
		self.next_order_id += 1;
		let order = Order {
			id: self.next_order_id,
			title: new.title,
			content: new.content,
			amount: new.amount,
			image_ref: new.image_ref,
			status,
			created_by: new.created_by,
			created_by_name: new.created_by_name,
			contact_name: new.contact_name,
			claimed_by: None,
			claimed_by_name: None,
			channel_message_id: None,
			created_at: now,
			updated_at: now,
		};
		self.append_record(order.id, None, status, new.created_by, None, now);
		self.orders.insert(order.id, order.clone());
		Ok(order)
	}

	pub fn get_order(&self, order_id: u64) -> Result<Order, StoreError> {
		self.orders.get(&order_id).cloned().ok_or(StoreError::NotFound)
	}

	pub fn list_orders_for_actor(&self, actor: i64, limit: usize) -> Vec<Order> {
		let mut related: Vec<Order> = self
			.orders
			.values()
			.filter(|o| o.created_by == actor || o.claimed_by == Some(actor))
			.cloned()
			.collect();
		related.sort_by(|a, b| {
			b.updated_at
				.cmp(&a.updated_at)
				.then_with(|| b.id.cmp(&a.id))
		});
		related.truncate(limit);
		related
	}

	pub fn set_channel_message(
		&mut self,
		order_id: u64,
		message_id: i64,
	) -> Result<Order, StoreError> {
		let order = self.orders.get_mut(&order_id).ok_or(StoreError::NotFound)?;
		order.channel_message_id = Some(message_id);
		order.updated_at = current_timestamp();
		Ok(order.clone())
	}

	pub fn transition_order(
		&mut self,
		order_id: u64,
		transition: OrderTransition,
	) -> Result<Order, StoreError> {
		let current = self.orders.get(&order_id).ok_or(StoreError::NotFound)?.status;
		if current != transition.expected {
			return Err(StoreError::Conflict(format!(
				"order {} is {}, expected {}",
				order_id, current, transition.expected
			)));
		}

		let now = current_timestamp();
		let order = self.orders.get_mut(&order_id).ok_or(StoreError::NotFound)?;
		order.status = transition.to;
		if let Some(claimed_by) = transition.changes.claimed_by {
			order.claimed_by = claimed_by;
		}
		if let Some(claimed_by_name) = transition.changes.claimed_by_name {
			order.claimed_by_name = claimed_by_name;
		}
		order.updated_at = now;
		debug_assert_eq!(
			order.status.requires_claimant(),
			order.claimed_by.is_some(),
			"claimant must be set exactly for claimant-bearing statuses"
		);
		let order = order.clone();

		self.append_record(
			order_id,
			Some(transition.expected),
			transition.to,
			transition.actor,
			transition.note,
			now,
		);
		Ok(order)
	}

	pub fn list_history(&self, order_id: u64) -> Result<Vec<StatusRecord>, StoreError> {
		if !self.orders.contains_key(&order_id) {
			return Err(StoreError::NotFound);
		}
		Ok(self.history.get(&order_id).cloned().unwrap_or_default())
	}

	pub fn create_or_get_application(
		&mut self,
		order_id: u64,
		applicant: i64,
		applicant_name: Option<String>,
	) -> Result<(Application, bool), StoreError> {
		if !self.orders.contains_key(&order_id) {
			return Err(StoreError::NotFound);
		}
		if let Some(existing) = self
			.applications
			.values()
			.find(|a| a.order_id == order_id && a.applicant == applicant)
		{
			return Ok((existing.clone(), false));
		}

		let now = current_timestamp();
		self.next_application_id += 1;
		let application = Application {
			id: self.next_application_id,
			order_id,
			applicant,
			applicant_name,
			status: ApplicationStatus::Pending,
			created_at: now,
			updated_at: now,
		};
		self.applications.insert(application.id, application.clone());
		Ok((application, true))
	}

	pub fn get_application(&self, app_id: u64) -> Result<Application, StoreError> {
		self.applications
			.get(&app_id)
			.cloned()
			.ok_or(StoreError::NotFound)
	}

	pub fn list_applications(
		&self,
		order_id: u64,
		status: Option<ApplicationStatus>,
	) -> Vec<Application> {
		let mut apps: Vec<Application> = self
			.applications
			.values()
			.filter(|a| a.order_id == order_id && status.is_none_or(|s| a.status == s))
			.cloned()
			.collect();
		apps.sort_by(|a, b| {
			a.created_at
				.cmp(&b.created_at)
				.then_with(|| a.id.cmp(&b.id))
		});
		apps
	}

	pub fn update_application(
		&mut self,
		app_id: u64,
		status: ApplicationStatus,
	) -> Result<Application, StoreError> {
		let application = self
			.applications
			.get_mut(&app_id)
			.ok_or(StoreError::NotFound)?;
		application.status = status;
		application.updated_at = current_timestamp();
		Ok(application.clone())
	}

	pub fn approve_application(
		&mut self,
		order_id: u64,
		app_id: u64,
		approver: i64,
		note: Option<String>,
	) -> Result<(Order, Application), StoreError> {
		// Validate the whole unit before writing anything.
		let current = self.orders.get(&order_id).ok_or(StoreError::NotFound)?.status;
		if current != OrderStatus::New {
			return Err(StoreError::Conflict(format!(
				"order {} is {}, expected {}",
				order_id,
				current,
				OrderStatus::New
			)));
		}
		let candidate = self.applications.get(&app_id).ok_or(StoreError::NotFound)?;
		if candidate.order_id != order_id {
			return Err(StoreError::NotFound);
		}
		if candidate.status != ApplicationStatus::Pending {
			return Err(StoreError::Conflict(format!(
				"application {} is {}, expected {}",
				app_id,
				candidate.status,
				ApplicationStatus::Pending
			)));
		}
		let applicant = candidate.applicant;
		let applicant_name = candidate.applicant_name.clone();

		let now = current_timestamp();
		for sibling in self
			.applications
			.values_mut()
			.filter(|a| a.order_id == order_id && a.status == ApplicationStatus::Pending)
		{
			sibling.status = if sibling.id == app_id {
				ApplicationStatus::Approved
			} else {
				ApplicationStatus::Rejected
			};
			sibling.updated_at = now;
		}

		let order = self.orders.get_mut(&order_id).ok_or(StoreError::NotFound)?;
		order.status = OrderStatus::Claimed;
		order.claimed_by = Some(applicant);
		order.claimed_by_name = applicant_name;
		order.updated_at = now;
		let order = order.clone();

		self.append_record(
			order_id,
			Some(OrderStatus::New),
			OrderStatus::Claimed,
			approver,
			note,
			now,
		);

		let application = self.get_application(app_id)?;
		Ok((order, application))
	}

	pub fn delete_order(&mut self, order_id: u64) -> Result<(), StoreError> {
		if self.orders.remove(&order_id).is_none() {
			return Err(StoreError::NotFound);
		}
		self.history.remove(&order_id);
		let now = current_timestamp();
		for application in self
			.applications
			.values_mut()
			.filter(|a| a.order_id == order_id && a.status != ApplicationStatus::Rejected)
		{
			application.status = ApplicationStatus::Rejected;
			application.updated_at = now;
		}
		Ok(())
	}

	fn append_record(
		&mut self,
		order_id: u64,
		from_status: Option<OrderStatus>,
		to_status: OrderStatus,
		actor: i64,
		note: Option<String>,
		now: u64,
	) {
		self.next_record_id += 1;
		self.history.entry(order_id).or_default().push(StatusRecord {
			id: self.next_record_id,
			order_id,
			from_status,
			to_status,
			actor,
			note,
			created_at: now,
		});
	}
}
