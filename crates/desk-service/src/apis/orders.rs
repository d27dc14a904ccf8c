//! Order endpoints of the admin API.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use desk_types::{NewOrder, Order, OrderStatus, StatusRecord};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::apis::ApiError;
use crate::server::AppState;

/// Body of `POST /api/orders`.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
	pub title: String,
	pub content: String,
	pub amount: Option<Decimal>,
	pub image_ref: Option<String>,
	pub actor: i64,
	pub actor_name: Option<String>,
	pub contact_name: Option<String>,
	/// When `true`, the order starts as a draft and is not announced.
	#[serde(default)]
	pub draft: bool,
}

/// Body of `POST /api/orders/{id}/claim`.
#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
	pub actor: i64,
	pub actor_name: Option<String>,
}

/// Body of `POST /api/orders/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
	pub status: OrderStatus,
	pub actor: i64,
	pub note: Option<String>,
}

/// Body of `DELETE /api/orders/{id}`.
#[derive(Debug, Deserialize)]
pub struct DeleteOrderRequest {
	pub actor: i64,
}

/// Query of `GET /api/orders`.
#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
	pub actor: i64,
}

/// Handles POST /api/orders.
pub async fn create_order(
	State(state): State<AppState>,
	Json(request): Json<CreateOrderRequest>,
) -> Result<Json<Order>, ApiError> {
	let new = NewOrder {
		title: request.title,
		content: request.content,
		amount: request.amount,
		image_ref: request.image_ref,
		created_by: request.actor,
		created_by_name: request.actor_name,
		contact_name: request.contact_name,
	};
	let order = if request.draft {
		state.orders.create_draft(new).await?
	} else {
		state.orders.create_order(new).await?
	};
	Ok(Json(order))
}

/// Handles GET /api/orders?actor=.
pub async fn list_orders(
	State(state): State<AppState>,
	Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<Order>>, ApiError> {
	Ok(Json(state.orders.orders_for_actor(query.actor).await?))
}

/// Handles GET /api/orders/{id}.
pub async fn get_order(
	State(state): State<AppState>,
	Path(id): Path<u64>,
) -> Result<Json<Order>, ApiError> {
	Ok(Json(state.orders.get_order(id).await?))
}

/// Handles GET /api/orders/{id}/history.
pub async fn get_history(
	State(state): State<AppState>,
	Path(id): Path<u64>,
) -> Result<Json<Vec<StatusRecord>>, ApiError> {
	Ok(Json(state.orders.history(id).await?))
}

/// Handles POST /api/orders/{id}/publish.
pub async fn publish_order(
	State(state): State<AppState>,
	Path(id): Path<u64>,
) -> Result<Json<Order>, ApiError> {
	Ok(Json(state.orders.publish_draft(id).await?))
}

/// Handles POST /api/orders/{id}/claim.
pub async fn claim_order(
	State(state): State<AppState>,
	Path(id): Path<u64>,
	Json(request): Json<ClaimRequest>,
) -> Result<Json<Order>, ApiError> {
	let order = state
		.orders
		.claim_order(id, request.actor, request.actor_name)
		.await?;
	Ok(Json(order))
}

/// Handles POST /api/orders/{id}/status.
pub async fn update_status(
	State(state): State<AppState>,
	Path(id): Path<u64>,
	Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, ApiError> {
	let order = state
		.orders
		.update_status(id, request.status, request.actor, request.note)
		.await?;
	Ok(Json(order))
}

/// Handles DELETE /api/orders/{id}.
pub async fn delete_order(
	State(state): State<AppState>,
	Path(id): Path<u64>,
	Json(request): Json<DeleteOrderRequest>,
) -> Result<StatusCode, ApiError> {
	state.orders.delete_order(id, request.actor).await?;
	Ok(StatusCode::NO_CONTENT)
}
