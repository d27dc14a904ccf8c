//! Application endpoints of the admin API.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use desk_types::{Application, ApplicationStatus, Order};
use serde::Deserialize;

use crate::apis::ApiError;
use crate::server::AppState;

/// Body of `POST /api/orders/{id}/applications`.
#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
	pub applicant: i64,
	pub applicant_name: Option<String>,
}

/// Body of `POST /api/orders/{id}/applications/{app_id}/approve`.
#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
	pub approver: i64,
}

/// Body of `POST /api/applications/{app_id}/reject`.
#[derive(Debug, Deserialize)]
pub struct RejectRequest {
	pub reviewer: i64,
}

/// Query of `GET /api/orders/{id}/applications`.
#[derive(Debug, Deserialize)]
pub struct ListApplicationsQuery {
	pub status: Option<ApplicationStatus>,
}

/// Handles POST /api/orders/{id}/applications.
pub async fn apply(
	State(state): State<AppState>,
	Path(order_id): Path<u64>,
	Json(request): Json<ApplyRequest>,
) -> Result<Json<Application>, ApiError> {
	let application = state
		.orders
		.apply_for_order(order_id, request.applicant, request.applicant_name)
		.await?;
	Ok(Json(application))
}

/// Handles GET /api/orders/{id}/applications.
pub async fn list_applications(
	State(state): State<AppState>,
	Path(order_id): Path<u64>,
	Query(query): Query<ListApplicationsQuery>,
) -> Result<Json<Vec<Application>>, ApiError> {
	let applications = state
		.orders
		.applications_for_order(order_id, query.status)
		.await?;
	Ok(Json(applications))
}

/// Handles POST /api/orders/{id}/applications/{app_id}/approve.
pub async fn approve(
	State(state): State<AppState>,
	Path((order_id, app_id)): Path<(u64, u64)>,
	Json(request): Json<ApproveRequest>,
) -> Result<Json<Order>, ApiError> {
	let order = state
		.orders
		.approve_application(order_id, app_id, request.approver)
		.await?;
	Ok(Json(order))
}

/// Handles POST /api/applications/{app_id}/reject.
pub async fn reject(
	State(state): State<AppState>,
	Path(app_id): Path<u64>,
	Json(request): Json<RejectRequest>,
) -> Result<Json<Application>, ApiError> {
	let application = state
		.orders
		.reject_application(app_id, request.reviewer)
		.await?;
	Ok(Json(application))
}
