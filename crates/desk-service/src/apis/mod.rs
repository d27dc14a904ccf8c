//! Admin API handlers.

pub mod applications;
pub mod orders;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use desk_core::OrderFlowError;
use serde::Serialize;

/// Error payload returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

/// Wraps [`OrderFlowError`] for rendering as an HTTP response.
///
/// Business rejections map to 4xx codes with their error kind verbatim;
/// storage faults are logged and map to an opaque 500 so callers can
/// distinguish invalid requests from system trouble.
pub struct ApiError(pub OrderFlowError);

impl From<OrderFlowError> for ApiError {
	fn from(err: OrderFlowError) -> Self {
		ApiError(err)
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let (status, code) = match &self.0 {
			OrderFlowError::OrderNotFound => (StatusCode::NOT_FOUND, "ORDER_NOT_FOUND"),
			OrderFlowError::ApplicationNotFound => {
				(StatusCode::NOT_FOUND, "APPLICATION_NOT_FOUND")
			}
			OrderFlowError::InvalidTransition { .. } => {
				(StatusCode::CONFLICT, "INVALID_TRANSITION")
			}
			OrderFlowError::OnlyNewCanBeClaimed => {
				(StatusCode::CONFLICT, "ONLY_NEW_CAN_BE_CLAIMED")
			}
			OrderFlowError::UpdateFailed => (StatusCode::CONFLICT, "UPDATE_FAILED"),
			OrderFlowError::Storage(_) => {
				(StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
			}
		};

		if self.0.is_business() {
			tracing::debug!(error = %self.0, "Request rejected");
		} else {
			tracing::error!(error = %self.0, "Request failed");
		}

		(
			status,
			Json(ErrorResponse {
				error: code.to_string(),
				message: self.0.to_string(),
			}),
		)
			.into_response()
	}
}
