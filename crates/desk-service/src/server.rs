//! HTTP server for the desk admin API.
//!
//! This module provides a minimal HTTP server exposing the core order
//! operations. Authentication, authorization and rate limiting belong to
//! the dispatch layer in front of this API; handlers trust the actor ids
//! carried in the requests.

use axum::{
	routing::{get, post},
	Router,
};
use desk_config::ApiConfig;
use desk_core::{DeskEngine, OrderFlowService};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::apis::{applications, orders};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Order state machine handling every request.
	pub orders: Arc<OrderFlowService>,
}

/// Starts the HTTP server for the admin API.
///
/// The server shuts down gracefully when the engine's shutdown token
/// fires.
pub async fn start_server(
	api_config: ApiConfig,
	desk: Arc<DeskEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let state = AppState {
		orders: Arc::clone(desk.orders()),
	};

	let app = Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/orders", post(orders::create_order).get(orders::list_orders))
				.route(
					"/orders/{id}",
					get(orders::get_order).delete(orders::delete_order),
				)
				.route("/orders/{id}/history", get(orders::get_history))
				.route("/orders/{id}/publish", post(orders::publish_order))
				.route("/orders/{id}/claim", post(orders::claim_order))
				.route("/orders/{id}/status", post(orders::update_status))
				.route(
					"/orders/{id}/applications",
					post(applications::apply).get(applications::list_applications),
				)
				.route(
					"/orders/{id}/applications/{app_id}/approve",
					post(applications::approve),
				)
				.route(
					"/applications/{app_id}/reject",
					post(applications::reject),
				),
		)
		.layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
		.with_state(state);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Desk admin API listening on {}", bind_address);

	let shutdown = desk.shutdown_token();
	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown.cancelled_owned())
		.await?;

	Ok(())
}
