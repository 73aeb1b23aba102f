//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements a REST API using Axum for the matching engine.
// It translates HTTP requests into commands for the order book worker and nothing more.
//
// | Component      | Description                                                |
// |----------------|------------------------------------------------------------|
// | Api            | Main API structure coordinating routes and services        |
// | Routes         | Handler functions for API endpoints                        |
// | WebSocket      | Live trade stream                                          |
// | DTOs           | Data transfer objects for API requests/responses           |
//
//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name           | Description                                       | Key Methods       |
// |----------------|---------------------------------------------------|-------------------|
// | AppState       | Shared application state                          | new               |
// | Api            | Main API structure                                | routes, serve     |
//--------------------------------------------------------------------------------------------------

mod dto;
mod error;
mod routes;
mod ws;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    http::{header, Method},
    routing::get,
    Extension, Router,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::domain::services::events::EventBus;
use crate::domain::services::orderbook::orderbook_worker::OrderBookClient;
use crate::domain::services::persistence::OrderRepository;

pub use dto::*;
pub use error::{ApiError, ApiResult};

/// Shared application state accessible by all handlers
pub struct AppState {
    /// Handle to the worker that owns the book
    pub client: OrderBookClient,
    /// Storage, consulted for orders that are no longer resting
    pub repository: Arc<dyn OrderRepository>,
    /// Source of the live trade stream
    pub event_bus: EventBus,
    /// Levels per side returned when the request does not say
    pub depth_limit: usize,
}

impl AppState {
    pub fn new(
        client: OrderBookClient,
        repository: Arc<dyn OrderRepository>,
        event_bus: EventBus,
        depth_limit: usize,
    ) -> Self {
        Self {
            client,
            repository,
            event_bus,
            depth_limit,
        }
    }
}

/// Main API structure
pub struct Api {
    /// API address
    addr: SocketAddr,
    /// Shared application state
    state: Arc<AppState>,
}

impl Api {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        Self {
            addr,
            state: Arc::new(state),
        }
    }

    /// Creates all routes for the API
    pub fn routes(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

        Router::new()
            .route("/health", get(routes::health))
            // Order management
            .route("/orders", axum::routing::post(routes::create_order))
            .route(
                "/orders/:id",
                get(routes::get_order).delete(routes::cancel_order),
            )
            // Market data
            .route("/orderbook", get(routes::get_orderbook))
            .route("/ws", get(ws::trades_ws))
            .layer(Extension(self.state.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }

    /// Starts the API server and runs until `shutdown` resolves
    pub async fn serve<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.routes();

        let listener = TcpListener::bind(self.addr).await?;
        info!("API listening on {}", listener.local_addr()?);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
    }
}
