//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name                  | Description                            | Return Type         |
// |-----------------------|----------------------------------------|---------------------|
// | health                | Health check endpoint                  | impl IntoResponse   |
// | create_order          | Submit a new limit order               | ApiResult<Response> |
// | cancel_order          | Cancel a resting order                 | ApiResult<Response> |
// | get_order             | Get details of an order                | ApiResult<Response> |
// | get_orderbook         | Top of book and aggregated depth       | ApiResult<Response> |
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;

use super::{
    ApiResult, AppState, CancelOrderResponse, CreateOrderRequest, CreateOrderResponse,
    OrderBookQuery, OrderBookResponse, OrderResponse,
};
use crate::domain::models::types::{OrderId, OrderStatus};
use crate::domain::services::matching_engine::MatchingError;

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok"
    }))
}

/// Submit a new limit order
pub async fn create_order(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(req) = payload?;
    let order = req.into_order()?;

    let result = state.client.submit_order(order).await?;
    info!(
        order_id = %result.order.id,
        status = %result.order.status,
        trades = result.trades.len(),
        "order submitted"
    );

    let response = CreateOrderResponse::from(result);
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// Cancel a resting order
pub async fn cancel_order(
    Extension(state): Extension<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> ApiResult<Response> {
    let order_id = OrderId::new(order_id);
    let result = state.client.cancel_order(order_id.clone()).await?;

    match result.side {
        Some(side) if result.found => {
            let response = CancelOrderResponse {
                order_id,
                status: OrderStatus::Cancelled,
                side,
            };
            Ok((StatusCode::OK, Json(response)).into_response())
        }
        _ => Err(MatchingError::OrderNotFound(order_id).into()),
    }
}

/// Get details of an order, from the live book first and then from storage
pub async fn get_order(
    Extension(state): Extension<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> ApiResult<Response> {
    let order_id = OrderId::new(order_id);

    let order = match state.client.find_order(order_id.clone()).await? {
        Some(order) => Some(order),
        None => state.repository.get_order(&order_id).await?,
    };

    match order {
        Some(order) => Ok((StatusCode::OK, Json(OrderResponse::from(order))).into_response()),
        None => Err(MatchingError::OrderNotFound(order_id).into()),
    }
}

/// Get the best prices, spread and aggregated depth
pub async fn get_orderbook(
    Extension(state): Extension<Arc<AppState>>,
    query: Result<Query<OrderBookQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(params) = query?;
    let depth = params.depth.unwrap_or(state.depth_limit).max(1);

    let snapshot = state.client.get_depth(depth).await?;
    Ok((StatusCode::OK, Json(OrderBookResponse::from(snapshot))).into_response())
}
