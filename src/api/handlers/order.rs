//! Order placement, cancellation, and lookup.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{Order, PlaceOrderRequest, PlaceOrderResponse};
use crate::services::orders;
use crate::utils::response::ApiResponse;
use crate::AppState;

pub async fn place_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<Json<ApiResponse<PlaceOrderResponse>>, CoreError> {
    tracing::info!(
        user_id = %req.user_id, market_id = %req.market_id, selection_id = %req.selection_id,
        side = %req.side, price = %req.price, stake = %req.stake, "placing order"
    );

    let response = tokio::time::timeout(
        std::time::Duration::from_secs(state.config.order_timeout_secs),
        orders::place_order(
            &state.db.pool,
            state.events.as_ref(),
            req.user_id,
            req.market_id,
            req.selection_id,
            req.side,
            req.price,
            req.stake,
        ),
    )
    .await
    .map_err(|_| CoreError::ContentionTimeout("order placement".into()))??;

    Ok(Json(ApiResponse::success(response)))
}

pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<CancelOrderBody>,
) -> Result<Json<ApiResponse<crate::models::CancelOrderResponse>>, CoreError> {
    tracing::info!(%order_id, user_id = %req.user_id, "cancelling order");

    let response = tokio::time::timeout(
        std::time::Duration::from_secs(state.config.order_timeout_secs),
        orders::cancel_order(&state.db.pool, state.events.as_ref(), req.user_id, order_id),
    )
    .await
    .map_err(|_| CoreError::ContentionTimeout("order cancellation".into()))??;

    Ok(Json(ApiResponse::success(response)))
}

#[derive(Debug, serde::Deserialize)]
pub struct CancelOrderBody {
    pub user_id: Uuid,
}

pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Order>>, CoreError> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_optional(&state.db.pool)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("order {order_id}")))?;

    Ok(Json(ApiResponse::success(order)))
}
