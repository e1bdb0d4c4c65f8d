//! Market lifecycle, order book queries, and reference odds.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::CoreError;
use crate::events::{CoreEvent, EventSink};
use crate::models::{
    Market, ReferenceOdds, SettleMarketRequest, TransitionMarketRequest, UpsertReferenceOddsRequest,
};
use crate::services::{market_state, orderbook, settlement};
use crate::utils::response::ApiResponse;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct OrderBookQuery {
    pub selection_id: Uuid,
}

pub async fn get_order_book(
    State(state): State<Arc<AppState>>,
    Path(market_id): Path<Uuid>,
    Query(q): Query<OrderBookQuery>,
) -> Result<Json<ApiResponse<orderbook::OrderBookSnapshot>>, CoreError> {
    let snapshot = orderbook::get_order_book(&state.db.pool, market_id, q.selection_id).await?;
    Ok(Json(ApiResponse::success(snapshot)))
}

pub async fn get_market(
    State(state): State<Arc<AppState>>,
    Path(market_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Market>>, CoreError> {
    let market = sqlx::query_as::<_, Market>("SELECT * FROM markets WHERE id = $1")
        .bind(market_id)
        .fetch_optional(&state.db.pool)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("market {market_id}")))?;
    Ok(Json(ApiResponse::success(market)))
}

pub async fn transition_market(
    State(state): State<Arc<AppState>>,
    Path(market_id): Path<Uuid>,
    Json(req): Json<TransitionMarketRequest>,
) -> Result<Json<ApiResponse<Market>>, CoreError> {
    let mut tx = state.db.pool.begin().await?;

    let market = sqlx::query_as::<_, Market>("SELECT * FROM markets WHERE id = $1 FOR UPDATE")
        .bind(market_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("market {market_id}")))?;

    market_state::transition_market(market.status, req.status)?;

    let updated = sqlx::query_as::<_, Market>(
        "UPDATE markets SET status = $1, updated_at = now() WHERE id = $2 RETURNING *",
    )
    .bind(req.status)
    .bind(market_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(%market_id, from = ?market.status, to = ?req.status, "market transitioned");
    state.events.publish(CoreEvent::MatchUpdate {
        match_id: updated.match_id,
    });

    Ok(Json(ApiResponse::success(updated)))
}

pub async fn settle_market(
    State(state): State<Arc<AppState>>,
    Path(market_id): Path<Uuid>,
    Json(req): Json<SettleMarketRequest>,
) -> Result<Json<ApiResponse<settlement::SettlementSummary>>, CoreError> {
    tracing::info!(%market_id, winners = ?req.winner_selection_ids, "settling market");

    let summary = tokio::time::timeout(
        std::time::Duration::from_secs(state.config.settlement_timeout_secs),
        settlement::settle_market(
            &state.db.pool,
            state.events.as_ref(),
            market_id,
            &req.winner_selection_ids,
        ),
    )
    .await
    .map_err(|_| CoreError::ContentionTimeout("market settlement".into()))??;

    Ok(Json(ApiResponse::success(summary)))
}

pub async fn upsert_reference_odds(
    State(state): State<Arc<AppState>>,
    Path(market_id): Path<Uuid>,
    Json(req): Json<UpsertReferenceOddsRequest>,
) -> Result<Json<ApiResponse<ReferenceOdds>>, CoreError> {
    let odds = sqlx::query_as::<_, ReferenceOdds>(
        "INSERT INTO reference_odds (market_id, selection_id, back_price, lay_price, updated_at)
         VALUES ($1, $2, $3, $4, now())
         ON CONFLICT (market_id, selection_id)
         DO UPDATE SET back_price = $3, lay_price = $4, updated_at = now()
         RETURNING *",
    )
    .bind(market_id)
    .bind(req.selection_id)
    .bind(req.back_price)
    .bind(req.lay_price)
    .fetch_one(&state.db.pool)
    .await?;

    Ok(Json(ApiResponse::success(odds)))
}

#[derive(Debug, Deserialize)]
pub struct ReferenceOddsQuery {
    pub selection_id: Uuid,
}

pub async fn get_reference_odds(
    State(state): State<Arc<AppState>>,
    Path(market_id): Path<Uuid>,
    Query(q): Query<ReferenceOddsQuery>,
) -> Result<Json<ApiResponse<ReferenceOdds>>, CoreError> {
    let odds = sqlx::query_as::<_, ReferenceOdds>(
        "SELECT * FROM reference_odds WHERE market_id = $1 AND selection_id = $2",
    )
    .bind(market_id)
    .bind(q.selection_id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or_else(|| CoreError::NotFound(format!("reference odds for {market_id}/{}", q.selection_id)))?;

    Ok(Json(ApiResponse::success(odds)))
}
