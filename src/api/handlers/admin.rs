//! Onboarding and fixture-building endpoints.
//!
//! None of this is the matching/settlement core itself — it's the minimum
//! surrounding surface (user+wallet creation, match/market/runner setup,
//! balance top-ups, match lifecycle) needed to exercise the core end to end
//! without a separate admin service sitting in front of it.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::error::CoreError;
use crate::events::EventSink;
use crate::models::{
    AdjustBalanceRequest, CreateMarketRequest, CreateMatchRequest, CreateUserRequest, LedgerKind,
    Market, Match, Runner, TransitionMatchRequest, User, UserRole, Wallet,
};
use crate::services::{ledger, market_state};
use crate::utils::response::ApiResponse;
use crate::AppState;

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<ApiResponse<User>>, CoreError> {
    let mut tx = state.db.pool.begin().await?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, email, role, parent_id)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&req.email)
    .bind(req.role.unwrap_or(UserRole::User))
    .bind(req.parent_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if matches!(&e, sqlx::Error::Database(db) if db.constraint() == Some("users_email_key")) {
            CoreError::Conflict(format!("email {} already registered", req.email))
        } else {
            CoreError::Database(e)
        }
    })?;

    sqlx::query("INSERT INTO wallets (id, user_id, balance, exposure) VALUES ($1, $2, 0, 0)")
        .bind(Uuid::new_v4())
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(user_id = %user.id, email = %user.email, "user and wallet created");
    Ok(Json(ApiResponse::success(user)))
}

pub async fn adjust_balance(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdjustBalanceRequest>,
) -> Result<Json<ApiResponse<Wallet>>, CoreError> {
    let kind = if req.amount >= rust_decimal::Decimal::ZERO {
        LedgerKind::Credit
    } else {
        LedgerKind::Debit
    };

    let mut tx = state.db.pool.begin().await?;
    let wallet = ledger::move_balance(
        &mut tx,
        req.user_id,
        req.amount,
        kind,
        req.notes.as_deref().unwrap_or("manual balance adjustment"),
    )
    .await?;
    tx.commit().await?;

    state.events.publish(crate::events::CoreEvent::BalanceUpdate {
        user_id: req.user_id,
        balance: wallet.balance,
        exposure: wallet.exposure,
        available_balance: wallet.available(),
        changed_by: "admin_adjust",
        amount: req.amount,
    });

    Ok(Json(ApiResponse::success(wallet)))
}

pub async fn get_wallet(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Wallet>>, CoreError> {
    let wallet = sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(&state.db.pool)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("wallet for user {user_id}")))?;

    Ok(Json(ApiResponse::success(wallet)))
}

pub async fn create_match(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMatchRequest>,
) -> Result<Json<ApiResponse<Match>>, CoreError> {
    let m = sqlx::query_as::<_, Match>(
        "INSERT INTO matches (id, home_team, away_team, sport_key, start_time, external_id)
         VALUES ($1, $2, $3, $4, $5, $6)
         ON CONFLICT (external_id) DO NOTHING
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&req.home_team)
    .bind(&req.away_team)
    .bind(&req.sport_key)
    .bind(req.start_time)
    .bind(&req.external_id)
    .fetch_optional(&state.db.pool)
    .await?;

    // A duplicate external_id hits ON CONFLICT DO NOTHING and returns no row;
    // per spec.md §4.6, that's a conflict surfaced as the existing resource,
    // not an error.
    let m = match m {
        Some(m) => m,
        None => {
            let external_id = req
                .external_id
                .as_ref()
                .ok_or_else(|| CoreError::Conflict("duplicate match".into()))?;
            sqlx::query_as::<_, Match>("SELECT * FROM matches WHERE external_id = $1")
                .bind(external_id)
                .fetch_one(&state.db.pool)
                .await?
        }
    };

    Ok(Json(ApiResponse::success(m)))
}

pub async fn transition_match(
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
    Json(req): Json<TransitionMatchRequest>,
) -> Result<Json<ApiResponse<Match>>, CoreError> {
    let current = sqlx::query_as::<_, Match>("SELECT * FROM matches WHERE id = $1")
        .bind(match_id)
        .fetch_optional(&state.db.pool)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("match {match_id}")))?;

    market_state::transition_match(current.status, req.status)?;

    let updated = sqlx::query_as::<_, Match>(
        "UPDATE matches SET status = $1, updated_at = now() WHERE id = $2 RETURNING *",
    )
    .bind(req.status)
    .bind(match_id)
    .fetch_one(&state.db.pool)
    .await?;

    state
        .events
        .publish(crate::events::CoreEvent::MatchUpdate { match_id });

    Ok(Json(ApiResponse::success(updated)))
}

pub async fn create_market(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMarketRequest>,
) -> Result<Json<ApiResponse<MarketWithRunners>>, CoreError> {
    if req.runners.len() < 2 {
        return Err(CoreError::InvalidInput(
            "a market needs at least two runners".into(),
        ));
    }

    let mut tx = state.db.pool.begin().await?;

    let market = sqlx::query_as::<_, Market>(
        "INSERT INTO markets (id, match_id, name) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(req.match_id)
    .bind(&req.name)
    .fetch_one(&mut *tx)
    .await?;

    let mut runners = Vec::with_capacity(req.runners.len());
    for name in &req.runners {
        let runner = sqlx::query_as::<_, Runner>(
            "INSERT INTO runners (id, market_id, name) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(market.id)
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;
        runners.push(runner);
    }

    tx.commit().await?;

    Ok(Json(ApiResponse::success(MarketWithRunners {
        market,
        runners,
    })))
}

#[derive(Debug, serde::Serialize)]
pub struct MarketWithRunners {
    pub market: Market,
    pub runners: Vec<Runner>,
}
