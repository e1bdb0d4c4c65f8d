//! Price-time matching engine
//!
//! Walks the opposite side of an incoming order's book one resting
//! candidate at a time, claiming each with `FOR UPDATE SKIP LOCKED` so two
//! concurrent matching runs on the same selection never claim the same
//! resting order. Every trade prints at the resting order's price, never the
//! incoming order's.
//!
//! Per the exposure-release resolution in `SPEC_FULL.md` §4.1/§4.4: matching
//! never touches `wallet.exposure` on either side. It only moves stake
//! between `remaining_stake` and `matched_stake` and creates trade rows;
//! the locked exposure on both counterparties stays untouched until
//! settlement or cancellation releases it.

use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{Order, OrderStatus, Trade};
use crate::side::Side;

/// Outcome of running the matching engine against one incoming order.
pub struct MatchResult {
    pub matched_stake: Decimal,
    pub remaining_stake: Decimal,
    pub status: OrderStatus,
    pub trades: Vec<Trade>,
}

/// Matches `incoming` against resting opposite-side orders on the same
/// selection and persists every effect (trade rows, resting order updates,
/// the incoming order's own row) inside `tx`. Does not commit.
pub async fn match_order(
    tx: &mut Transaction<'_, Postgres>,
    incoming: &Order,
) -> Result<MatchResult, CoreError> {
    let opposite_side = incoming.side.opposite();
    let order_by = incoming.side.candidate_order_by();

    let mut remaining = incoming.remaining_stake;
    let mut matched = incoming.matched_stake;
    let mut trades = Vec::new();

    loop {
        if remaining <= Decimal::ZERO {
            break;
        }

        let candidate = fetch_candidate(tx, incoming, opposite_side, order_by).await?;
        let Some(resting) = candidate else { break };

        let trade_stake = remaining.min(resting.remaining_stake);
        let trade_price = resting.price;

        let resting_matched = resting.matched_stake + trade_stake;
        let resting_remaining = resting.remaining_stake - trade_stake;
        let resting_status = if resting_remaining == Decimal::ZERO {
            OrderStatus::Matched
        } else {
            OrderStatus::Partial
        };

        sqlx::query(
            "UPDATE orders
             SET matched_stake = $1, remaining_stake = $2, status = $3, updated_at = now()
             WHERE id = $4",
        )
        .bind(resting_matched)
        .bind(resting_remaining)
        .bind(resting_status)
        .bind(resting.id)
        .execute(&mut **tx)
        .await?;

        let (back_order_id, lay_order_id) = match incoming.side {
            Side::Back => (incoming.id, resting.id),
            Side::Lay => (resting.id, incoming.id),
        };

        let trade = sqlx::query_as::<_, Trade>(
            "INSERT INTO trades
                (id, market_id, selection_id, back_order_id, lay_order_id, price, stake, settled)
             VALUES ($1, $2, $3, $4, $5, $6, $7, false)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(incoming.market_id)
        .bind(incoming.selection_id)
        .bind(back_order_id)
        .bind(lay_order_id)
        .bind(trade_price)
        .bind(trade_stake)
        .fetch_one(&mut **tx)
        .await?;

        tracing::info!(
            trade_id = %trade.id, back_order_id = %back_order_id, lay_order_id = %lay_order_id,
            price = %trade_price, stake = %trade_stake, "trade created"
        );

        trades.push(trade);
        remaining -= trade_stake;
        matched += trade_stake;
    }

    let status = if remaining == Decimal::ZERO {
        OrderStatus::Matched
    } else if matched > Decimal::ZERO {
        OrderStatus::Partial
    } else {
        OrderStatus::Open
    };

    sqlx::query(
        "UPDATE orders
         SET matched_stake = $1, remaining_stake = $2, status = $3, updated_at = now()
         WHERE id = $4",
    )
    .bind(matched)
    .bind(remaining)
    .bind(status)
    .bind(incoming.id)
    .execute(&mut **tx)
    .await?;

    Ok(MatchResult {
        matched_stake: matched,
        remaining_stake: remaining,
        status,
        trades,
    })
}

/// Claims the single best candidate on `opposite_side` that crosses
/// `incoming`'s limit price, skipping rows locked by a concurrent matching
/// run. Re-reads `remaining_stake` fresh under the lock.
async fn fetch_candidate(
    tx: &mut Transaction<'_, Postgres>,
    incoming: &Order,
    opposite_side: Side,
    order_by: &str,
) -> Result<Option<Order>, CoreError> {
    let crosses_clause = match incoming.side {
        Side::Back => "price <= $4",
        Side::Lay => "price >= $4",
    };

    let query = format!(
        "SELECT * FROM orders
         WHERE selection_id = $1
           AND side = $2
           AND status IN ('open', 'partial')
           AND user_id <> $3
           AND {crosses_clause}
         ORDER BY {order_by}
         LIMIT 1
         FOR UPDATE SKIP LOCKED"
    );

    let candidate = sqlx::query_as::<_, Order>(&query)
        .bind(incoming.selection_id)
        .bind(opposite_side)
        .bind(incoming.user_id)
        .bind(incoming.price)
        .fetch_optional(&mut **tx)
        .await?;

    Ok(candidate)
}
