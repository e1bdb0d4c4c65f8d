//! Settlement engine
//!
//! Triggered when a market is force-closed or its outcome resolves. Sets
//! each runner's `is_winner`, processes every unsettled trade referencing
//! the market, closes any orders still resting, and advances the market to
//! `SETTLED`. One transaction per market; idempotent against a market
//! that's already settled.
//!
//! Grounded in the teacher's `SettlementService::settle_user_shares`: one
//! transaction per settlement run, a per-position payout loop, an
//! already-settled guard before doing any work. Generalized here from
//! Polymarket-style binary shares to this crate's BACK/LAY trade table.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::CoreError;
use crate::events::{CoreEvent, EventSink, SettlementOutcome};
use crate::models::{LedgerKind, Market, MarketStatus, Order, Runner, Trade};
use crate::money::round2;
use crate::side::Side;
use crate::services::{ledger, market_state, orders};

#[derive(Debug, Clone, Serialize)]
pub struct SettlementSummary {
    pub market_id: Uuid,
    pub trades_settled: usize,
    pub orders_closed: usize,
}

/// Settles `market_id`. `winner_selection_ids` empty means refund-all;
/// otherwise every runner in that list is marked a winner and every other
/// runner in the market a loser.
pub async fn settle_market(
    pool: &PgPool,
    sink: &dyn EventSink,
    market_id: Uuid,
    winner_selection_ids: &[Uuid],
) -> Result<SettlementSummary, CoreError> {
    let mut tx = pool.begin().await?;

    let market = sqlx::query_as::<_, Market>("SELECT * FROM markets WHERE id = $1 FOR UPDATE")
        .bind(market_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("market {market_id}")))?;

    if market.status == MarketStatus::Settled {
        return Err(CoreError::InvalidState(format!(
            "market {market_id} is already settled"
        )));
    }

    if market.status != MarketStatus::Closed {
        market_state::transition_market(market.status, MarketStatus::Closed)?;
        sqlx::query("UPDATE markets SET status = 'closed', updated_at = now() WHERE id = $1")
            .bind(market_id)
            .execute(&mut *tx)
            .await?;
    }

    let runners = sqlx::query_as::<_, Runner>("SELECT * FROM runners WHERE market_id = $1")
        .bind(market_id)
        .fetch_all(&mut *tx)
        .await?;

    let refund_all = winner_selection_ids.is_empty();
    for runner in &runners {
        let is_winner = if refund_all {
            None
        } else {
            Some(winner_selection_ids.contains(&runner.id))
        };
        sqlx::query("UPDATE runners SET is_winner = $1, updated_at = now() WHERE id = $2")
            .bind(is_winner)
            .bind(runner.id)
            .execute(&mut *tx)
            .await?;
    }

    let trades = sqlx::query_as::<_, Trade>(
        "SELECT * FROM trades WHERE market_id = $1 AND NOT settled FOR UPDATE",
    )
    .bind(market_id)
    .fetch_all(&mut *tx)
    .await?;

    let mut settled_events = Vec::new();

    for trade in &trades {
        let is_winner = if refund_all {
            None
        } else {
            Some(winner_selection_ids.contains(&trade.selection_id))
        };

        let back_order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(trade.back_order_id)
            .fetch_one(&mut *tx)
            .await?;
        let lay_order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(trade.lay_order_id)
            .fetch_one(&mut *tx)
            .await?;

        let liability = round2((trade.price - Decimal::ONE) * trade.stake);

        let (back_outcome, back_credit, lay_outcome, lay_credit) = match is_winner {
            None => (
                SettlementOutcome::Refunded,
                Some(trade.stake),
                SettlementOutcome::Refunded,
                Some(liability),
            ),
            Some(true) => (
                SettlementOutcome::Won,
                Some(round2(trade.price * trade.stake)),
                SettlementOutcome::Lost,
                None,
            ),
            Some(false) => (
                SettlementOutcome::Lost,
                None,
                SettlementOutcome::Won,
                Some(trade.stake),
            ),
        };

        settle_side(
            &mut tx,
            market_id,
            back_order.user_id,
            back_credit,
            trade.stake,
            trade.id,
        )
        .await?;
        settle_side(
            &mut tx,
            market_id,
            lay_order.user_id,
            lay_credit,
            liability,
            trade.id,
        )
        .await?;

        sqlx::query(
            "UPDATE trades SET settled = true, settled_at = now() WHERE id = $1",
        )
        .bind(trade.id)
        .execute(&mut *tx)
        .await?;

        settled_events.push((back_order.user_id, back_outcome, back_credit.unwrap_or(Decimal::ZERO)));
        settled_events.push((lay_order.user_id, lay_outcome, lay_credit.unwrap_or(Decimal::ZERO)));
    }

    let orders_closed = orders::close_unmatched_orders(&mut tx, market_id).await?;

    sqlx::query("UPDATE markets SET status = 'settled', updated_at = now() WHERE id = $1")
        .bind(market_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    for (user_id, outcome, amount) in &settled_events {
        sink.publish(CoreEvent::BetSettled {
            order_id: Uuid::nil(),
            user_id: *user_id,
            outcome: *outcome,
            amount: *amount,
        });
    }
    sink.publish(CoreEvent::MatchUpdate { match_id: market_id });

    Ok(SettlementSummary {
        market_id,
        trades_settled: trades.len(),
        orders_closed,
    })
}

/// Applies one side's settlement movement: an optional balance credit
/// (`ORDER_SETTLE`, real amount) and the mandatory release of that side's
/// matched-stake exposure (`ORDER_SETTLE`, zero amount — see
/// `ledger::release_settlement_exposure`). Keeping the release's ledger
/// amount at zero is what lets the ledger-sum invariant of `spec.md` §8
/// hold: only the credit, not the exposure bookkeeping, is a real balance
/// movement.
async fn settle_side(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    market_id: Uuid,
    user_id: Uuid,
    credit: Option<Decimal>,
    release_amount: Decimal,
    trade_id: Uuid,
) -> Result<(), CoreError> {
    if let Some(amount) = credit {
        if amount > Decimal::ZERO {
            ledger::move_balance(
                tx,
                user_id,
                amount,
                LedgerKind::OrderSettle,
                &format!("trade {trade_id} settlement credit"),
            )
            .await?;
        }
    }

    ledger::release_settlement_exposure(
        tx,
        user_id,
        release_amount,
        &format!("trade {trade_id} settlement exposure release"),
    )
    .await?;
    ledger::adjust_market_exposure(tx, user_id, market_id, -release_amount).await?;

    Ok(())
}

/// `true` if `side` is the winning side of a trade for a runner with the
/// given `is_winner`. Kept as a pure helper for tests; the main settlement
/// loop inlines the equivalent branch directly against `Option<bool>`.
#[allow(dead_code)]
fn side_wins(side: Side, is_winner: Option<bool>) -> Option<bool> {
    is_winner.map(|w| match side {
        Side::Back => w,
        Side::Lay => !w,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refund_has_no_winner_on_either_side() {
        assert_eq!(side_wins(Side::Back, None), None);
        assert_eq!(side_wins(Side::Lay, None), None);
    }

    #[test]
    fn back_wins_iff_selection_wins() {
        assert_eq!(side_wins(Side::Back, Some(true)), Some(true));
        assert_eq!(side_wins(Side::Lay, Some(true)), Some(false));
        assert_eq!(side_wins(Side::Back, Some(false)), Some(false));
        assert_eq!(side_wins(Side::Lay, Some(false)), Some(true));
    }
}
