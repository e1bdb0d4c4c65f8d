//! Order lifecycle controller
//!
//! `place_order` and `cancel_order` are the two public entry points; each
//! wraps its work in one `sqlx::Transaction` and returns only after every
//! effect (wallet, ledger, order, trades, market exposure) has been written.
//! Grounded in the teacher's `OrderFlowOrchestrator::process_order` shape,
//! but persistence happens inline rather than via `tokio::spawn` — the
//! spec's atomicity requirement rules out deferred writes.

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::CoreError;
use crate::events::{CoreEvent, EventSink};
use crate::models::{
    Market, MarketStatus, Order, OrderStatus, PlaceOrderResponse, Runner, Wallet,
};
use crate::money::{has_valid_scale, round2};
use crate::services::{ledger, market_state, matching};
use crate::side::Side;

/// Places a new order, matches it against the resting book, and returns the
/// persisted order plus any trades it generated.
pub async fn place_order(
    pool: &PgPool,
    sink: &dyn EventSink,
    user_id: Uuid,
    market_id: Uuid,
    selection_id: Uuid,
    side: Side,
    price: Decimal,
    stake: Decimal,
) -> Result<PlaceOrderResponse, CoreError> {
    if price <= Decimal::ONE {
        return Err(CoreError::InvalidInput("price must be > 1.00".into()));
    }
    if stake <= Decimal::ZERO {
        return Err(CoreError::InvalidInput("stake must be > 0".into()));
    }
    if !has_valid_scale(price) || !has_valid_scale(stake) {
        return Err(CoreError::InvalidInput(
            "price and stake may have at most 2 fractional digits".into(),
        ));
    }

    let mut tx = pool.begin().await?;

    let market = sqlx::query_as::<_, Market>("SELECT * FROM markets WHERE id = $1")
        .bind(market_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("market {market_id}")))?;

    if !market_state::accepts_orders(market.status) {
        return Err(CoreError::InvalidState(format!(
            "market {market_id} is {:?}, not open",
            market.status
        )));
    }

    let _runner = sqlx::query_as::<_, Runner>(
        "SELECT * FROM runners WHERE id = $1 AND market_id = $2",
    )
    .bind(selection_id)
    .bind(market_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| CoreError::NotFound(format!("selection {selection_id} in market {market_id}")))?;

    let required_exposure = side.required_exposure(price, stake);

    let wallet = sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE user_id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("wallet for user {user_id}")))?;

    if wallet.available() < required_exposure {
        return Err(CoreError::InsufficientFunds {
            available: wallet.available(),
            required: required_exposure,
        });
    }

    let order_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO orders
            (id, user_id, market_id, selection_id, side, price, stake,
             matched_stake, remaining_stake, locked_exposure, status)
         VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $7, $8, 'open')",
    )
    .bind(order_id)
    .bind(user_id)
    .bind(market_id)
    .bind(selection_id)
    .bind(side)
    .bind(price)
    .bind(stake)
    .bind(required_exposure)
    .execute(&mut *tx)
    .await?;

    ledger::lock_exposure(
        &mut tx,
        user_id,
        required_exposure,
        &format!("order {order_id} placement lock"),
    )
    .await?;
    ledger::adjust_market_exposure(&mut tx, user_id, market_id, required_exposure).await?;

    let incoming = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;

    let result = matching::match_order(&mut tx, &incoming).await?;

    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;

    let post_wallet = sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    sink.publish(CoreEvent::BetPlaced {
        order_id,
        user_id,
        market_id,
        selection_id,
    });
    sink.publish(CoreEvent::BalanceUpdate {
        user_id,
        balance: post_wallet.balance,
        exposure: post_wallet.exposure,
        available_balance: post_wallet.available(),
        changed_by: "order_place",
        amount: required_exposure,
    });
    for trade in &result.trades {
        sink.publish(CoreEvent::MatchUpdate { match_id: trade.id });
    }

    Ok(PlaceOrderResponse {
        order,
        trades: result.trades,
        matched_stake: result.matched_stake,
        remaining_stake: result.remaining_stake,
        status: result.status,
    })
}

/// Cancels an order owned by `user_id`. Only `OPEN`/`PARTIAL` orders may be
/// cancelled; the matched portion remains bound by its trades and settles
/// normally. Releases exposure for the unmatched remaining stake only.
pub async fn cancel_order(
    pool: &PgPool,
    sink: &dyn EventSink,
    user_id: Uuid,
    order_id: Uuid,
) -> Result<crate::models::CancelOrderResponse, CoreError> {
    let mut tx = pool.begin().await?;

    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("order {order_id}")))?;

    if order.user_id != user_id {
        return Err(CoreError::PermissionDenied(
            "order does not belong to this user".into(),
        ));
    }
    if !matches!(order.status, OrderStatus::Open | OrderStatus::Partial) {
        return Err(CoreError::InvalidState(format!(
            "order {order_id} is {:?}, not cancellable",
            order.status
        )));
    }

    let releaseable = release_for_remaining(&order);

    sqlx::query("UPDATE orders SET status = 'cancelled', updated_at = now() WHERE id = $1")
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

    let wallet = ledger::release_exposure(
        &mut tx,
        user_id,
        releaseable,
        &format!("order {order_id} cancellation release"),
    )
    .await?;
    ledger::adjust_market_exposure(&mut tx, user_id, order.market_id, -releaseable).await?;

    tx.commit().await?;

    sink.publish(CoreEvent::BalanceUpdate {
        user_id,
        balance: wallet.balance,
        exposure: wallet.exposure,
        available_balance: wallet.available(),
        changed_by: "order_cancel",
        amount: releaseable,
    });

    Ok(crate::models::CancelOrderResponse {
        order_id,
        released_exposure: releaseable,
        new_exposure: wallet.exposure,
        available_balance: wallet.available(),
    })
}

/// Closes all remaining `OPEN`/`PARTIAL` orders in a market, releasing their
/// exposure per the same formula as user-initiated cancellation. Used by
/// the settlement engine after processing trades.
pub(crate) async fn close_unmatched_orders(
    tx: &mut Transaction<'_, Postgres>,
    market_id: Uuid,
) -> Result<usize, CoreError> {
    let open_orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE market_id = $1 AND status IN ('open', 'partial') FOR UPDATE",
    )
    .bind(market_id)
    .fetch_all(&mut **tx)
    .await?;

    let closed = open_orders.len();

    for order in open_orders {
        let releaseable = release_for_remaining(&order);

        sqlx::query("UPDATE orders SET status = 'cancelled', updated_at = now() WHERE id = $1")
            .bind(order.id)
            .execute(&mut **tx)
            .await?;

        ledger::release_exposure(
            tx,
            order.user_id,
            releaseable,
            &format!("order {} closed at market settlement", order.id),
        )
        .await?;
        ledger::adjust_market_exposure(tx, order.user_id, market_id, -releaseable).await?;
    }

    Ok(closed)
}

fn release_for_remaining(order: &Order) -> Decimal {
    match order.side {
        Side::Back => order.remaining_stake,
        Side::Lay => round2((order.price - Decimal::ONE) * order.remaining_stake),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(side: Side, price: Decimal, remaining: Decimal) -> Order {
        Order {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            market_id: Uuid::new_v4(),
            selection_id: Uuid::new_v4(),
            side,
            price,
            stake: remaining,
            matched_stake: Decimal::ZERO,
            remaining_stake: remaining,
            locked_exposure: Decimal::ZERO,
            status: OrderStatus::Open,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn back_release_is_remaining_stake() {
        let o = order(Side::Back, dec!(3.00), dec!(120));
        assert_eq!(release_for_remaining(&o), dec!(120));
    }

    #[test]
    fn lay_release_is_liability_on_remaining_stake() {
        let o = order(Side::Lay, dec!(3.00), dec!(120));
        assert_eq!(release_for_remaining(&o), dec!(240));
    }
}
