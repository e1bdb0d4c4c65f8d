//! Order book query
//!
//! Read-only aggregation over resting orders for a (market, selection):
//! group by price, sum remaining stake, count orders. No locking — this is
//! a point-in-time snapshot and may race with concurrent matching.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::CoreError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PriceLevel {
    pub price: Decimal,
    pub total_stake: Decimal,
    pub order_count: i64,
}

#[derive(Debug, Serialize)]
pub struct OrderBookSnapshot {
    /// Best available to buy first: highest price first.
    pub back: Vec<PriceLevel>,
    /// Best available to sell first: lowest price first.
    pub lay: Vec<PriceLevel>,
}

pub async fn get_order_book(
    pool: &PgPool,
    market_id: Uuid,
    selection_id: Uuid,
) -> Result<OrderBookSnapshot, CoreError> {
    let back = sqlx::query_as::<_, PriceLevel>(
        "SELECT price, SUM(remaining_stake) AS total_stake, COUNT(*) AS order_count
         FROM orders
         WHERE market_id = $1 AND selection_id = $2 AND side = 'back'
           AND status IN ('open', 'partial')
         GROUP BY price
         ORDER BY price DESC",
    )
    .bind(market_id)
    .bind(selection_id)
    .fetch_all(pool)
    .await?;

    let lay = sqlx::query_as::<_, PriceLevel>(
        "SELECT price, SUM(remaining_stake) AS total_stake, COUNT(*) AS order_count
         FROM orders
         WHERE market_id = $1 AND selection_id = $2 AND side = 'lay'
           AND status IN ('open', 'partial')
         GROUP BY price
         ORDER BY price ASC",
    )
    .bind(market_id)
    .bind(selection_id)
    .fetch_all(pool)
    .await?;

    Ok(OrderBookSnapshot { back, lay })
}
