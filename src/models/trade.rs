#![allow(dead_code)]
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A single match between a back order and a lay order. Always prints at
/// the resting order's price, per price-time priority.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trade {
    pub id: Uuid,
    pub market_id: Uuid,
    pub selection_id: Uuid,
    pub back_order_id: Uuid,
    pub lay_order_id: Uuid,
    pub price: Decimal,
    pub stake: Decimal,
    pub settled: bool,
    pub settled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
