#![allow(dead_code)]
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A selection within a market. `is_winner` is `None` until settlement
/// decides it: `Some(true)` for the winning runner, `Some(false)` for a
/// loser, and stays `None` on every runner when the market is refunded.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Runner {
    pub id: Uuid,
    pub market_id: Uuid,
    pub name: String,
    pub back_price: Option<Decimal>,
    pub lay_price: Option<Decimal>,
    pub is_winner: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
