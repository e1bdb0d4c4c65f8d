#![allow(dead_code)]
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// External-feed odds snapshot for a selection, used to sanity-check or
/// display against user-quoted prices. Not consulted by the matching engine
/// itself.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReferenceOdds {
    pub market_id: Uuid,
    pub selection_id: Uuid,
    pub back_price: Option<Decimal>,
    pub lay_price: Option<Decimal>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertReferenceOddsRequest {
    pub selection_id: Uuid,
    pub back_price: Option<Decimal>,
    pub lay_price: Option<Decimal>,
}
