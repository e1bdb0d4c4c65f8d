#![allow(dead_code)]
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Per-(user, market) exposure aggregate, kept in sync as orders lock and
/// release stake. Auxiliary to `Wallet::exposure` (the global sum across all
/// markets); reconcilable against it, never authoritative on its own.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MarketExposure {
    pub user_id: Uuid,
    pub market_id: Uuid,
    pub exposure: Decimal,
    pub updated_at: DateTime<Utc>,
}
