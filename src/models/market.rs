#![allow(dead_code)]
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "market_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    Open,
    Suspended,
    Closed,
    Settled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Market {
    pub id: Uuid,
    pub match_id: Uuid,
    pub name: String,
    pub status: MarketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMarketRequest {
    pub match_id: Uuid,
    pub name: String,
    /// At least two runner names — a market needs ≥ 2 selections.
    pub runners: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionMarketRequest {
    pub status: MarketStatus,
}

#[derive(Debug, Deserialize)]
pub struct SettleMarketRequest {
    /// Empty means refund-all.
    #[serde(default)]
    pub winner_selection_ids: Vec<Uuid>,
}
