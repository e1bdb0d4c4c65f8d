use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::side::Side;

// Helper module to serialize DateTime as milliseconds timestamp
mod datetime_as_millis {
    use chrono::{DateTime, Utc};
    use serde::Serializer;

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(dt.timestamp_millis())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Open,
    Partial,
    Matched,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub market_id: Uuid,
    pub selection_id: Uuid,
    pub side: Side,
    pub price: Decimal,
    pub stake: Decimal,
    pub matched_stake: Decimal,
    pub remaining_stake: Decimal,
    pub locked_exposure: Decimal,
    pub status: OrderStatus,
    #[serde(serialize_with = "datetime_as_millis::serialize")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "datetime_as_millis::serialize")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub user_id: Uuid,
    pub market_id: Uuid,
    pub selection_id: Uuid,
    pub side: Side,
    pub price: Decimal,
    pub stake: Decimal,
}

#[derive(Debug, Serialize)]
pub struct PlaceOrderResponse {
    pub order: Order,
    pub trades: Vec<crate::models::trade::Trade>,
    pub matched_stake: Decimal,
    pub remaining_stake: Decimal,
    pub status: OrderStatus,
}

#[derive(Debug, Serialize)]
pub struct CancelOrderResponse {
    pub order_id: Uuid,
    pub released_exposure: Decimal,
    pub new_exposure: Decimal,
    pub available_balance: Decimal,
}
