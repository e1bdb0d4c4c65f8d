#![allow(dead_code)]
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Append-only ledger entry kind. Not every variant is written by this
/// core — `transfer_*` and `bet_*` belong to the surrounding casino/transfer
/// features that share this ledger, but the type stays complete because the
/// schema is shared with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ledger_kind", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerKind {
    Credit,
    Debit,
    TransferIn,
    TransferOut,
    OrderPlace,
    OrderCancel,
    OrderSettle,
    ExposureLock,
    ExposureRelease,
    BetPlace,
    BetSettle,
    BetRefund,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub kind: LedgerKind,
    pub post_balance: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
