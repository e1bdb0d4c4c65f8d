#![allow(dead_code)]
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: Decimal,
    pub exposure: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn available(&self) -> Decimal {
        self.balance - self.exposure
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub balance: Decimal,
    pub exposure: Decimal,
    pub available: Decimal,
}

impl From<Wallet> for WalletSnapshot {
    fn from(wallet: Wallet) -> Self {
        Self {
            available: wallet.available(),
            balance: wallet.balance,
            exposure: wallet.exposure,
        }
    }
}

/// Casino-style credit/debit of a user's balance. This is the one entry
/// point the surrounding casino wallet feature would call; the core only
/// needs it here so the crate's demo API can fund a wallet before placing
/// orders against it.
#[derive(Debug, Deserialize)]
pub struct AdjustBalanceRequest {
    pub user_id: Uuid,
    pub amount: Decimal,
    pub notes: Option<String>,
}
