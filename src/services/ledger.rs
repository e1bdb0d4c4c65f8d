//! Wallet mutation primitives
//!
//! Every wallet mutation in the core goes through one of these functions so
//! that a ledger entry and the wallet row change together, inside whatever
//! transaction the caller already holds open. None of these commit; the
//! caller owns the transaction boundary.

use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{LedgerEntry, LedgerKind, Wallet};

fn is_check_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.constraint().is_some())
}

/// Locks `amount` of exposure against `user_id`'s wallet. `balance` is
/// unchanged; the ledger entry's `post_balance` therefore just mirrors the
/// current balance. Fails with `InsufficientFunds` if the wallet's
/// `chk_available_non_negative` constraint would be violated.
pub async fn lock_exposure(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    amount: Decimal,
    notes: &str,
) -> Result<Wallet, CoreError> {
    let wallet = sqlx::query_as::<_, Wallet>(
        "UPDATE wallets SET exposure = exposure + $1, updated_at = now()
         WHERE user_id = $2
         RETURNING *",
    )
    .bind(amount)
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| {
        if is_check_violation(&e) {
            CoreError::InsufficientFunds {
                available: Decimal::ZERO,
                required: amount,
            }
        } else {
            CoreError::Database(e)
        }
    })?;

    sqlx::query(
        "INSERT INTO ledger_entries (id, user_id, amount, kind, post_balance, notes)
         VALUES ($1, $2, $3, 'exposure_lock', $4, $5)",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(-amount)
    .bind(wallet.balance)
    .bind(notes)
    .execute(&mut **tx)
    .await?;

    Ok(wallet)
}

/// Releases `amount` of previously locked exposure — cancellation's release
/// of the unmatched remaining stake (`spec.md` §4.2). The ledger row carries
/// `amount = +amount` under `ExposureRelease`, per `spec.md` §3's ledger
/// entry table; this is a real, signed bookkeeping movement, but
/// `EXPOSURE_RELEASE` is deliberately excluded from the ledger-sum invariant
/// of `spec.md` §8, since releasing a lock never itself moves `balance`.
pub async fn release_exposure(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    amount: Decimal,
    notes: &str,
) -> Result<Wallet, CoreError> {
    let wallet = sqlx::query_as::<_, Wallet>(
        "UPDATE wallets SET exposure = exposure - $1, updated_at = now()
         WHERE user_id = $2
         RETURNING *",
    )
    .bind(amount)
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await?;

    sqlx::query(
        "INSERT INTO ledger_entries (id, user_id, amount, kind, post_balance, notes)
         VALUES ($1, $2, $3, 'exposure_release', $4, $5)",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(amount)
    .bind(wallet.balance)
    .bind(notes)
    .execute(&mut **tx)
    .await?;

    Ok(wallet)
}

/// Releases `amount` of matched-stake exposure at settlement
/// (`spec.md` §4.4). Unlike `release_exposure`, the ledger row is written
/// under `OrderSettle` with `amount = 0`: `spec.md` §8's ledger-sum
/// invariant sums every `ORDER_SETTLE` entry into `wallet.balance`, and this
/// release moves `wallet.exposure` only, never `balance`, so its entry must
/// not contribute a nonzero term to that sum. The real balance-affecting
/// `ORDER_SETTLE` entries are the credits written by `move_balance`
/// alongside this call.
pub async fn release_settlement_exposure(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    amount: Decimal,
    notes: &str,
) -> Result<Wallet, CoreError> {
    let wallet = sqlx::query_as::<_, Wallet>(
        "UPDATE wallets SET exposure = exposure - $1, updated_at = now()
         WHERE user_id = $2
         RETURNING *",
    )
    .bind(amount)
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await?;

    sqlx::query(
        "INSERT INTO ledger_entries (id, user_id, amount, kind, post_balance, notes)
         VALUES ($1, $2, 0, 'order_settle', $3, $4)",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(wallet.balance)
    .bind(notes)
    .execute(&mut **tx)
    .await?;

    Ok(wallet)
}

/// Credits or debits the wallet's balance (positive `amount` credits,
/// negative debits), recording `post_balance` as the balance after this
/// change.
pub async fn move_balance(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    amount: Decimal,
    kind: LedgerKind,
    notes: &str,
) -> Result<Wallet, CoreError> {
    let wallet = sqlx::query_as::<_, Wallet>(
        "UPDATE wallets SET balance = balance + $1, updated_at = now()
         WHERE user_id = $2
         RETURNING *",
    )
    .bind(amount)
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| {
        if is_check_violation(&e) {
            CoreError::InsufficientFunds {
                available: Decimal::ZERO,
                required: -amount,
            }
        } else {
            CoreError::Database(e)
        }
    })?;

    sqlx::query(
        "INSERT INTO ledger_entries (id, user_id, amount, kind, post_balance, notes)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(amount)
    .bind(kind)
    .bind(wallet.balance)
    .bind(notes)
    .execute(&mut **tx)
    .await?;

    Ok(wallet)
}

/// Upserts the (user, market) exposure aggregate by `delta` (may be
/// negative). Auxiliary bookkeeping only — reconcilable against the wallet's
/// own `exposure` column, never authoritative on its own.
pub async fn adjust_market_exposure(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    market_id: Uuid,
    delta: Decimal,
) -> Result<(), CoreError> {
    sqlx::query(
        "INSERT INTO market_exposures (user_id, market_id, exposure, updated_at)
         VALUES ($1, $2, $3, now())
         ON CONFLICT (user_id, market_id)
         DO UPDATE SET exposure = market_exposures.exposure + $3, updated_at = now()",
    )
    .bind(user_id)
    .bind(market_id)
    .bind(delta)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
