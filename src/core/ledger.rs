//! Ledger primitives - guarded debits, credits and wallet/pool transfers.
//!
//! Every balance change is a single `UPDATE ... SET balance = balance ± x`
//! statement. Debits carry a `balance >= x` guard, so a concurrent writer can
//! never push an account below zero even if it bypasses the in-process locks.
//! Transfers are two such statements and must run inside a database
//! transaction supplied by the caller.
//!
//! [`AccountLocks`] serializes settlements touching the same wallet or pool
//! inside one process. Keys are always acquired in sorted order (wallets before
//! pools), which rules out lock-order deadlocks between settlements. Idle
//! entries are pruned whenever a lock is taken, so the registry only holds
//! accounts that are locked or being waited on.

use crate::{
    core::money::from_cents,
    entities::{Circle, Wallet, circle, wallet},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{prelude::*, sea_query::Expr};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, warn};

/// An account whose balance can be locked for a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccountKey {
    /// A user's wallet, keyed by owner
    Wallet(String),
    /// A circle's pool, keyed by circle id
    Pool(i64),
    /// A member filing claims; never held together with an account lock
    Claimant(String),
}

/// Registry of per-account async mutexes.
#[derive(Debug, Default)]
pub struct AccountLocks {
    slots: Mutex<HashMap<AccountKey, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of a settlement; releases every lock on drop.
#[derive(Debug)]
pub struct AccountGuard {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl AccountLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: AccountKey) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the registry holds these: nobody is locking or waiting
        slots.retain(|_, slot| Arc::strong_count(slot) > 1);
        Arc::clone(slots.entry(key).or_default())
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Locks every given account, in canonical order.
    pub async fn lock<I>(&self, keys: I) -> AccountGuard
    where
        I: IntoIterator<Item = AccountKey>,
    {
        let mut keys: Vec<AccountKey> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            guards.push(self.slot(key).lock_owned().await);
        }
        AccountGuard { _guards: guards }
    }

    /// Locks a single wallet.
    pub async fn lock_wallet(&self, user_id: &str) -> AccountGuard {
        self.lock([AccountKey::Wallet(user_id.to_string())]).await
    }

    /// Serializes claim filing for one member.
    pub async fn lock_claimant(&self, user_id: &str) -> AccountGuard {
        self.lock([AccountKey::Claimant(user_id.to_string())]).await
    }

    /// Locks a member's wallet together with a circle pool.
    pub async fn lock_settlement(&self, user_id: &str, circle_id: i64) -> AccountGuard {
        self.lock([
            AccountKey::Wallet(user_id.to_string()),
            AccountKey::Pool(circle_id),
        ])
        .await
    }
}

fn ensure_positive(cents: i64) -> Result<()> {
    if cents <= 0 {
        return Err(Error::InvalidAmount {
            amount: from_cents(cents),
        });
    }
    Ok(())
}

/// Removes `cents` from a wallet, failing with `InsufficientFunds` if the
/// balance does not cover it.
pub async fn debit_wallet<C>(db: &C, wallet: &wallet::Model, cents: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    ensure_positive(cents)?;

    let result = Wallet::update_many()
        .col_expr(
            wallet::Column::BalanceCents,
            Expr::col(wallet::Column::BalanceCents).sub(cents),
        )
        .col_expr(wallet::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(wallet::Column::Id.eq(wallet.id))
        .filter(wallet::Column::BalanceCents.gte(cents))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        let current = Wallet::find_by_id(wallet.id)
            .one(db)
            .await?
            .ok_or_else(|| Error::WalletNotFound {
                user_id: wallet.user_id.clone(),
            })?;
        return Err(Error::InsufficientFunds {
            available: current.balance(),
            required: from_cents(cents),
        });
    }

    debug!("Debited {} from wallet of {}", from_cents(cents), wallet.user_id);
    Ok(())
}

/// Adds `cents` to a wallet.
pub async fn credit_wallet<C>(db: &C, wallet: &wallet::Model, cents: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    ensure_positive(cents)?;

    let result = Wallet::update_many()
        .col_expr(
            wallet::Column::BalanceCents,
            Expr::col(wallet::Column::BalanceCents).add(cents),
        )
        .col_expr(wallet::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(wallet::Column::Id.eq(wallet.id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::WalletNotFound {
            user_id: wallet.user_id.clone(),
        });
    }

    debug!("Credited {} to wallet of {}", from_cents(cents), wallet.user_id);
    Ok(())
}

/// Removes `cents` from a circle pool, failing with `InsufficientPoolBalance`
/// if the pool does not cover it.
pub async fn debit_pool<C>(db: &C, circle: &circle::Model, cents: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    ensure_positive(cents)?;

    let result = Circle::update_many()
        .col_expr(
            circle::Column::BalanceCents,
            Expr::col(circle::Column::BalanceCents).sub(cents),
        )
        .col_expr(circle::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(circle::Column::Id.eq(circle.id))
        .filter(circle::Column::BalanceCents.gte(cents))
        .exec(db)
        .await?;

    let current = Circle::find_by_id(circle.id)
        .one(db)
        .await?
        .ok_or(Error::CircleNotFound {
            circle_id: circle.id,
        })?;

    if result.rows_affected == 0 {
        return Err(Error::InsufficientPoolBalance {
            available: current.balance(),
            required: from_cents(cents),
        });
    }

    if current.balance_cents < current.min_balance_alert_cents {
        warn!(
            "Pool of circle '{}' is below its alert level: {} < {}",
            current.name,
            current.balance(),
            current.min_balance_alert()
        );
    }

    debug!("Debited {} from pool of circle {}", from_cents(cents), circle.id);
    Ok(())
}

/// Adds `cents` to a circle pool.
pub async fn credit_pool<C>(db: &C, circle: &circle::Model, cents: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    ensure_positive(cents)?;

    let result = Circle::update_many()
        .col_expr(
            circle::Column::BalanceCents,
            Expr::col(circle::Column::BalanceCents).add(cents),
        )
        .col_expr(circle::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(circle::Column::Id.eq(circle.id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::CircleNotFound {
            circle_id: circle.id,
        });
    }

    debug!("Credited {} to pool of circle {}", from_cents(cents), circle.id);
    Ok(())
}

/// Moves `cents` from a member's wallet into a circle pool.
///
/// Must run inside a transaction: if the credit fails the debit is rolled back
/// with it.
pub async fn transfer_wallet_to_pool<C>(
    db: &C,
    wallet: &wallet::Model,
    circle: &circle::Model,
    cents: i64,
) -> Result<()>
where
    C: ConnectionTrait,
{
    debit_wallet(db, wallet, cents).await?;
    credit_pool(db, circle, cents).await
}

/// Moves `cents` from a circle pool into a member's wallet.
///
/// Must run inside a transaction: if the credit fails the debit is rolled back
/// with it.
pub async fn transfer_pool_to_wallet<C>(
    db: &C,
    circle: &circle::Model,
    wallet: &wallet::Model,
    cents: i64,
) -> Result<()>
where
    C: ConnectionTrait,
{
    debit_pool(db, circle, cents).await?;
    credit_wallet(db, wallet, cents).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use rust_decimal_macros::dec;
    use sea_orm::TransactionTrait;
    use std::time::Duration;

    #[tokio::test]
    async fn test_debit_wallet_insufficient_funds() -> Result<()> {
        let engine = setup_engine().await?;
        let wallet = fund_wallet(&engine, "alice", dec!(50)).await?;

        let result = debit_wallet(engine.db(), &wallet, 5_001).await;
        assert!(matches!(
            result,
            Err(Error::InsufficientFunds { available, required })
                if available == dec!(50) && required == dec!(50.01)
        ));

        // Balance untouched
        let wallet = reload_wallet(engine.db(), "alice").await?;
        assert_eq!(wallet.balance(), dec!(50));
        Ok(())
    }

    #[tokio::test]
    async fn test_debit_wallet_exact_balance() -> Result<()> {
        let engine = setup_engine().await?;
        let wallet = fund_wallet(&engine, "alice", dec!(50)).await?;

        debit_wallet(engine.db(), &wallet, 5_000).await?;

        let wallet = reload_wallet(engine.db(), "alice").await?;
        assert_eq!(wallet.balance_cents, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_credit_rejects_non_positive_amounts() -> Result<()> {
        let engine = setup_engine().await?;
        let wallet = fund_wallet(&engine, "alice", dec!(10)).await?;
        let circle = create_test_circle(&engine, "alice", dec!(100)).await?;

        assert!(matches!(
            credit_wallet(engine.db(), &wallet, 0).await,
            Err(Error::InvalidAmount { .. })
        ));
        assert!(matches!(
            credit_pool(engine.db(), &circle, -100).await,
            Err(Error::InvalidAmount { .. })
        ));
        assert!(matches!(
            debit_wallet(engine.db(), &wallet, 0).await,
            Err(Error::InvalidAmount { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_transfer_leaves_both_accounts_untouched() -> Result<()> {
        let engine = setup_engine().await?;
        let wallet = fund_wallet(&engine, "alice", dec!(20)).await?;
        let circle = create_test_circle(&engine, "alice", dec!(100)).await?;
        set_pool_balance(engine.db(), circle.id, dec!(5)).await?;

        let txn = engine.db().begin().await?;
        let result = transfer_pool_to_wallet(&txn, &circle, &wallet, 1_000).await;
        assert!(matches!(result, Err(Error::InsufficientPoolBalance { .. })));
        txn.rollback().await?;

        assert_eq!(reload_wallet(engine.db(), "alice").await?.balance(), dec!(20));
        assert_eq!(reload_circle(engine.db(), circle.id).await?.balance(), dec!(5));
        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_moves_value_both_ways() -> Result<()> {
        let engine = setup_engine().await?;
        let wallet = fund_wallet(&engine, "alice", dec!(200)).await?;
        let circle = create_test_circle(&engine, "alice", dec!(100)).await?;

        let txn = engine.db().begin().await?;
        transfer_wallet_to_pool(&txn, &wallet, &circle, 15_000).await?;
        transfer_pool_to_wallet(&txn, &circle, &wallet, 2_550).await?;
        txn.commit().await?;

        assert_eq!(reload_wallet(engine.db(), "alice").await?.balance(), dec!(75.50));
        assert_eq!(
            reload_circle(engine.db(), circle.id).await?.balance(),
            dec!(124.50)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_locks_serialize_same_account() {
        let locks = Arc::new(AccountLocks::new());
        let guard = locks.lock_settlement("alice", 1).await;

        // Same wallet, different pool: must wait for the first guard
        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock_settlement("alice", 2).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_idle_locks_are_pruned() {
        let locks = AccountLocks::new();
        for user in ["alice", "bob", "carol"] {
            let _guard = locks.lock_settlement(user, 1).await;
        }
        let held = locks.lock_claimant("dave").await;
        // Released wallets and the pool are gone; only dave's entry remains
        assert_eq!(locks.tracked(), 1);
        drop(held);

        let _guard = locks.lock_wallet("erin").await;
        assert_eq!(locks.tracked(), 1);
    }

    #[tokio::test]
    async fn test_locks_disjoint_accounts_proceed() {
        let locks = AccountLocks::new();
        let _first = locks.lock_settlement("alice", 1).await;
        // Neither the wallet nor the pool overlap
        let _second = tokio::time::timeout(
            Duration::from_millis(100),
            locks.lock_settlement("bob", 2),
        )
        .await
        .unwrap();
    }
}
