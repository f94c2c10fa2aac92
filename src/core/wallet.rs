//! Wallet business logic - top-ups, withdrawals and the wallet audit trail.
//!
//! Wallets are created on first top-up. Every movement of value into or out of a
//! wallet, whether from the member or from a settlement, leaves a
//! `wallet_transactions` row describing it.

use crate::{
    core::{
        engine::SettlementEngine,
        ledger,
        money::{from_cents, to_cents},
    },
    entities::{Wallet, WalletTransaction, wallet, wallet_transaction},
    errors::{Error, Result},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Direction of a wallet transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    /// Value entering the wallet
    Topup,
    /// Value leaving the wallet
    Withdrawal,
}

impl TransactionType {
    /// Name stored in the `transaction_type` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Topup => "topup",
            Self::Withdrawal => "withdrawal",
        }
    }
}

/// Finds a user's wallet, if they have one.
pub async fn find_wallet<C>(db: &C, user_id: &str) -> Result<Option<wallet::Model>>
where
    C: ConnectionTrait,
{
    Wallet::find()
        .filter(wallet::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Returns a user's wallet or `WalletNotFound`.
pub async fn get_wallet<C>(db: &C, user_id: &str) -> Result<wallet::Model>
where
    C: ConnectionTrait,
{
    find_wallet(db, user_id)
        .await?
        .ok_or_else(|| Error::WalletNotFound {
            user_id: user_id.to_string(),
        })
}

/// Returns the user's wallet, creating an empty one if needed.
pub async fn get_or_create_wallet<C>(db: &C, user_id: &str) -> Result<wallet::Model>
where
    C: ConnectionTrait,
{
    if let Some(existing) = find_wallet(db, user_id).await? {
        return Ok(existing);
    }

    if user_id.trim().is_empty() {
        return Err(Error::Validation {
            message: "User id cannot be empty".to_string(),
        });
    }

    let now = Utc::now();
    let wallet = wallet::ActiveModel {
        user_id: Set(user_id.to_string()),
        balance_cents: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let wallet = wallet.insert(db).await?;
    info!("Created wallet for user {}", user_id);
    Ok(wallet)
}

/// Appends an entry to a wallet's audit trail.
pub async fn record_transaction<C>(
    db: &C,
    wallet_id: i64,
    amount_cents: i64,
    transaction_type: TransactionType,
    description: String,
) -> Result<wallet_transaction::Model>
where
    C: ConnectionTrait,
{
    let entry = wallet_transaction::ActiveModel {
        wallet_id: Set(wallet_id),
        amount_cents: Set(amount_cents),
        transaction_type: Set(transaction_type.as_str().to_string()),
        description: Set(description),
        timestamp: Set(Utc::now()),
        ..Default::default()
    };
    entry.insert(db).await.map_err(Into::into)
}

/// Adds funds to a user's wallet, creating the wallet on first use.
#[instrument(skip(engine))]
pub async fn top_up(
    engine: &SettlementEngine,
    user_id: &str,
    amount: Decimal,
    description: Option<String>,
) -> Result<wallet::Model> {
    let cents = to_cents(amount)?;
    let _guard = engine.locks().lock_wallet(user_id).await;

    let txn = engine.db().begin().await?;
    let wallet = get_or_create_wallet(&txn, user_id).await?;
    ledger::credit_wallet(&txn, &wallet, cents).await?;
    record_transaction(
        &txn,
        wallet.id,
        cents,
        TransactionType::Topup,
        description.unwrap_or_else(|| "Wallet top-up".to_string()),
    )
    .await?;
    let wallet = get_wallet(&txn, user_id).await?;
    txn.commit().await?;

    info!("Topped up {} for {}, balance {}", amount, user_id, wallet.balance());
    Ok(wallet)
}

/// Withdraws funds from a user's wallet.
#[instrument(skip(engine))]
pub async fn withdraw(
    engine: &SettlementEngine,
    user_id: &str,
    amount: Decimal,
    description: Option<String>,
) -> Result<wallet::Model> {
    let cents = to_cents(amount)?;
    let _guard = engine.locks().lock_wallet(user_id).await;

    let txn = engine.db().begin().await?;
    let wallet = get_wallet(&txn, user_id).await?;
    ledger::debit_wallet(&txn, &wallet, cents).await?;
    record_transaction(
        &txn,
        wallet.id,
        cents,
        TransactionType::Withdrawal,
        description.unwrap_or_else(|| "Wallet withdrawal".to_string()),
    )
    .await?;
    let wallet = get_wallet(&txn, user_id).await?;
    txn.commit().await?;

    info!(
        "Withdrew {} for {}, balance {}",
        from_cents(cents),
        user_id,
        wallet.balance()
    );
    Ok(wallet)
}

/// Lists a user's wallet transactions, newest first.
pub async fn list_wallet_transactions(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<wallet_transaction::Model>> {
    let wallet = get_wallet(db, user_id).await?;
    WalletTransaction::find()
        .filter(wallet_transaction::Column::WalletId.eq(wallet.id))
        .order_by_desc(wallet_transaction::Column::Timestamp)
        .order_by_desc(wallet_transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_top_up_creates_wallet() -> Result<()> {
        let engine = setup_engine().await?;

        assert!(find_wallet(engine.db(), "alice").await?.is_none());

        let wallet = top_up(&engine, "alice", dec!(125.50), None).await?;
        assert_eq!(wallet.user_id, "alice");
        assert_eq!(wallet.balance(), dec!(125.50));

        let wallet = top_up(&engine, "alice", dec!(0.50), None).await?;
        assert_eq!(wallet.balance(), dec!(126));
        Ok(())
    }

    #[tokio::test]
    async fn test_top_up_rejects_invalid_amount() -> Result<()> {
        let engine = setup_engine().await?;

        let result = top_up(&engine, "alice", dec!(-10), None).await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));

        let result = top_up(&engine, "alice", dec!(0.001), None).await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));

        // Rejected before the wallet was created
        assert!(find_wallet(engine.db(), "alice").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_withdraw() -> Result<()> {
        let engine = setup_engine().await?;
        fund_wallet(&engine, "alice", dec!(100)).await?;

        let wallet = withdraw(&engine, "alice", dec!(40), None).await?;
        assert_eq!(wallet.balance(), dec!(60));

        let result = withdraw(&engine, "alice", dec!(60.01), None).await;
        assert!(matches!(
            result,
            Err(Error::InsufficientFunds { available, required })
                if available == dec!(60) && required == dec!(60.01)
        ));
        assert_eq!(reload_wallet(engine.db(), "alice").await?.balance(), dec!(60));
        Ok(())
    }

    #[tokio::test]
    async fn test_withdraw_without_wallet() -> Result<()> {
        let engine = setup_engine().await?;
        let result = withdraw(&engine, "ghost", dec!(1), None).await;
        assert!(matches!(result, Err(Error::WalletNotFound { user_id }) if user_id == "ghost"));
        Ok(())
    }

    #[tokio::test]
    async fn test_wallet_transactions_newest_first() -> Result<()> {
        let engine = setup_engine().await?;
        top_up(&engine, "alice", dec!(100), Some("Salary".to_string())).await?;
        withdraw(&engine, "alice", dec!(30), None).await?;

        let entries = list_wallet_transactions(engine.db(), "alice").await?;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].transaction_type, "withdrawal");
        assert_eq!(entries[0].amount(), dec!(30));
        assert_eq!(entries[0].description, "Wallet withdrawal");
        assert_eq!(entries[1].transaction_type, "topup");
        assert_eq!(entries[1].description, "Salary");
        Ok(())
    }
}
