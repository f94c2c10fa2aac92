//! Contribution business logic - moving a member's cycle payment into the pool.
//!
//! Manual contributions and the enforcement sweep share [`settle_contribution`]:
//! wallet debit, pool credit, the contribution record, the wallet audit entry
//! and the membership reset all happen in one transaction.

use crate::{
    core::{
        circle::get_circle,
        engine::SettlementEngine,
        ledger,
        membership::{get_active_membership, record_contribution},
        wallet::{TransactionType, get_wallet, record_transaction},
    },
    entities::{Contribution, circle, contribution, membership, wallet},
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Pays one contribution from the member's wallet into the circle pool.
///
/// The caller must hold the settlement locks for the wallet and pool and pass
/// an open transaction.
pub async fn settle_contribution<C>(
    db: &C,
    wallet: &wallet::Model,
    circle: &circle::Model,
    membership: &membership::Model,
    is_automatic: bool,
    at: DateTime<Utc>,
) -> Result<contribution::Model>
where
    C: ConnectionTrait,
{
    let cents = circle.contribution_amount_cents;
    ledger::transfer_wallet_to_pool(db, wallet, circle, cents).await?;

    let record = contribution::ActiveModel {
        user_id: Set(membership.user_id.clone()),
        circle_id: Set(circle.id),
        amount_cents: Set(cents),
        timestamp: Set(at),
        is_automatic: Set(is_automatic),
        refunded: Set(false),
        ..Default::default()
    };
    let record = record.insert(db).await?;

    let description = if is_automatic {
        format!("Automatic contribution to {}", circle.name)
    } else {
        format!("Contribution to {} circle", circle.name)
    };
    record_transaction(db, wallet.id, cents, TransactionType::Withdrawal, description).await?;
    record_contribution(db, membership, at).await?;

    Ok(record)
}

/// Member-initiated contribution, outside the enforcement cadence.
#[instrument(skip(engine))]
pub async fn contribute(
    engine: &SettlementEngine,
    user_id: &str,
    circle_id: i64,
) -> Result<contribution::Model> {
    let _guard = engine.locks().lock_settlement(user_id, circle_id).await;
    let txn = engine.db().begin().await?;

    let circle = get_circle(&txn, circle_id).await?;
    let membership = get_active_membership(&txn, user_id, circle_id).await?;
    let wallet = get_wallet(&txn, user_id).await?;

    let record = settle_contribution(&txn, &wallet, &circle, &membership, false, Utc::now()).await?;
    txn.commit().await?;

    info!(
        "User {} contributed {} to circle {}",
        user_id,
        record.amount(),
        circle.name
    );
    Ok(record)
}

/// A user's contributions to a circle that have not been paid back.
pub async fn unrefunded_contributions<C>(
    db: &C,
    user_id: &str,
    circle_id: i64,
) -> Result<Vec<contribution::Model>>
where
    C: ConnectionTrait,
{
    Contribution::find()
        .filter(contribution::Column::UserId.eq(user_id))
        .filter(contribution::Column::CircleId.eq(circle_id))
        .filter(contribution::Column::Refunded.eq(false))
        .all(db)
        .await
        .map_err(Into::into)
}

/// Sum of a user's non-refunded contributions to a circle, in cents.
pub async fn total_unrefunded_cents<C>(db: &C, user_id: &str, circle_id: i64) -> Result<i64>
where
    C: ConnectionTrait,
{
    Ok(unrefunded_contributions(db, user_id, circle_id)
        .await?
        .iter()
        .map(|c| c.amount_cents)
        .sum())
}

/// Lists every contribution to a circle, newest first.
pub async fn list_contributions(
    db: &DatabaseConnection,
    circle_id: i64,
) -> Result<Vec<contribution::Model>> {
    Contribution::find()
        .filter(contribution::Column::CircleId.eq(circle_id))
        .order_by_desc(contribution::Column::Timestamp)
        .order_by_desc(contribution::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
