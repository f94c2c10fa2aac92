//! Refund/exit path - paying a removed member back and closing the membership.
//!
//! The refund covers every non-refunded contribution the member made to the
//! circle. If the pool cannot cover it, nothing changes and the membership stays
//! active; enforcement retries on the member's next missed cycle.

use crate::{
    core::{
        circle::get_circle,
        contribution::unrefunded_contributions,
        engine::SettlementEngine,
        ledger,
        membership::{deactivate, get_membership},
        money::from_cents,
        wallet::{TransactionType, get_wallet, record_transaction},
    },
    entities::{Contribution, contribution, membership},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{info, instrument, warn};

/// What a refund/exit did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundOutcome {
    /// The membership, now inactive
    pub membership: membership::Model,
    /// Amount paid back to the member's wallet
    pub refunded: Decimal,
    /// Number of contributions flagged as refunded
    pub contributions_refunded: usize,
}

/// Refunds and deactivates a membership inside an open transaction.
///
/// The caller must hold the settlement locks for the member's wallet and the
/// circle pool. On error nothing has been written.
pub async fn refund_and_deactivate_in<C>(
    db: &C,
    membership: &membership::Model,
) -> Result<RefundOutcome>
where
    C: ConnectionTrait,
{
    let circle = get_circle(db, membership.circle_id).await?;
    let owed = unrefunded_contributions(db, &membership.user_id, membership.circle_id).await?;
    let owed_cents: i64 = owed.iter().map(|c| c.amount_cents).sum();

    if owed_cents > 0 {
        if circle.balance_cents < owed_cents {
            warn!(
                "Insufficient circle balance for refund to {} from {}",
                membership.user_id, circle.name
            );
            return Err(Error::InsufficientPoolBalance {
                available: circle.balance(),
                required: from_cents(owed_cents),
            });
        }

        let wallet = get_wallet(db, &membership.user_id).await?;
        ledger::transfer_pool_to_wallet(db, &circle, &wallet, owed_cents).await?;

        let ids: Vec<i64> = owed.iter().map(|c| c.id).collect();
        Contribution::update_many()
            .col_expr(contribution::Column::Refunded, Expr::value(true))
            .filter(contribution::Column::Id.is_in(ids))
            .exec(db)
            .await?;

        record_transaction(
            db,
            wallet.id,
            owed_cents,
            TransactionType::Topup,
            format!("Refund from {}", circle.name),
        )
        .await?;
    }

    let membership = deactivate(db, membership).await?;
    info!(
        "Deactivated and refunded user {} from {} ({})",
        membership.user_id,
        circle.name,
        from_cents(owed_cents)
    );

    Ok(RefundOutcome {
        membership,
        refunded: from_cents(owed_cents),
        contributions_refunded: owed.len(),
    })
}

/// Administrative removal: refunds the member and deactivates the membership.
#[instrument(skip(engine))]
pub async fn refund_and_deactivate(
    engine: &SettlementEngine,
    membership_id: i64,
) -> Result<RefundOutcome> {
    let snapshot = get_membership(engine.db(), membership_id).await?;
    let _guard = engine
        .locks()
        .lock_settlement(&snapshot.user_id, snapshot.circle_id)
        .await;

    let txn = engine.db().begin().await?;
    let membership = get_membership(&txn, membership_id).await?;
    if !membership.is_active {
        return Err(Error::NotAMember {
            user_id: membership.user_id,
            circle_id: membership.circle_id,
        });
    }

    let outcome = refund_and_deactivate_in(&txn, &membership).await?;
    txn.commit().await?;
    Ok(outcome)
}
