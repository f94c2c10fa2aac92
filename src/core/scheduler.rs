//! Contribution enforcement sweep.
//!
//! Every active membership is processed in its own lock scope and database
//! transaction. A failure on one membership is logged and counted; it never
//! stops the sweep. There is no cursor: a sweep that crashes half way is simply
//! run again, and memberships already handled are no longer due.
//!
//! Per membership:
//! - no wallet: skipped with a warning
//! - not yet due: nothing happens
//! - due and funded: automatic contribution
//! - due and underfunded: one more warning; at the threshold the member is
//!   refunded and removed in the same transaction

use crate::{
    core::{
        circle::get_circle,
        contribution::settle_contribution,
        engine::SettlementEngine,
        membership::{due_date, get_membership, list_active_memberships, record_missed_contribution},
        refund::refund_and_deactivate_in,
        wallet::find_wallet,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::TransactionTrait;
use tracing::{error, info, instrument, warn};

/// What enforcement did to one membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnforcementOutcome {
    /// Contribution not yet due
    NotDue,
    /// Contribution taken automatically
    Contributed {
        /// The new contribution
        contribution_id: i64,
    },
    /// Wallet could not cover the contribution
    Warned {
        /// Warnings after this pass
        warnings: i32,
    },
    /// Threshold reached: member refunded and removed
    Deactivated {
        /// Amount paid back
        refunded: Decimal,
    },
    /// Threshold reached but the pool cannot cover the refund
    RefundBlocked {
        /// Warnings after this pass
        warnings: i32,
    },
    /// Member has no wallet
    SkippedNoWallet,
    /// Membership was deactivated before this pass reached it
    SkippedInactive,
}

/// Summary of one sweep over all active memberships.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Reference time used for due-date checks
    pub swept_at: DateTime<Utc>,
    /// Memberships examined
    pub processed: usize,
    /// Automatic contributions taken
    pub contributed: usize,
    /// Warnings issued below the threshold
    pub warned: usize,
    /// Members refunded and removed
    pub deactivated: usize,
    /// Removals blocked by an insolvent pool
    pub refund_blocked: usize,
    /// Memberships not yet due
    pub not_due: usize,
    /// Memberships skipped (no wallet, or already inactive)
    pub skipped: usize,
    /// Memberships whose processing failed
    pub failed: usize,
}

impl SweepReport {
    const fn new(swept_at: DateTime<Utc>) -> Self {
        Self {
            swept_at,
            processed: 0,
            contributed: 0,
            warned: 0,
            deactivated: 0,
            refund_blocked: 0,
            not_due: 0,
            skipped: 0,
            failed: 0,
        }
    }

    fn record(&mut self, outcome: &EnforcementOutcome) {
        match outcome {
            EnforcementOutcome::NotDue => self.not_due += 1,
            EnforcementOutcome::Contributed { .. } => self.contributed += 1,
            EnforcementOutcome::Warned { .. } => self.warned += 1,
            EnforcementOutcome::Deactivated { .. } => self.deactivated += 1,
            EnforcementOutcome::RefundBlocked { .. } => self.refund_blocked += 1,
            EnforcementOutcome::SkippedNoWallet | EnforcementOutcome::SkippedInactive => {
                self.skipped += 1;
            }
        }
    }
}

/// Enforces the contribution cadence for one membership at time `now`.
#[instrument(skip(engine))]
pub async fn enforce_membership(
    engine: &SettlementEngine,
    membership_id: i64,
    now: DateTime<Utc>,
) -> Result<EnforcementOutcome> {
    let snapshot = get_membership(engine.db(), membership_id).await?;
    let _guard = engine
        .locks()
        .lock_settlement(&snapshot.user_id, snapshot.circle_id)
        .await;

    let txn = engine.db().begin().await?;

    // Re-read under the lock: an overlapping sweep may have got here first
    let membership = get_membership(&txn, membership_id).await?;
    if !membership.is_active {
        return Ok(EnforcementOutcome::SkippedInactive);
    }

    let Some(wallet) = find_wallet(&txn, &membership.user_id).await? else {
        warn!("No wallet for user {}", membership.user_id);
        return Ok(EnforcementOutcome::SkippedNoWallet);
    };

    let circle = get_circle(&txn, membership.circle_id).await?;
    if now < due_date(&membership, &circle.frequency) {
        return Ok(EnforcementOutcome::NotDue);
    }

    if wallet.balance_cents >= circle.contribution_amount_cents {
        let record = settle_contribution(&txn, &wallet, &circle, &membership, true, now).await?;
        txn.commit().await?;
        info!(
            "Automatic contribution of {} from {} to {}",
            record.amount(),
            membership.user_id,
            circle.name
        );
        return Ok(EnforcementOutcome::Contributed {
            contribution_id: record.id,
        });
    }

    let membership = record_missed_contribution(&txn, &membership, now).await?;
    info!(
        "Warning increased for {} in {} ({} warnings)",
        membership.user_id, circle.name, membership.payment_warnings
    );

    if membership.payment_warnings < engine.config().contributions.warning_threshold {
        txn.commit().await?;
        return Ok(EnforcementOutcome::Warned {
            warnings: membership.payment_warnings,
        });
    }

    match refund_and_deactivate_in(&txn, &membership).await {
        Ok(outcome) => {
            txn.commit().await?;
            Ok(EnforcementOutcome::Deactivated {
                refunded: outcome.refunded,
            })
        }
        Err(Error::InsufficientPoolBalance {
            available,
            required,
        }) => {
            // Keep the warning; removal is retried on the next missed cycle
            txn.commit().await?;
            warn!(
                "Could not remove {} from {}: pool holds {} of {} owed",
                membership.user_id, circle.name, available, required
            );
            Ok(EnforcementOutcome::RefundBlocked {
                warnings: membership.payment_warnings,
            })
        }
        Err(e) => {
            txn.rollback().await?;
            Err(e)
        }
    }
}

/// Runs the enforcement sweep at time `now`.
///
/// Only fails if the list of memberships cannot be loaded.
pub async fn run_enforcement_sweep_at(
    engine: &SettlementEngine,
    now: DateTime<Utc>,
) -> Result<SweepReport> {
    let memberships = list_active_memberships(engine.db()).await?;
    let mut report = SweepReport::new(now);

    for membership in memberships {
        report.processed += 1;
        match enforce_membership(engine, membership.id, now).await {
            Ok(outcome) => report.record(&outcome),
            Err(e) => {
                report.failed += 1;
                error!(
                    "Enforcement failed for membership {} ({} in circle {}): {}",
                    membership.id, membership.user_id, membership.circle_id, e
                );
            }
        }
    }

    Ok(report)
}

/// Runs the enforcement sweep now.
pub async fn run_enforcement_sweep(engine: &SettlementEngine) -> Result<SweepReport> {
    run_enforcement_sweep_at(engine, Utc::now()).await
}

/// Formats a sweep report into a one-paragraph summary for logs.
#[must_use]
pub fn format_sweep_summary(report: &SweepReport) -> String {
    format!(
        "Enforcement sweep at {} - processed {} memberships: {} contributed, {} warned, \
         {} removed, {} removals blocked, {} not due, {} skipped, {} failed",
        report.swept_at.format("%Y-%m-%d %H:%M:%S UTC"),
        report.processed,
        report.contributed,
        report.warned,
        report.deactivated,
        report.refund_blocked,
        report.not_due,
        report.skipped,
        report.failed
    )
}
