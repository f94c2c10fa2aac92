//! Claim adjudication - eligibility checks, fraud oracle and payout.
//!
//! Filing runs every eligibility check before anything is written, so a claim
//! that fails a precondition leaves no trace. Once the claim row exists it is
//! driven to a terminal state in a single pass: the oracle is consulted with no
//! locks held, then an approved claim is paid out under the claimant's wallet
//! and circle pool locks. Every failure after the row exists ends with the
//! claim `rejected`; it is never left `pending`.
//!
//! Eligibility checks and the insert of the `pending` row run under a
//! per-claimant lock, so concurrent filings by one member see each other for
//! the rate limit and duplicate detection.
//!
//! Status transitions are guarded updates (`WHERE status = 'pending'`), so two
//! racing adjudications cannot both settle the same claim.

use crate::{
    core::{
        circle::get_circle,
        contribution::total_unrefunded_cents,
        engine::SettlementEngine,
        ledger,
        membership::get_active_membership,
        money::{from_cents, to_cents},
        oracle::ClaimContext,
        risk::{RiskLevel, RiskProfile},
        wallet::{TransactionType, get_wallet, record_transaction},
    },
    entities::{Claim, claim},
    errors::{Error, Result},
};
use chrono::{TimeDelta, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use std::str::FromStr;
use tracing::{error, info, instrument, warn};

/// Lifecycle of a claim. `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimStatus {
    /// Filed, awaiting adjudication
    Pending,
    /// Paid out
    Approved,
    /// Refused; no funds moved
    Rejected,
}

impl ClaimStatus {
    /// Name stored in the `status` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl FromStr for ClaimStatus {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(Error::Validation {
                message: format!("Unknown claim status '{other}'"),
            }),
        }
    }
}

/// A member's request to be paid from a circle pool.
#[derive(Debug, Clone)]
pub struct ClaimRequest {
    /// Claimant
    pub user_id: String,
    /// Circle to claim against
    pub circle_id: i64,
    /// Requested amount
    pub amount: Decimal,
    /// Why the member is claiming
    pub reason: String,
    /// Optional receipt image
    pub receipt: Option<Vec<u8>>,
}

/// Finds a claim by id.
pub async fn get_claim<C>(db: &C, claim_id: i64) -> Result<claim::Model>
where
    C: ConnectionTrait,
{
    Claim::find_by_id(claim_id)
        .one(db)
        .await?
        .ok_or(Error::ClaimNotFound { claim_id })
}

/// Lists every claim against a circle, newest first.
pub async fn list_claims_for_circle(
    db: &DatabaseConnection,
    circle_id: i64,
) -> Result<Vec<claim::Model>> {
    Claim::find()
        .filter(claim::Column::CircleId.eq(circle_id))
        .order_by_desc(claim::Column::CreatedAt)
        .order_by_desc(claim::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists every claim a user has filed, newest first.
pub async fn list_claims_for_user(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<claim::Model>> {
    Claim::find()
        .filter(claim::Column::UserId.eq(user_id))
        .order_by_desc(claim::Column::CreatedAt)
        .order_by_desc(claim::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Runs every eligibility rule. Returns the claimant's risk profile so the
/// oracle can see it.
async fn check_eligibility(
    engine: &SettlementEngine,
    request: &ClaimRequest,
    reason: &str,
    cents: i64,
) -> Result<RiskProfile> {
    let db = engine.db();
    let rules = &engine.config().claims;
    let now = Utc::now();

    let circle = get_circle(db, request.circle_id).await?;
    let membership = get_active_membership(db, &request.user_id, request.circle_id).await?;

    let lock_period_days = i64::from(circle.claim_lock_period_days);
    let days_member = (now - membership.join_date).num_days();
    if days_member < lock_period_days {
        return Err(Error::ClaimLockActive {
            lock_period_days,
            days_remaining: lock_period_days - days_member,
        });
    }

    if request.amount > rules.max_claim_amount {
        return Err(Error::AmountExceedsLimit {
            amount: request.amount,
            limit: rules.max_claim_amount,
        });
    }

    let risk = engine.risk().risk_profile(&request.user_id).await?;
    if risk.level == RiskLevel::High && request.amount > rules.high_risk_claim_limit {
        return Err(Error::RiskLimitExceeded {
            amount: request.amount,
            limit: rules.high_risk_claim_limit,
        });
    }

    let rate_window_start = now - TimeDelta::days(rules.rate_window_days);
    let recent = Claim::find()
        .filter(claim::Column::UserId.eq(request.user_id.as_str()))
        .filter(claim::Column::CreatedAt.gte(rate_window_start))
        .count(db)
        .await?;
    if recent > rules.max_recent_claims {
        return Err(Error::ClaimRateExceeded {
            recent,
            window_days: rules.rate_window_days,
        });
    }

    let duplicate_window_start = now - TimeDelta::days(rules.duplicate_window_days);
    let same_amount = Claim::find()
        .filter(claim::Column::UserId.eq(request.user_id.as_str()))
        .filter(claim::Column::AmountCents.eq(cents))
        .filter(claim::Column::CreatedAt.gte(duplicate_window_start))
        .all(db)
        .await?;
    let reason_key = reason.to_lowercase();
    if same_amount
        .iter()
        .any(|c| c.reason.trim().to_lowercase() == reason_key)
    {
        return Err(Error::DuplicateClaim);
    }

    let contributed = from_cents(total_unrefunded_cents(db, &request.user_id, request.circle_id).await?);
    let required = (request.amount * rules.min_contribution_ratio)
        .round_dp_with_strategy(2, RoundingStrategy::AwayFromZero);
    if contributed < required {
        return Err(Error::InsufficientContributionHistory {
            contributed,
            required,
        });
    }

    Ok(risk)
}

/// Files a claim and adjudicates it.
///
/// Returns the approved claim. A rejection by the oracle (or a failed oracle
/// call) surfaces as `ClaimRejected`; the stored claim then carries the reason.
#[instrument(skip(engine, request), fields(user = %request.user_id, circle = request.circle_id, amount = %request.amount))]
pub async fn file_claim(engine: &SettlementEngine, request: ClaimRequest) -> Result<claim::Model> {
    let cents = to_cents(request.amount)?;
    let reason = request.reason.trim().to_string();
    if reason.is_empty() {
        return Err(Error::Validation {
            message: "Claim reason cannot be empty".to_string(),
        });
    }

    // Checks and insert form one step per claimant; released before the oracle call
    let claimant_guard = engine.locks().lock_claimant(&request.user_id).await;
    let risk = check_eligibility(engine, &request, &reason, cents).await?;

    let claim = claim::ActiveModel {
        user_id: Set(request.user_id),
        circle_id: Set(request.circle_id),
        amount_cents: Set(cents),
        reason: Set(reason),
        status: Set(ClaimStatus::Pending.as_str().to_string()),
        receipt: Set(request.receipt),
        decision_reason: Set(None),
        created_at: Set(Utc::now()),
        processed_at: Set(None),
        ..Default::default()
    };
    let claim = claim.insert(engine.db()).await?;
    drop(claimant_guard);
    info!("Filed claim {} for {}", claim.id, claim.amount());

    adjudicate(engine, &claim, risk).await
}

/// Adjudicates a claim that is still pending.
///
/// Fails with `ClaimAlreadyProcessed` if the claim is already terminal.
#[instrument(skip(engine))]
pub async fn process_claim(engine: &SettlementEngine, claim_id: i64) -> Result<claim::Model> {
    let claim = get_claim(engine.db(), claim_id).await?;
    if claim.status != ClaimStatus::Pending.as_str() {
        return Err(Error::ClaimAlreadyProcessed {
            claim_id,
            status: claim.status,
        });
    }

    let risk = match engine.risk().risk_profile(&claim.user_id).await {
        Ok(risk) => risk,
        Err(e) => return Err(fail_claim(engine.db(), claim.id, e).await),
    };
    adjudicate(engine, &claim, risk).await
}

async fn adjudicate(
    engine: &SettlementEngine,
    claim: &claim::Model,
    risk: RiskProfile,
) -> Result<claim::Model> {
    let context = ClaimContext {
        claim_id: claim.id,
        amount: claim.amount(),
        reason: claim.reason.clone(),
        risk,
        receipt: claim.receipt.clone(),
    };

    let timeout = engine.config().claims.oracle_timeout();
    let verdict = match tokio::time::timeout(timeout, engine.oracle().judge(&context)).await {
        Ok(Ok(verdict)) => verdict,
        Ok(Err(e)) => {
            warn!("Fraud oracle failed for claim {}: {}", claim.id, e);
            let reason = format!("Fraud check failed: {e}");
            return Err(reject(engine.db(), claim.id, reason).await);
        }
        Err(_) => {
            warn!("Fraud oracle timed out for claim {}", claim.id);
            let reason = format!("Fraud check timed out after {}s", timeout.as_secs());
            return Err(reject(engine.db(), claim.id, reason).await);
        }
    };

    match verdict.decide(claim.receipt.is_some()) {
        Ok(note) => settle_claim(engine, claim, &note).await,
        Err(reason) => {
            info!("Claim {} rejected: {}", claim.id, reason);
            Err(reject(engine.db(), claim.id, reason).await)
        }
    }
}

/// Pays an approved claim out of the pool.
async fn settle_claim(
    engine: &SettlementEngine,
    claim: &claim::Model,
    note: &str,
) -> Result<claim::Model> {
    let guard = engine
        .locks()
        .lock_settlement(&claim.user_id, claim.circle_id)
        .await;
    let result = pay_out_in_transaction(engine.db(), claim, note).await;
    drop(guard);

    match result {
        Ok(paid) => {
            info!(
                "Paid {} from circle {} to {} for claim {}",
                paid.amount(),
                paid.circle_id,
                paid.user_id,
                paid.id
            );
            Ok(paid)
        }
        // Someone else finished it; the claim is already terminal
        Err(e @ Error::ClaimAlreadyProcessed { .. }) => Err(e),
        Err(e) => Err(fail_claim(engine.db(), claim.id, e).await),
    }
}

async fn pay_out_in_transaction(
    db: &DatabaseConnection,
    claim: &claim::Model,
    note: &str,
) -> Result<claim::Model> {
    let txn = db.begin().await?;
    match pay_out(&txn, claim, note).await {
        Ok(paid) => {
            txn.commit().await?;
            Ok(paid)
        }
        Err(e) => {
            if let Err(rollback) = txn.rollback().await {
                error!("Rollback failed for claim {}: {}", claim.id, rollback);
            }
            Err(e)
        }
    }
}

async fn pay_out<C>(db: &C, claim: &claim::Model, note: &str) -> Result<claim::Model>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let result = Claim::update_many()
        .col_expr(
            claim::Column::Status,
            Expr::value(ClaimStatus::Approved.as_str()),
        )
        .col_expr(claim::Column::DecisionReason, Expr::value(note))
        .col_expr(claim::Column::ProcessedAt, Expr::value(now))
        .filter(claim::Column::Id.eq(claim.id))
        .filter(claim::Column::Status.eq(ClaimStatus::Pending.as_str()))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        let current = get_claim(db, claim.id).await?;
        return Err(Error::ClaimAlreadyProcessed {
            claim_id: claim.id,
            status: current.status,
        });
    }

    // The pool may have shrunk since the claim was filed
    let circle = get_circle(db, claim.circle_id).await?;
    if circle.balance_cents < claim.amount_cents {
        return Err(Error::InsufficientPoolBalance {
            available: circle.balance(),
            required: claim.amount(),
        });
    }

    let wallet = get_wallet(db, &claim.user_id).await?;
    ledger::transfer_pool_to_wallet(db, &circle, &wallet, claim.amount_cents).await?;
    record_transaction(
        db,
        wallet.id,
        claim.amount_cents,
        TransactionType::Topup,
        format!("Payout from {} for claim #{}", circle.name, claim.id),
    )
    .await?;

    get_claim(db, claim.id).await
}

/// Moves a pending claim to `rejected`. Returns `false` if it was already
/// terminal.
pub async fn finalize_rejected<C>(db: &C, claim_id: i64, reason: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = Claim::update_many()
        .col_expr(
            claim::Column::Status,
            Expr::value(ClaimStatus::Rejected.as_str()),
        )
        .col_expr(claim::Column::DecisionReason, Expr::value(reason))
        .col_expr(claim::Column::ProcessedAt, Expr::value(Utc::now()))
        .filter(claim::Column::Id.eq(claim_id))
        .filter(claim::Column::Status.eq(ClaimStatus::Pending.as_str()))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Rejects a claim on the oracle's say-so.
///
/// If a concurrent adjudication already finished the claim, its outcome wins.
async fn reject(db: &DatabaseConnection, claim_id: i64, reason: String) -> Error {
    match finalize_rejected(db, claim_id, &reason).await {
        Ok(true) => Error::ClaimRejected { reason },
        Ok(false) => match get_claim(db, claim_id).await {
            Ok(current) => Error::ClaimAlreadyProcessed {
                claim_id,
                status: current.status,
            },
            Err(e) => e,
        },
        Err(e) => {
            error!("Could not reject claim {}: {}", claim_id, e);
            e
        }
    }
}

/// Rejects a claim after a settlement failure and hands back the original error.
async fn fail_claim(db: &DatabaseConnection, claim_id: i64, cause: Error) -> Error {
    warn!("Claim {} failed: {}", claim_id, cause);
    if let Err(e) = finalize_rejected(db, claim_id, &cause.to_string()).await {
        error!("Could not reject claim {}: {}", claim_id, e);
    }
    cause
}
