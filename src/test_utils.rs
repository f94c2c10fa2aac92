//! Shared test utilities for the settlement engine.
//!
//! Every helper works against a fresh in-memory `SQLite` database, so tests are
//! isolated from each other. Helpers that bypass the engine (`set_pool_balance`,
//! `insert_contribution`, the back-dating functions) exist to set up states that
//! the public operations cannot reach directly.

use crate::{
    config::SettlementConfig,
    core::{
        circle::{NewCircle, create_circle, join_circle},
        engine::SettlementEngine,
        membership::Frequency,
        money::to_cents,
        oracle::{ClaimContext, FraudOracle, Verdict},
        wallet::{get_wallet, top_up},
    },
    entities::{Circle, Claim, circle, claim, contribution, membership, wallet},
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, Set, prelude::*, sea_query::Expr};
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Routes `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// Engine over a fresh database with the default rules and no oracle.
pub async fn setup_engine() -> Result<SettlementEngine> {
    setup_engine_with_config(SettlementConfig::default()).await
}

/// Engine over a fresh database with custom rules.
pub async fn setup_engine_with_config(config: SettlementConfig) -> Result<SettlementEngine> {
    let db = setup_test_db().await?;
    Ok(SettlementEngine::new(db, config))
}

/// Engine over a fresh database with the given fraud oracle.
pub async fn engine_with_oracle(oracle: Arc<dyn FraudOracle>) -> Result<SettlementEngine> {
    Ok(setup_engine().await?.with_oracle(oracle))
}

/// Tops up a wallet (creating it if needed) and returns it.
pub async fn fund_wallet(
    engine: &SettlementEngine,
    user_id: &str,
    amount: Decimal,
) -> Result<wallet::Model> {
    top_up(engine, user_id, amount, None).await
}

/// Creates a weekly circle named "Test Circle" with no claim lock period.
pub async fn create_test_circle(
    engine: &SettlementEngine,
    creator_id: &str,
    contribution_amount: Decimal,
) -> Result<circle::Model> {
    create_circle(
        engine.db(),
        NewCircle {
            creator_id: creator_id.to_string(),
            name: "Test Circle".to_string(),
            description: "Circle used in tests".to_string(),
            contribution_amount,
            frequency: Frequency::Weekly,
            claim_lock_period_days: 0,
            min_balance_alert: None,
        },
    )
    .await
}

/// Adds a member to a circle.
pub async fn join(
    engine: &SettlementEngine,
    user_id: &str,
    circle_id: i64,
) -> Result<membership::Model> {
    join_circle(engine.db(), user_id, circle_id).await
}

/// Re-reads a wallet from the database.
pub async fn reload_wallet(db: &DatabaseConnection, user_id: &str) -> Result<wallet::Model> {
    get_wallet(db, user_id).await
}

/// Re-reads a circle from the database.
pub async fn reload_circle(db: &DatabaseConnection, circle_id: i64) -> Result<circle::Model> {
    crate::core::circle::get_circle(db, circle_id).await
}

/// Overwrites a pool balance without touching any other record.
pub async fn set_pool_balance(
    db: &DatabaseConnection,
    circle_id: i64,
    balance: Decimal,
) -> Result<()> {
    Circle::update_many()
        .col_expr(circle::Column::BalanceCents, Expr::value(to_cents(balance)?))
        .filter(circle::Column::Id.eq(circle_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Moves a membership's join date `days` into the past.
pub async fn backdate_membership(
    db: &DatabaseConnection,
    membership_id: i64,
    days: i64,
) -> Result<membership::Model> {
    let current = crate::core::membership::get_membership(db, membership_id).await?;
    let mut active: membership::ActiveModel = current.clone().into();
    active.join_date = Set(current.join_date - TimeDelta::days(days));
    active.update(db).await.map_err(Into::into)
}

/// Moves every claim of a user `days` into the past.
pub async fn backdate_claims(db: &DatabaseConnection, user_id: &str, days: i64) -> Result<()> {
    let claims = Claim::find()
        .filter(claim::Column::UserId.eq(user_id))
        .all(db)
        .await?;
    for existing in claims {
        let created_at = existing.created_at - TimeDelta::days(days);
        let mut active: claim::ActiveModel = existing.into();
        active.created_at = Set(created_at);
        active.update(db).await?;
    }
    Ok(())
}

/// Records a contribution without moving any money.
pub async fn insert_contribution(
    db: &DatabaseConnection,
    user_id: &str,
    circle_id: i64,
    amount: Decimal,
) -> Result<contribution::Model> {
    let record = contribution::ActiveModel {
        user_id: Set(user_id.to_string()),
        circle_id: Set(circle_id),
        amount_cents: Set(to_cents(amount)?),
        timestamp: Set(Utc::now()),
        is_automatic: Set(false),
        refunded: Set(false),
        ..Default::default()
    };
    record.insert(db).await.map_err(Into::into)
}

/// Inserts a pending claim that skipped eligibility and adjudication.
pub async fn insert_pending_claim(
    db: &DatabaseConnection,
    user_id: &str,
    circle_id: i64,
    amount: Decimal,
) -> Result<claim::Model> {
    let pending = claim::ActiveModel {
        user_id: Set(user_id.to_string()),
        circle_id: Set(circle_id),
        amount_cents: Set(to_cents(amount)?),
        reason: Set("Pending test claim".to_string()),
        status: Set("pending".to_string()),
        receipt: Set(None),
        decision_reason: Set(None),
        created_at: Set(Utc::now()),
        processed_at: Set(None),
        ..Default::default()
    };
    pending.insert(db).await.map_err(Into::into)
}

/// Oracle that always returns the same verdict and counts its calls.
#[derive(Debug)]
pub struct StubOracle {
    verdict: Verdict,
    calls: AtomicUsize,
}

impl StubOracle {
    /// Oracle answering every claim with `verdict`.
    pub const fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of claims judged so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FraudOracle for StubOracle {
    async fn judge(&self, _claim: &ClaimContext) -> Result<Verdict> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.verdict.clone())
    }
}

/// Oracle whose every call fails.
#[derive(Debug, Clone, Copy)]
pub struct FailingOracle;

#[async_trait]
impl FraudOracle for FailingOracle {
    async fn judge(&self, _claim: &ClaimContext) -> Result<Verdict> {
        Err(Error::Oracle {
            message: "service unavailable".to_string(),
        })
    }
}

/// Oracle that approves, but only after a delay.
#[derive(Debug, Clone, Copy)]
pub struct SlowOracle {
    delay: Duration,
}

impl SlowOracle {
    /// Oracle that sleeps for `delay` before answering.
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl FraudOracle for SlowOracle {
    async fn judge(&self, _claim: &ClaimContext) -> Result<Verdict> {
        tokio::time::sleep(self.delay).await;
        Ok(Verdict::approve("Approved eventually"))
    }
}
