//! Settlement engine context.
//!
//! Bundles the database connection with everything a settlement needs: the
//! rules, the account locks and the two external collaborators. Cloning is
//! cheap and every clone shares the same locks.

use crate::{
    config::SettlementConfig,
    core::{
        ledger::AccountLocks,
        oracle::{FraudOracle, UnconfiguredOracle},
        risk::{RiskProvider, StaticRiskProvider},
    },
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Shared context passed to every settlement operation.
#[derive(Clone)]
pub struct SettlementEngine {
    database: Arc<DatabaseConnection>,
    config: Arc<SettlementConfig>,
    locks: Arc<AccountLocks>,
    oracle: Arc<dyn FraudOracle>,
    risk: Arc<dyn RiskProvider>,
}

impl SettlementEngine {
    /// Creates an engine with no fraud oracle (claims are rejected) and every
    /// member classified as low risk.
    #[must_use]
    pub fn new(database: DatabaseConnection, config: SettlementConfig) -> Self {
        Self {
            database: Arc::new(database),
            config: Arc::new(config),
            locks: Arc::new(AccountLocks::new()),
            oracle: Arc::new(UnconfiguredOracle),
            risk: Arc::new(StaticRiskProvider::new()),
        }
    }

    /// Replaces the fraud oracle.
    #[must_use]
    pub fn with_oracle(mut self, oracle: Arc<dyn FraudOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    /// Replaces the risk provider.
    #[must_use]
    pub fn with_risk_provider(mut self, risk: Arc<dyn RiskProvider>) -> Self {
        self.risk = risk;
        self
    }

    /// Database connection
    #[must_use]
    pub fn db(&self) -> &DatabaseConnection {
        &self.database
    }

    /// Settlement rules
    #[must_use]
    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    /// Per-account locks
    #[must_use]
    pub fn locks(&self) -> &AccountLocks {
        &self.locks
    }

    /// Fraud oracle
    #[must_use]
    pub fn oracle(&self) -> &dyn FraudOracle {
        self.oracle.as_ref()
    }

    /// Risk provider
    #[must_use]
    pub fn risk(&self) -> &dyn RiskProvider {
        self.risk.as_ref()
    }
}

impl std::fmt::Debug for SettlementEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettlementEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
