/// Database configuration and connection management
pub mod database;

/// Settlement rules loaded from config.toml
pub mod settlement;

pub use settlement::{ClaimRules, ContributionRules, SchedulerConfig, SettlementConfig};
