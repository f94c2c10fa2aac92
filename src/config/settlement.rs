//! Settlement rules loaded from config.toml
//!
//! Every field has a default, so a partial (or missing) file is fine. The
//! defaults are the platform rules: two missed cycles remove a member, claims
//! are capped at 5000 (2000 for high-risk members), at most two other claims in
//! 30 days, no identical claim within 7 days and at least half the claim
//! already contributed.

use crate::errors::{Error, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::{path::Path, time::Duration};
use tracing::{debug, info};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "CIRCLE_LEDGER_CONFIG";

/// Complete settlement configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(default)]
pub struct SettlementConfig {
    /// Contribution cadence enforcement
    pub contributions: ContributionRules,
    /// Claim eligibility limits
    pub claims: ClaimRules,
    /// Enforcement sweep timing
    pub scheduler: SchedulerConfig,
}

/// Rules for contribution enforcement
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContributionRules {
    /// Missed cycles after which a member is refunded and removed
    pub warning_threshold: i32,
}

impl Default for ContributionRules {
    fn default() -> Self {
        Self {
            warning_threshold: 2,
        }
    }
}

/// Rules for claim eligibility
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClaimRules {
    /// Absolute ceiling for any claim
    pub max_claim_amount: Decimal,
    /// Ceiling for members classified as high risk
    pub high_risk_claim_limit: Decimal,
    /// Trailing window for the claim rate limit
    pub rate_window_days: i64,
    /// Other claims allowed inside the rate window
    pub max_recent_claims: u64,
    /// Trailing window for duplicate detection
    pub duplicate_window_days: i64,
    /// Fraction of the claim the member must already have contributed
    pub min_contribution_ratio: Decimal,
    /// Upper bound on a fraud oracle call
    pub oracle_timeout_secs: u64,
}

impl Default for ClaimRules {
    fn default() -> Self {
        Self {
            max_claim_amount: Decimal::new(5000, 0),
            high_risk_claim_limit: Decimal::new(2000, 0),
            rate_window_days: 30,
            max_recent_claims: 2,
            duplicate_window_days: 7,
            min_contribution_ratio: Decimal::new(5, 1),
            oracle_timeout_secs: 30,
        }
    }
}

impl ClaimRules {
    /// Oracle timeout as a `Duration`.
    #[must_use]
    pub const fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs)
    }
}

/// Timing for the periodic enforcement sweep
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between sweeps
    pub interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
        }
    }
}

impl SchedulerConfig {
    /// Sweep interval as a `Duration`.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Parses settlement configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<SettlementConfig> {
    let config: SettlementConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &SettlementConfig) -> Result<()> {
    if config.contributions.warning_threshold < 1 {
        return Err(Error::Config {
            message: "contributions.warning_threshold must be at least 1".to_string(),
        });
    }
    if config.claims.max_claim_amount <= Decimal::ZERO
        || config.claims.high_risk_claim_limit <= Decimal::ZERO
    {
        return Err(Error::Config {
            message: "claim limits must be positive".to_string(),
        });
    }
    if config.scheduler.interval_secs == 0 {
        return Err(Error::Config {
            message: "scheduler.interval_secs must be positive".to_string(),
        });
    }
    Ok(())
}

/// Loads settlement configuration from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read, the TOML is invalid or a rule
/// is out of range.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SettlementConfig> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;
    parse_config(&contents)
}

/// Loads configuration from `$CIRCLE_LEDGER_CONFIG` (default `./config.toml`).
///
/// A missing file yields the default rules.
pub fn load_default_config() -> Result<SettlementConfig> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.toml".to_string());
    if Path::new(&path).exists() {
        load_config(&path)
    } else {
        info!("No config file at {path}, using default settlement rules");
        Ok(SettlementConfig::default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let config = SettlementConfig::default();
        assert_eq!(config.contributions.warning_threshold, 2);
        assert_eq!(config.claims.max_claim_amount, dec!(5000));
        assert_eq!(config.claims.high_risk_claim_limit, dec!(2000));
        assert_eq!(config.claims.rate_window_days, 30);
        assert_eq!(config.claims.max_recent_claims, 2);
        assert_eq!(config.claims.duplicate_window_days, 7);
        assert_eq!(config.claims.min_contribution_ratio, dec!(0.5));
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
            [contributions]
            warning_threshold = 3

            [claims]
            max_claim_amount = "7500"
            oracle_timeout_secs = 5
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.contributions.warning_threshold, 3);
        assert_eq!(config.claims.max_claim_amount, dec!(7500));
        assert_eq!(config.claims.oracle_timeout(), Duration::from_secs(5));
        // Untouched sections keep their defaults
        assert_eq!(config.claims.high_risk_claim_limit, dec!(2000));
        assert_eq!(config.scheduler, SchedulerConfig::default());
    }

    #[test]
    fn test_parse_rejects_invalid_rules() {
        let result = parse_config("[contributions]\nwarning_threshold = 0\n");
        assert!(matches!(result, Err(Error::Config { .. })));

        let result = parse_config("[scheduler]\ninterval_secs = 0\n");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_parse_rejects_malformed_toml() {
        let result = parse_config("[claims\nmax_claim_amount = 1");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
