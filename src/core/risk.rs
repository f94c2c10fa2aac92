//! Risk classification - read-only view of a member's health risk.
//!
//! Scoring happens elsewhere; the engine only consumes the resulting level
//! (for claim limits) and the condition list (as context for the fraud oracle).

use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Risk classes assigned by the health-profile service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Default for members without a profile
    #[default]
    Low,
    /// Elevated risk
    Medium,
    /// High risk; subject to a lower claim ceiling
    High,
}

impl RiskLevel {
    /// Lowercase name used in logs and by the oracle.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Risk context for one member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskProfile {
    /// Assigned risk class
    pub level: RiskLevel,
    /// Declared health conditions
    #[serde(default)]
    pub conditions: Vec<String>,
}

impl RiskProfile {
    /// A profile with the given level and no declared conditions.
    #[must_use]
    pub const fn with_level(level: RiskLevel) -> Self {
        Self {
            level,
            conditions: Vec::new(),
        }
    }
}

/// Source of risk profiles.
#[async_trait]
pub trait RiskProvider: Send + Sync {
    /// Returns the risk profile for a user.
    async fn risk_profile(&self, user_id: &str) -> Result<RiskProfile>;
}

/// In-memory provider. Users without an entry are low risk.
#[derive(Debug, Clone, Default)]
pub struct StaticRiskProvider {
    profiles: HashMap<String, RiskProfile>,
}

impl StaticRiskProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the profile for a user.
    #[must_use]
    pub fn with_profile(mut self, user_id: impl Into<String>, profile: RiskProfile) -> Self {
        self.profiles.insert(user_id.into(), profile);
        self
    }
}

#[async_trait]
impl RiskProvider for StaticRiskProvider {
    async fn risk_profile(&self, user_id: &str) -> Result<RiskProfile> {
        Ok(self.profiles.get(user_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_provider_defaults_to_low() -> Result<()> {
        let provider = StaticRiskProvider::new().with_profile(
            "bob",
            RiskProfile {
                level: RiskLevel::High,
                conditions: vec!["asthma".to_string()],
            },
        );

        assert_eq!(provider.risk_profile("alice").await?.level, RiskLevel::Low);

        let bob = provider.risk_profile("bob").await?;
        assert_eq!(bob.level, RiskLevel::High);
        assert_eq!(bob.conditions, vec!["asthma".to_string()]);
        Ok(())
    }

    #[test]
    fn test_risk_level_names() {
        assert_eq!(RiskLevel::Low.as_str(), "low");
        assert_eq!(RiskLevel::Medium.as_str(), "medium");
        assert_eq!(RiskLevel::High.as_str(), "high");
    }
}
