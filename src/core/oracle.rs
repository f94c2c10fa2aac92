//! Fraud oracle contract.
//!
//! The oracle is an external judge (an AI service in production) that looks at
//! a pending claim and returns a verdict. The engine never holds account locks
//! while waiting on it, and any oracle failure is turned into a rejection by the
//! claim engine rather than propagated.

use crate::{
    core::risk::RiskProfile,
    errors::{Error, Result},
};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Reason recorded when a receipt was supplied but the oracle could not match
/// its amount to the claim.
pub const RECEIPT_MISMATCH_REASON: &str = "receipt amount mismatch";

/// Everything the oracle sees about a claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimContext {
    /// Claim being judged
    pub claim_id: i64,
    /// Requested amount
    pub amount: Decimal,
    /// Claimant's stated reason
    pub reason: String,
    /// Claimant's health-risk context
    pub risk: RiskProfile,
    /// Receipt image, if one was attached
    pub receipt: Option<Vec<u8>>,
}

/// The oracle's judgment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the claim looks legitimate
    pub valid: bool,
    /// Explanation for the verdict
    pub reason: String,
    /// Whether the receipt amount matches the claim; only meaningful with a receipt
    pub amount_match: Option<bool>,
}

impl Verdict {
    /// A positive verdict.
    #[must_use]
    pub fn approve(reason: impl Into<String>) -> Self {
        Self {
            valid: true,
            reason: reason.into(),
            amount_match: None,
        }
    }

    /// A negative verdict.
    #[must_use]
    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: reason.into(),
            amount_match: None,
        }
    }

    /// Sets the receipt amount check.
    #[must_use]
    pub fn with_amount_match(mut self, amount_match: bool) -> Self {
        self.amount_match = Some(amount_match);
        self
    }

    /// Turns the verdict into a decision: `Ok(approval note)` or
    /// `Err(rejection reason)`.
    ///
    /// A receipt that the oracle did not positively match counts as a rejection.
    pub fn decide(&self, receipt_supplied: bool) -> std::result::Result<String, String> {
        if !self.valid {
            return Err(if self.reason.trim().is_empty() {
                "AI rejection".to_string()
            } else {
                self.reason.clone()
            });
        }
        if receipt_supplied && self.amount_match != Some(true) {
            return Err(RECEIPT_MISMATCH_REASON.to_string());
        }
        Ok(if self.reason.trim().is_empty() {
            "Approved".to_string()
        } else {
            self.reason.clone()
        })
    }
}

/// External claim judge.
#[async_trait]
pub trait FraudOracle: Send + Sync {
    /// Judges a pending claim. May fail or take arbitrarily long.
    async fn judge(&self, claim: &ClaimContext) -> Result<Verdict>;
}

/// Placeholder used until a real oracle is wired in: fails every call, so
/// every claim is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredOracle;

#[async_trait]
impl FraudOracle for UnconfiguredOracle {
    async fn judge(&self, _claim: &ClaimContext) -> Result<Verdict> {
        Err(Error::Oracle {
            message: "no fraud oracle configured".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide_rejection_keeps_oracle_reason() {
        let verdict = Verdict::reject("treatment not covered");
        assert_eq!(
            verdict.decide(false),
            Err("treatment not covered".to_string())
        );
        assert_eq!(
            Verdict::reject("").decide(false),
            Err("AI rejection".to_string())
        );
    }

    #[test]
    fn test_decide_requires_receipt_match() {
        let approved = Verdict::approve("looks fine");
        assert_eq!(approved.decide(false), Ok("looks fine".to_string()));
        assert_eq!(
            approved.decide(true),
            Err(RECEIPT_MISMATCH_REASON.to_string())
        );
        assert_eq!(
            approved.clone().with_amount_match(false).decide(true),
            Err(RECEIPT_MISMATCH_REASON.to_string())
        );
        assert_eq!(
            approved.with_amount_match(true).decide(true),
            Ok("looks fine".to_string())
        );
    }

    #[tokio::test]
    async fn test_unconfigured_oracle_fails() {
        let context = ClaimContext {
            claim_id: 1,
            amount: Decimal::ONE,
            reason: "checkup".to_string(),
            risk: RiskProfile::default(),
            receipt: None,
        };
        assert!(matches!(
            UnconfiguredOracle.judge(&context).await,
            Err(Error::Oracle { .. })
        ));
    }
}
