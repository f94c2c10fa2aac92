//! Unified error types for the settlement engine.
//!
//! Every rejection carries enough context to render a human-readable reason, so
//! callers can surface the `Display` output directly to members.

use rust_decimal::Decimal;
use thiserror::Error;

/// All errors produced by the circle ledger.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Input rejected before touching any account
    #[error("Invalid input: {message}")]
    Validation {
        /// What went wrong
        message: String,
    },

    /// Amount is zero, negative or finer than one cent
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: Decimal,
    },

    /// A debit would take an account below zero
    #[error("Insufficient funds: available {available}, required {required}")]
    InsufficientFunds {
        /// Balance at the time of the debit
        available: Decimal,
        /// Amount that was requested
        required: Decimal,
    },

    /// The user has no wallet
    #[error("Wallet not found for user {user_id}")]
    WalletNotFound {
        /// Owner of the missing wallet
        user_id: String,
    },

    /// No circle with this id
    #[error("Circle {circle_id} not found")]
    CircleNotFound {
        /// Requested circle id
        circle_id: i64,
    },

    /// No membership with this id
    #[error("Membership {membership_id} not found")]
    MembershipNotFound {
        /// Requested membership id
        membership_id: i64,
    },

    /// No claim with this id
    #[error("Claim {claim_id} not found")]
    ClaimNotFound {
        /// Requested claim id
        claim_id: i64,
    },

    /// User already has a membership (active or not) in the circle
    #[error("User {user_id} is already a member of circle {circle_id}")]
    AlreadyMember {
        /// The joining user
        user_id: String,
        /// The circle
        circle_id: i64,
    },

    /// User holds no active membership in the circle
    #[error("User {user_id} is not an active member of circle {circle_id}")]
    NotAMember {
        /// The caller
        user_id: String,
        /// The circle
        circle_id: i64,
    },

    /// Member joined too recently to file claims
    #[error("You cannot file claims within {lock_period_days} days of joining ({days_remaining} days remaining)")]
    ClaimLockActive {
        /// Circle's lock period
        lock_period_days: i64,
        /// Days until claims are allowed
        days_remaining: i64,
    },

    /// Claim is above the platform ceiling
    #[error("Claim of {amount} exceeds maximum allowed amount ({limit})")]
    AmountExceedsLimit {
        /// Requested amount
        amount: Decimal,
        /// Platform ceiling
        limit: Decimal,
    },

    /// Claim is above the limit for the member's risk class
    #[error("High-risk members are limited to claims of {limit} (requested {amount})")]
    RiskLimitExceeded {
        /// Requested amount
        amount: Decimal,
        /// Risk-class ceiling
        limit: Decimal,
    },

    /// Too many claims in the trailing window
    #[error("Too many claims: {recent} filed in the last {window_days} days")]
    ClaimRateExceeded {
        /// Claims already filed in the window
        recent: u64,
        /// Window length
        window_days: i64,
    },

    /// Same reason and amount filed recently
    #[error("Possible duplicate claim detected")]
    DuplicateClaim,

    /// Member has not paid in enough to claim this amount
    #[error("Insufficient contributions. You've contributed {contributed} but at least {required} is needed to claim this amount")]
    InsufficientContributionHistory {
        /// Non-refunded contributions to the circle
        contributed: Decimal,
        /// Minimum required for the requested amount
        required: Decimal,
    },

    /// The fraud oracle (or a receipt check) rejected the claim
    #[error("Claim rejected: {reason}")]
    ClaimRejected {
        /// Reason given for the rejection
        reason: String,
    },

    /// The fraud oracle failed to produce a verdict
    #[error("Fraud oracle error: {message}")]
    Oracle {
        /// What went wrong
        message: String,
    },

    /// The circle pool cannot cover a payout
    #[error("Insufficient circle balance: available {available}, required {required}")]
    InsufficientPoolBalance {
        /// Pool balance at the time of the check
        available: Decimal,
        /// Amount that was requested
        required: Decimal,
    },

    /// Claim already reached a terminal state
    #[error("Claim {claim_id} has already been processed ({status})")]
    ClaimAlreadyProcessed {
        /// The claim
        claim_id: i64,
        /// Its terminal status
        status: String,
    },

    /// I/O failure (config files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
