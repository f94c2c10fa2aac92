//! Wallet transaction entity - Audit trail of value entering or leaving a wallet.
//!
//! `transaction_type` is `"topup"` for credits (top-ups, claim payouts, refunds)
//! and `"withdrawal"` for debits (withdrawals, contributions).
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Wallet transaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wallet_transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the wallet this transaction belongs to
    pub wallet_id: i64,
    /// Amount moved, in cents (always positive; direction comes from the type)
    pub amount_cents: i64,
    /// `"topup"` or `"withdrawal"`
    pub transaction_type: String,
    /// Human-readable description
    pub description: String,
    /// When the transaction was recorded
    pub timestamp: DateTimeUtc,
}

impl Model {
    /// Amount as a two-digit decimal.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        crate::core::money::from_cents(self.amount_cents)
    }
}

/// Defines relationships between `WalletTransaction` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each transaction belongs to one wallet
    #[sea_orm(
        belongs_to = "super::wallet::Entity",
        from = "Column::WalletId",
        to = "super::wallet::Column::Id"
    )]
    Wallet,
}

impl Related<super::wallet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
