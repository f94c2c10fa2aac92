//! Wallet entity - Per-user store of value.
//!
//! Each user owns at most one wallet. The balance is kept in integer cents and
//! only ever changes through the guarded debit/credit helpers in `core::ledger`.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Wallet database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    /// Unique identifier for the wallet
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner of the wallet (one wallet per user)
    #[sea_orm(unique)]
    pub user_id: String,
    /// Current balance in cents, never negative
    pub balance_cents: i64,
    /// When the wallet was created
    pub created_at: DateTimeUtc,
    /// When the balance last changed
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Current balance as a two-digit decimal.
    #[must_use]
    pub fn balance(&self) -> Decimal {
        crate::core::money::from_cents(self.balance_cents)
    }
}

/// Defines relationships between Wallet and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One wallet has many transactions
    #[sea_orm(has_many = "super::wallet_transaction::Entity")]
    Transactions,
}

impl Related<super::wallet_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
