//! Circle entity - A savings circle and its pooled balance.
//!
//! The pool lives on the circle row itself (`balance_cents`). Contribution
//! amount and cadence are fixed at creation.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Circle database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "circles")]
pub struct Model {
    /// Unique identifier for the circle
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// User who created the circle
    pub creator_id: String,
    /// Amount every member pays per cycle, in cents
    pub contribution_amount_cents: i64,
    /// `"daily"`, `"weekly"` or `"monthly"`
    pub frequency: String,
    /// Pool balance in cents
    pub balance_cents: i64,
    /// Days a new member must wait before filing claims
    pub claim_lock_period_days: i32,
    /// Pool level under which outflows log a warning, in cents
    pub min_balance_alert_cents: i64,
    /// When the circle was created
    pub created_at: DateTimeUtc,
    /// When the circle (usually its pool) last changed
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Pool balance as a two-digit decimal.
    #[must_use]
    pub fn balance(&self) -> Decimal {
        crate::core::money::from_cents(self.balance_cents)
    }

    /// Per-cycle contribution as a two-digit decimal.
    #[must_use]
    pub fn contribution_amount(&self) -> Decimal {
        crate::core::money::from_cents(self.contribution_amount_cents)
    }

    /// Low-balance alert threshold as a two-digit decimal.
    #[must_use]
    pub fn min_balance_alert(&self) -> Decimal {
        crate::core::money::from_cents(self.min_balance_alert_cents)
    }
}

/// Defines relationships between Circle and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One circle has many memberships
    #[sea_orm(has_many = "super::membership::Entity")]
    Memberships,
    /// One circle has many contributions
    #[sea_orm(has_many = "super::contribution::Entity")]
    Contributions,
    /// One circle has many claims
    #[sea_orm(has_many = "super::claim::Entity")]
    Claims,
}

impl Related<super::membership::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl Related<super::contribution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contributions.def()
    }
}

impl Related<super::claim::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Claims.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
