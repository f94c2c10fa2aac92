//! Claim entity - A member's request to withdraw from the circle pool.
//!
//! `status` is `"pending"` until adjudication sets it once to `"approved"` or
//! `"rejected"`, together with `processed_at`.
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Claim database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "claims")]
pub struct Model {
    /// Unique identifier for the claim
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Claimant
    pub user_id: String,
    /// Circle whose pool is claimed against
    pub circle_id: i64,
    /// Requested amount in cents
    pub amount_cents: i64,
    /// Claimant's stated reason
    pub reason: String,
    /// `"pending"`, `"approved"` or `"rejected"`
    pub status: String,
    /// Optional receipt image
    pub receipt: Option<Vec<u8>>,
    /// Why the claim ended in its terminal state
    pub decision_reason: Option<String>,
    /// When the claim was filed
    pub created_at: DateTimeUtc,
    /// When the claim reached a terminal state
    pub processed_at: Option<DateTimeUtc>,
}

impl Model {
    /// Amount as a two-digit decimal.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        crate::core::money::from_cents(self.amount_cents)
    }
}

/// Defines relationships between Claim and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each claim belongs to one circle
    #[sea_orm(
        belongs_to = "super::circle::Entity",
        from = "Column::CircleId",
        to = "super::circle::Column::Id"
    )]
    Circle,
}

impl Related<super::circle::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Circle.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
