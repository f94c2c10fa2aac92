//! Contribution entity - Immutable record of value moved from a wallet into a pool.
//!
//! The only later mutation is `refunded` flipping to true when the member exits.
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Contribution database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contributions")]
pub struct Model {
    /// Unique identifier for the contribution
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Contributing member
    pub user_id: String,
    /// Receiving circle
    pub circle_id: i64,
    /// Amount in cents
    pub amount_cents: i64,
    /// When the contribution was made
    pub timestamp: DateTimeUtc,
    /// True if made by the enforcement sweep
    pub is_automatic: bool,
    /// True once paid back to the member
    pub refunded: bool,
}

impl Model {
    /// Amount as a two-digit decimal.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        crate::core::money::from_cents(self.amount_cents)
    }
}

/// Defines relationships between Contribution and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each contribution belongs to one circle
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
