//! Membership entity - Relates one user to one circle.
//!
//! Tracks contribution cadence and delinquency. `is_active` only ever moves from
//! `true` to `false`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Membership database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "memberships")]
pub struct Model {
    /// Unique identifier for the membership
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Member
    pub user_id: String,
    /// Circle the member belongs to
    pub circle_id: i64,
    /// When the member joined
    pub join_date: DateTimeUtc,
    /// Last successful contribution, manual or automatic
    pub last_contribution_date: Option<DateTimeUtc>,
    /// Consecutive missed contributions
    pub payment_warnings: i32,
    /// When the last warning was issued
    pub last_warning_date: Option<DateTimeUtc>,
    /// False once the member has been removed
    pub is_active: bool,
}

/// Defines relationships between Membership and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each membership belongs to one circle
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
