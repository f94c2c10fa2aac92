//! Membership state machine - cadence and delinquency tracking.
//!
//! A membership is `active` until enforcement removes it; there is no way back.
//! The due date is anchored on the latest of the join date, the last
//! contribution and the last warning, so a warning pushes the next check out by
//! one full cycle.

use crate::{
    entities::{Membership, membership},
    errors::{Error, Result},
};
use chrono::{DateTime, TimeDelta, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use std::str::FromStr;

/// How often members of a circle contribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    /// Every day (test configurations)
    Daily,
    /// Every 7 days
    Weekly,
    /// Every 30 days
    Monthly,
}

impl Frequency {
    /// Name stored in the `frequency` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Length of one contribution cycle.
    #[must_use]
    pub fn delta(self) -> TimeDelta {
        match self {
            Self::Daily => TimeDelta::days(1),
            Self::Weekly => TimeDelta::days(7),
            Self::Monthly => TimeDelta::days(30),
        }
    }
}

impl FromStr for Frequency {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(Error::Validation {
                message: format!("Unknown contribution frequency '{other}'"),
            }),
        }
    }
}

/// Cycle length for a stored frequency; anything unrecognized counts as weekly.
#[must_use]
pub fn frequency_delta(stored: &str) -> TimeDelta {
    stored
        .parse::<Frequency>()
        .map_or_else(|_| Frequency::Weekly.delta(), Frequency::delta)
}

/// When the member's next contribution falls due.
#[must_use]
pub fn due_date(membership: &membership::Model, frequency: &str) -> DateTime<Utc> {
    let anchor = membership
        .last_contribution_date
        .unwrap_or(membership.join_date);
    let anchor = membership
        .last_warning_date
        .map_or(anchor, |warned| warned.max(anchor));
    anchor + frequency_delta(frequency)
}

/// Finds a membership by id.
pub async fn get_membership<C>(db: &C, membership_id: i64) -> Result<membership::Model>
where
    C: ConnectionTrait,
{
    Membership::find_by_id(membership_id)
        .one(db)
        .await?
        .ok_or(Error::MembershipNotFound { membership_id })
}

/// Finds the user's membership in a circle, active or not.
pub async fn find_membership<C>(
    db: &C,
    user_id: &str,
    circle_id: i64,
) -> Result<Option<membership::Model>>
where
    C: ConnectionTrait,
{
    Membership::find()
        .filter(membership::Column::UserId.eq(user_id))
        .filter(membership::Column::CircleId.eq(circle_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Returns the user's active membership in a circle or `NotAMember`.
pub async fn get_active_membership<C>(
    db: &C,
    user_id: &str,
    circle_id: i64,
) -> Result<membership::Model>
where
    C: ConnectionTrait,
{
    find_membership(db, user_id, circle_id)
        .await?
        .filter(|m| m.is_active)
        .ok_or_else(|| Error::NotAMember {
            user_id: user_id.to_string(),
            circle_id,
        })
}

/// All active memberships across every circle, oldest first.
pub async fn list_active_memberships<C>(db: &C) -> Result<Vec<membership::Model>>
where
    C: ConnectionTrait,
{
    Membership::find()
        .filter(membership::Column::IsActive.eq(true))
        .order_by_asc(membership::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Clears warnings and records a successful contribution.
pub async fn record_contribution<C>(
    db: &C,
    membership: &membership::Model,
    at: DateTime<Utc>,
) -> Result<membership::Model>
where
    C: ConnectionTrait,
{
    let mut active: membership::ActiveModel = membership.clone().into();
    active.payment_warnings = Set(0);
    active.last_contribution_date = Set(Some(at));
    active.update(db).await.map_err(Into::into)
}

/// Adds one payment warning.
pub async fn record_missed_contribution<C>(
    db: &C,
    membership: &membership::Model,
    at: DateTime<Utc>,
) -> Result<membership::Model>
where
    C: ConnectionTrait,
{
    let mut active: membership::ActiveModel = membership.clone().into();
    active.payment_warnings = Set(membership.payment_warnings + 1);
    active.last_warning_date = Set(Some(at));
    active.update(db).await.map_err(Into::into)
}

/// Marks a membership inactive. Terminal.
pub async fn deactivate<C>(db: &C, membership: &membership::Model) -> Result<membership::Model>
where
    C: ConnectionTrait,
{
    let mut active: membership::ActiveModel = membership.clone().into();
    active.is_active = Set(false);
    active.update(db).await.map_err(Into::into)
}
