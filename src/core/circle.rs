//! Circle business logic - creating circles, joining them and listing members.
//!
//! Creating a circle enrolls the creator in the same transaction, so a circle
//! never exists without at least one member.

use crate::{
    core::{
        membership::{Frequency, find_membership},
        money::to_cents,
    },
    entities::{Circle, Membership, circle, membership},
    errors::{Error, Result},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Parameters for a new circle.
#[derive(Debug, Clone)]
pub struct NewCircle {
    /// User creating (and joining) the circle
    pub creator_id: String,
    /// Display name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Amount every member pays per cycle
    pub contribution_amount: Decimal,
    /// Contribution cadence
    pub frequency: Frequency,
    /// Days new members wait before filing claims
    pub claim_lock_period_days: i32,
    /// Pool level under which outflows log a warning; defaults to two contributions
    pub min_balance_alert: Option<Decimal>,
}

/// Finds a circle by id or fails with `CircleNotFound`.
pub async fn get_circle<C>(db: &C, circle_id: i64) -> Result<circle::Model>
where
    C: ConnectionTrait,
{
    Circle::find_by_id(circle_id)
        .one(db)
        .await?
        .ok_or(Error::CircleNotFound { circle_id })
}

async fn insert_membership<C>(db: &C, user_id: &str, circle_id: i64) -> Result<membership::Model>
where
    C: ConnectionTrait,
{
    let membership = membership::ActiveModel {
        user_id: Set(user_id.to_string()),
        circle_id: Set(circle_id),
        join_date: Set(Utc::now()),
        last_contribution_date: Set(None),
        payment_warnings: Set(0),
        last_warning_date: Set(None),
        is_active: Set(true),
        ..Default::default()
    };
    membership.insert(db).await.map_err(Into::into)
}

/// Creates a circle with an empty pool and enrolls its creator.
#[instrument(skip(db, new_circle), fields(name = %new_circle.name, creator = %new_circle.creator_id))]
pub async fn create_circle(db: &DatabaseConnection, new_circle: NewCircle) -> Result<circle::Model> {
    let name = new_circle.name.trim();
    if name.is_empty() {
        return Err(Error::Validation {
            message: "Circle name cannot be empty".to_string(),
        });
    }
    if new_circle.creator_id.trim().is_empty() {
        return Err(Error::Validation {
            message: "Circle creator cannot be empty".to_string(),
        });
    }
    if new_circle.claim_lock_period_days < 0 {
        return Err(Error::Validation {
            message: "Claim lock period cannot be negative".to_string(),
        });
    }

    let contribution_cents = to_cents(new_circle.contribution_amount)?;
    let min_balance_alert_cents = match new_circle.min_balance_alert {
        Some(alert) if alert > Decimal::ZERO => to_cents(alert)?,
        _ => contribution_cents * 2,
    };

    let now = Utc::now();
    let txn = db.begin().await?;

    let circle = circle::ActiveModel {
        name: Set(name.to_string()),
        description: Set(new_circle.description),
        creator_id: Set(new_circle.creator_id.clone()),
        contribution_amount_cents: Set(contribution_cents),
        frequency: Set(new_circle.frequency.as_str().to_string()),
        balance_cents: Set(0),
        claim_lock_period_days: Set(new_circle.claim_lock_period_days),
        min_balance_alert_cents: Set(min_balance_alert_cents),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let circle = circle.insert(&txn).await?;
    insert_membership(&txn, &new_circle.creator_id, circle.id).await?;

    txn.commit().await?;

    info!("Created circle {} ({})", circle.id, circle.name);
    Ok(circle)
}

/// Enrolls a user in a circle.
///
/// A user who was removed from the circle cannot rejoin it.
#[instrument(skip(db))]
pub async fn join_circle(
    db: &DatabaseConnection,
    user_id: &str,
    circle_id: i64,
) -> Result<membership::Model> {
    if user_id.trim().is_empty() {
        return Err(Error::Validation {
            message: "User id cannot be empty".to_string(),
        });
    }

    let txn = db.begin().await?;
    get_circle(&txn, circle_id).await?;

    if find_membership(&txn, user_id, circle_id).await?.is_some() {
        return Err(Error::AlreadyMember {
            user_id: user_id.to_string(),
            circle_id,
        });
    }

    let membership = insert_membership(&txn, user_id, circle_id).await?;
    txn.commit().await?;

    info!("User {} joined circle {}", user_id, circle_id);
    Ok(membership)
}

/// Lists every membership of a circle (including removed members), oldest first.
pub async fn list_memberships(
    db: &DatabaseConnection,
    circle_id: i64,
) -> Result<Vec<membership::Model>> {
    get_circle(db, circle_id).await?;
    Membership::find()
        .filter(membership::Column::CircleId.eq(circle_id))
        .order_by_asc(membership::Column::JoinDate)
        .order_by_asc(membership::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists the circles a user belongs to (or once belonged to), by name.
pub async fn list_circles_for_user(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<circle::Model>> {
    Circle::find()
        .inner_join(Membership)
        .filter(membership::Column::UserId.eq(user_id))
        .order_by_asc(circle::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}
