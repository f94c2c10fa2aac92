//! Database configuration module for the circle ledger.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust models.
//! The only hand-built statement is the composite unique index that keeps one
//! membership per user and circle.

use crate::entities::{
    Circle, Claim, Contribution, Membership, Wallet, WalletTransaction, membership,
};
use crate::errors::Result;
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema, sea_query::Index,
};
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://circle_ledger.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
///
/// This function looks for `DATABASE_URL` in the environment and falls back to
/// a default local `SQLite` file if not found.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a default local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table_for<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all ledger tables (if missing) from the entity definitions.
///
/// Safe to call on every start-up.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_table_for(db, &schema, Wallet).await?;
    create_table_for(db, &schema, WalletTransaction).await?;
    create_table_for(db, &schema, Circle).await?;
    create_table_for(db, &schema, Membership).await?;
    create_table_for(db, &schema, Contribution).await?;
    create_table_for(db, &schema, Claim).await?;

    // One membership per (user, circle), active or not
    let membership_index = Index::create()
        .name("idx_unique_membership_user_circle")
        .table(Membership)
        .col(membership::Column::UserId)
        .col(membership::Column::CircleId)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&membership_index)).await?;

    info!("Ledger tables ensured");
    Ok(())
}
