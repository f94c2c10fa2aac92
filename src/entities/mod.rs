//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod circle;
pub mod claim;
pub mod contribution;
pub mod membership;
pub mod wallet;
pub mod wallet_transaction;

// Re-export specific types to avoid conflicts
pub use circle::{Column as CircleColumn, Entity as Circle, Model as CircleModel};
pub use claim::{Column as ClaimColumn, Entity as Claim, Model as ClaimModel};
pub use contribution::{
    Column as ContributionColumn, Entity as Contribution, Model as ContributionModel,
};
pub use membership::{Column as MembershipColumn, Entity as Membership, Model as MembershipModel};
pub use wallet::{Column as WalletColumn, Entity as Wallet, Model as WalletModel};
pub use wallet_transaction::{
    Column as WalletTransactionColumn, Entity as WalletTransaction,
    Model as WalletTransactionModel,
};
