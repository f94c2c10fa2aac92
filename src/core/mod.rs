//! Settlement engine business logic, independent of any front end.

pub mod circle;
pub mod claim;
pub mod contribution;
pub mod engine;
pub mod ledger;
pub mod membership;
pub mod money;
pub mod oracle;
pub mod refund;
pub mod risk;
pub mod scheduler;
pub mod wallet;
