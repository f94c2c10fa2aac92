//! `circle-ledger` - contribution and claim settlement for savings circles
//!
//! Members top up personal wallets, pay a fixed contribution into a shared circle
//! pool every cycle and file claims against that pool. The crate enforces the
//! contribution cadence (warnings, then refund and removal), adjudicates claims
//! through eligibility rules and an external fraud oracle, and keeps every
//! wallet and pool balance consistent under concurrent settlements.
//!
//! Every operation goes through a [`core::engine::SettlementEngine`], which owns
//! the database connection, the settlement rules and the account locks.

// Hard errors: anything here is a bug in money-moving code
#![deny(
    unsafe_code,
    unreachable_code,
    unreachable_patterns,
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    // Panics have no place on a settlement path
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::exit,
    // Balances are integer cents; floats would be a regression
    clippy::float_cmp,
    clippy::clone_on_ref_ptr,
    clippy::needless_pass_by_value,
    clippy::large_enum_variant,
    clippy::too_many_lines,
    clippy::enum_glob_use,
    clippy::semicolon_if_nothing_returned,
    future_incompatible,
    rust_2018_idioms,
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
)]

/// Database connection setup and the `config.toml` settlement rules
pub mod config;
/// Wallets, circles, contributions, the enforcement sweep and claim adjudication
pub mod core;
/// Tables: wallets, wallet transactions, circles, memberships, contributions, claims
pub mod entities;
/// The crate error enum; every rejection a member can see is a variant here
pub mod errors;

#[cfg(test)]
pub mod test_utils;
