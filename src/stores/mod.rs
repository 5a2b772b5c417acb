//! Contains traits and implementations for objects that store the ledger records.
//!
//! The settlement functions are written against the traits so that tests can
//! substitute an in-memory store for the SQLite one.

mod balance;
mod contribution;
mod payment;

#[cfg(test)]
pub(crate) mod fake;

pub mod sqlite;

pub use balance::BalanceStore;
pub use contribution::ContributionStore;
pub use payment::PaymentStore;
