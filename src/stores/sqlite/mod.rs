//! Implements the ledger stores on top of a shared SQLite connection.

mod balance;
mod contribution;
mod payment;

pub use balance::SQLiteBalanceStore;
pub use contribution::SQLiteContributionStore;
pub use payment::SQLitePaymentStore;

use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use crate::Error;

/// Acquire the lock for the database connection.
///
/// # Errors
/// Returns [Error::DatabaseLockError] if the lock is poisoned.
pub(crate) fn lock_connection(
    connection: &Mutex<Connection>,
) -> Result<MutexGuard<'_, Connection>, Error> {
    connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })
}
