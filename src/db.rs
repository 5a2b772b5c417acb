//! Database initialization.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{
    Error,
    auth::create_user_table,
    stores::sqlite::{SQLiteBalanceStore, SQLiteContributionStore, SQLitePaymentStore},
};

/// Create the tables for the domain models if they do not exist yet.
///
/// # Errors
/// Returns an [Error::SqlError] if any of the tables could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    SQLiteBalanceStore::create_table(&transaction)?;
    SQLitePaymentStore::create_table(&transaction)?;
    SQLiteContributionStore::create_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
