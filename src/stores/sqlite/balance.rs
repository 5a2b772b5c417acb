//! Implements a SQLite backed balance store.

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, Row, params};
use time::OffsetDateTime;

use crate::{
    Error,
    auth::UserID,
    ledger::{Amount, ApplicationName, Balance, BalanceId, ContributorName},
    stores::{BalanceStore, sqlite::lock_connection},
};

const BALANCE_COLUMNS: &str = "id, owner_id, contributor, application, amount, created_at, updated_at";

/// Create, update and retrieve balances.
#[derive(Debug, Clone)]
pub struct SQLiteBalanceStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteBalanceStore {
    /// Create a new store from the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    /// Create the balance table.
    ///
    /// The unique constraint on the contributor and application is what the
    /// upsert in [BalanceStore::add_contribution] relies on.
    pub fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute_batch(
            "CREATE TABLE IF NOT EXISTS balance (
                id INTEGER PRIMARY KEY,
                owner_id INTEGER REFERENCES user(id) ON DELETE SET NULL,
                contributor TEXT NOT NULL,
                application TEXT NOT NULL,
                amount REAL NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(contributor, application)
            );

            CREATE INDEX IF NOT EXISTS idx_balance_application ON balance(application);",
        )
    }
}

fn map_row(row: &Row) -> Result<Balance, rusqlite::Error> {
    let owner_id: Option<i64> = row.get(1)?;
    let contributor: String = row.get(2)?;
    let application: String = row.get(3)?;

    Ok(Balance {
        id: row.get(0)?,
        owner_id: owner_id.map(UserID::new),
        contributor: ContributorName::new_unchecked(&contributor),
        application: ApplicationName::new_unchecked(&application),
        amount: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

impl BalanceStore for SQLiteBalanceStore {
    fn get_by_application(&self, application: &ApplicationName) -> Result<Vec<Balance>, Error> {
        lock_connection(&self.connection)?
            .prepare(&format!(
                "SELECT {BALANCE_COLUMNS} FROM balance
                WHERE application = :application
                ORDER BY contributor ASC;"
            ))?
            .query_map(&[(":application", application.as_ref())], map_row)?
            .map(|maybe_balance| maybe_balance.map_err(Error::from))
            .collect()
    }

    fn get_by_contributor(
        &self,
        contributor: &ContributorName,
        application: &ApplicationName,
    ) -> Result<Option<Balance>, Error> {
        let result = lock_connection(&self.connection)?
            .prepare(&format!(
                "SELECT {BALANCE_COLUMNS} FROM balance
                WHERE contributor = ?1 AND application = ?2;"
            ))?
            .query_row(params![contributor.as_ref(), application.as_ref()], map_row);

        match result {
            Ok(balance) => Ok(Some(balance)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn adjust(&mut self, id: BalanceId, delta: f64) -> Result<Balance, Error> {
        lock_connection(&self.connection)?
            .prepare(&format!(
                "UPDATE balance SET amount = amount + ?1, updated_at = ?2
                WHERE id = ?3
                RETURNING {BALANCE_COLUMNS};"
            ))?
            .query_row(params![delta, OffsetDateTime::now_utc(), id], map_row)
            .map_err(|error| match error {
                rusqlite::Error::QueryReturnedNoRows => Error::UpdateMissingBalance,
                error => error.into(),
            })
    }

    fn add_contribution(
        &mut self,
        owner_id: Option<UserID>,
        contributor: &ContributorName,
        application: &ApplicationName,
        amount: Amount,
    ) -> Result<Balance, Error> {
        let now = OffsetDateTime::now_utc();

        lock_connection(&self.connection)?
            .prepare(&format!(
                "INSERT INTO balance (owner_id, contributor, application, amount, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                ON CONFLICT(contributor, application) DO UPDATE SET
                    amount = amount + excluded.amount,
                    updated_at = excluded.updated_at
                RETURNING {BALANCE_COLUMNS};"
            ))?
            .query_row(
                params![
                    owner_id.map(|id| id.as_i64()),
                    contributor.as_ref(),
                    application.as_ref(),
                    amount.as_f64(),
                    now
                ],
                map_row,
            )
            .map_err(Error::from)
    }

    fn contributor_names(&self) -> Result<Vec<ContributorName>, Error> {
        lock_connection(&self.connection)?
            .prepare("SELECT DISTINCT contributor FROM balance ORDER BY contributor ASC;")?
            .query_map([], |row| {
                let name: String = row.get(0)?;
                Ok(ContributorName::new_unchecked(&name))
            })?
            .map(|maybe_name| maybe_name.map_err(Error::from))
            .collect()
    }

    fn delete(&mut self, id: BalanceId) -> Result<(), Error> {
        let rows_affected =
            lock_connection(&self.connection)?.execute("DELETE FROM balance WHERE id = ?1", [id])?;

        if rows_affected == 0 {
            return Err(Error::DeleteMissingBalance);
        }

        Ok(())
    }
}
