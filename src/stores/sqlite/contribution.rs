//! Implements a SQLite backed store for the contribution history.

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, Row, params};
use time::OffsetDateTime;

use crate::{
    Error,
    auth::UserID,
    ledger::{ApplicationName, ContributionEntry, ContributionId, ContributorName, NewContribution},
    stores::{ContributionStore, sqlite::lock_connection},
};

/// Append to, retrieve and delete from the contribution history.
#[derive(Debug, Clone)]
pub struct SQLiteContributionStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteContributionStore {
    /// Create a new store from the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    /// Create the contribution table.
    ///
    /// Must be called after the payment table has been created.
    pub fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute_batch(
            "CREATE TABLE IF NOT EXISTS contribution (
                id INTEGER PRIMARY KEY,
                recorder_id INTEGER REFERENCES user(id) ON DELETE SET NULL,
                contributor TEXT NOT NULL,
                application TEXT NOT NULL,
                amount REAL NOT NULL,
                related_payment_id INTEGER REFERENCES payment(id) ON DELETE SET NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_contribution_application ON contribution(application);",
        )
    }
}

fn map_row(row: &Row) -> Result<ContributionEntry, rusqlite::Error> {
    let recorder_id: Option<i64> = row.get(1)?;
    let contributor: String = row.get(2)?;
    let application: String = row.get(3)?;

    Ok(ContributionEntry {
        id: row.get(0)?,
        recorder_id: recorder_id.map(UserID::new),
        contributor: ContributorName::new_unchecked(&contributor),
        application: ApplicationName::new_unchecked(&application),
        amount: row.get(4)?,
        related_payment_id: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl ContributionStore for SQLiteContributionStore {
    fn create(&mut self, contribution: NewContribution) -> Result<ContributionEntry, Error> {
        let created_at = OffsetDateTime::now_utc();

        let connection = lock_connection(&self.connection)?;
        connection.execute(
            "INSERT INTO contribution (recorder_id, contributor, application, amount, related_payment_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                contribution.recorder_id.map(|id| id.as_i64()),
                contribution.contributor.as_ref(),
                contribution.application.as_ref(),
                contribution.amount.as_f64(),
                contribution.related_payment_id,
                created_at
            ],
        )?;

        Ok(ContributionEntry {
            id: connection.last_insert_rowid(),
            recorder_id: contribution.recorder_id,
            contributor: contribution.contributor,
            application: contribution.application,
            amount: contribution.amount.as_f64(),
            related_payment_id: contribution.related_payment_id,
            created_at,
        })
    }

    fn get_by_application(
        &self,
        application: &ApplicationName,
    ) -> Result<Vec<ContributionEntry>, Error> {
        lock_connection(&self.connection)?
            .prepare(
                "SELECT id, recorder_id, contributor, application, amount, related_payment_id, created_at
                FROM contribution
                WHERE application = :application
                ORDER BY created_at DESC, id DESC;",
            )?
            .query_map(&[(":application", application.as_ref())], map_row)?
            .map(|maybe_entry| maybe_entry.map_err(Error::from))
            .collect()
    }

    fn delete(&mut self, id: ContributionId) -> Result<(), Error> {
        let rows_affected = lock_connection(&self.connection)?
            .execute("DELETE FROM contribution WHERE id = ?1", [id])?;

        if rows_affected == 0 {
            return Err(Error::DeleteMissingContribution);
        }

        Ok(())
    }
}

#[cfg(test)]
mod sqlite_contribution_store_tests {
    use crate::{
        Error,
        ledger::{Amount, ApplicationName, ContributorName, NewContribution},
        stores::{ContributionStore, sqlite::SQLiteContributionStore},
        test_utils::{create_test_user, get_shared_test_connection},
    };

    fn get_test_store() -> SQLiteContributionStore {
        SQLiteContributionStore::new(get_shared_test_connection())
    }

    fn new_contribution(contributor: &str, application: &str, amount: f64) -> NewContribution {
        NewContribution {
            recorder_id: None,
            contributor: ContributorName::new_unchecked(contributor),
            application: ApplicationName::new_unchecked(application),
            amount: Amount::new(amount).unwrap(),
            related_payment_id: None,
        }
    }

    #[test]
    fn can_create_entry() {
        let connection = get_shared_test_connection();
        let recorder = create_test_user("dana@example.com", &connection.lock().unwrap());
        let mut store = SQLiteContributionStore::new(connection);
        let mut contribution = new_contribution("Dana", "YouTube Premium", 30.0);
        contribution.recorder_id = Some(recorder);

        let entry = store.create(contribution).unwrap();

        assert_eq!(entry.id, 1);
        assert_eq!(entry.recorder_id, Some(recorder));
        assert_eq!(entry.contributor, ContributorName::new_unchecked("Dana"));
        assert_eq!(entry.amount, 30.0);
    }

    #[test]
    fn related_payment_must_exist() {
        let mut store = get_test_store();
        let mut contribution = new_contribution("Dana", "YouTube Premium", 30.0);
        contribution.related_payment_id = Some(42);

        let result = store.create(contribution);

        assert!(
            matches!(result, Err(Error::SqlError(_))),
            "want foreign key error, got {result:?}"
        );
    }

    #[test]
    fn entries_are_never_merged() {
        let mut store = get_test_store();
        let first = store
            .create(new_contribution("Dana", "YouTube Premium", 30.0))
            .unwrap();
        let second = store
            .create(new_contribution("Dana", "YouTube Premium", 30.0))
            .unwrap();

        let got = store
            .get_by_application(&ApplicationName::new_unchecked("YouTube Premium"))
            .unwrap();

        assert_eq!(got, vec![second, first]);
    }

    #[test]
    fn get_by_application_filters_other_applications() {
        let mut store = get_test_store();
        store
            .create(new_contribution("Dana", "YouTube Premium", 30.0))
            .unwrap();
        let want = store
            .create(new_contribution("Dana", "Crunchyroll", 5.0))
            .unwrap();

        let got = store
            .get_by_application(&ApplicationName::new_unchecked("Crunchyroll"))
            .unwrap();

        assert_eq!(got, vec![want]);
    }

    #[test]
    fn delete_fails_on_missing_entry() {
        let mut store = get_test_store();

        assert_eq!(store.delete(7), Err(Error::DeleteMissingContribution));
    }

    #[test]
    fn delete_removes_entry() {
        let mut store = get_test_store();
        let entry = store
            .create(new_contribution("Dana", "Crunchyroll", 5.0))
            .unwrap();

        store.delete(entry.id).unwrap();

        assert!(
            store
                .get_by_application(&ApplicationName::new_unchecked("Crunchyroll"))
                .unwrap()
                .is_empty()
        );
    }
}
