//! Implements a SQLite backed store for vendor payments.

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, Row, params};
use time::OffsetDateTime;

use crate::{
    Error,
    auth::UserID,
    ledger::{ApplicationName, NewPayment, PaymentId, PaymentRecord},
    stores::{PaymentStore, sqlite::lock_connection},
};

/// Create, retrieve and delete vendor payments.
#[derive(Debug, Clone)]
pub struct SQLitePaymentStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLitePaymentStore {
    /// Create a new store from the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    /// Create the payment table.
    pub fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute_batch(
            "CREATE TABLE IF NOT EXISTS payment (
                id INTEGER PRIMARY KEY,
                application TEXT NOT NULL,
                amount REAL NOT NULL,
                payer_id INTEGER REFERENCES user(id) ON DELETE SET NULL,
                description TEXT,
                paid_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_payment_application ON payment(application);",
        )
    }
}

fn map_row(row: &Row) -> Result<PaymentRecord, rusqlite::Error> {
    let application: String = row.get(1)?;
    let payer_id: Option<i64> = row.get(3)?;

    Ok(PaymentRecord {
        id: row.get(0)?,
        application: ApplicationName::new_unchecked(&application),
        amount: row.get(2)?,
        payer_id: payer_id.map(UserID::new),
        description: row.get(4)?,
        paid_at: row.get(5)?,
    })
}

impl PaymentStore for SQLitePaymentStore {
    fn create(&mut self, payment: NewPayment) -> Result<PaymentRecord, Error> {
        let paid_at = OffsetDateTime::now_utc();
        let description = payment
            .description
            .map(|description| description.trim().to_owned())
            .filter(|description| !description.is_empty());

        let connection = lock_connection(&self.connection)?;
        connection.execute(
            "INSERT INTO payment (application, amount, payer_id, description, paid_at)
            VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                payment.application.as_ref(),
                payment.amount.as_f64(),
                payment.payer_id.map(|id| id.as_i64()),
                description,
                paid_at
            ],
        )?;

        Ok(PaymentRecord {
            id: connection.last_insert_rowid(),
            application: payment.application,
            amount: payment.amount.as_f64(),
            payer_id: payment.payer_id,
            description,
            paid_at,
        })
    }

    fn get_by_application(
        &self,
        application: &ApplicationName,
    ) -> Result<Vec<PaymentRecord>, Error> {
        lock_connection(&self.connection)?
            .prepare(
                "SELECT id, application, amount, payer_id, description, paid_at
                FROM payment
                WHERE application = :application
                ORDER BY paid_at DESC, id DESC;",
            )?
            .query_map(&[(":application", application.as_ref())], map_row)?
            .map(|maybe_payment| maybe_payment.map_err(Error::from))
            .collect()
    }

    fn delete(&mut self, id: PaymentId) -> Result<(), Error> {
        let rows_affected =
            lock_connection(&self.connection)?.execute("DELETE FROM payment WHERE id = ?1", [id])?;

        if rows_affected == 0 {
            return Err(Error::DeleteMissingPayment);
        }

        Ok(())
    }
}

#[cfg(test)]
mod sqlite_payment_store_tests {
    use crate::{
        Error,
        auth::UserID,
        ledger::{Amount, ApplicationName, NewPayment},
        stores::PaymentStore,
        test_utils::{create_test_user, get_shared_test_connection},
    };

    use super::SQLitePaymentStore;

    fn get_test_store() -> SQLitePaymentStore {
        SQLitePaymentStore::new(get_shared_test_connection())
    }

    fn new_payment(application: &str, amount: f64) -> NewPayment {
        NewPayment {
            application: ApplicationName::new_unchecked(application),
            amount: Amount::new(amount).unwrap(),
            payer_id: None,
            description: None,
        }
    }

    #[test]
    fn can_create_payment() {
        let connection = get_shared_test_connection();
        let payer = create_test_user("dana@example.com", &connection.lock().unwrap());
        let mut store = SQLitePaymentStore::new(connection);
        let mut payment = new_payment("Crunchyroll", 50.0);
        payment.payer_id = Some(payer);

        let payment = store.create(payment).unwrap();

        assert_eq!(payment.id, 1);
        assert_eq!(payment.amount, 50.0);
        assert_eq!(payment.payer_id, Some(payer));
        let stored = store
            .get_by_application(&ApplicationName::new_unchecked("Crunchyroll"))
            .unwrap();
        assert_eq!(stored, vec![payment]);
    }

    #[test]
    fn payer_must_be_a_registered_user() {
        let mut store = get_test_store();
        let mut payment = new_payment("Crunchyroll", 50.0);
        payment.payer_id = Some(UserID::new(99));

        let result = store.create(payment);

        assert!(
            matches!(result, Err(Error::SqlError(_))),
            "want foreign key error, got {result:?}"
        );
    }

    #[test]
    fn blank_description_is_stored_as_none() {
        let mut store = get_test_store();
        let mut payment = new_payment("Crunchyroll", 50.0);
        payment.description = Some("   ".to_owned());

        let payment = store.create(payment).unwrap();

        assert_eq!(payment.description, None);
    }

    #[test]
    fn get_by_application_filters_and_orders_newest_first() {
        let mut store = get_test_store();
        let first = store.create(new_payment("YouTube Premium", 20.0)).unwrap();
        store.create(new_payment("Crunchyroll", 10.0)).unwrap();
        let second = store.create(new_payment("YouTube Premium", 25.0)).unwrap();

        let got = store
            .get_by_application(&ApplicationName::new_unchecked("YouTube Premium"))
            .unwrap();

        assert_eq!(got, vec![second, first]);
    }

    #[test]
    fn delete_fails_on_missing_payment() {
        let mut store = get_test_store();

        assert_eq!(store.delete(1), Err(Error::DeleteMissingPayment));
    }

    #[test]
    fn delete_removes_payment() {
        let mut store = get_test_store();
        let payment = store.create(new_payment("Crunchyroll", 50.0)).unwrap();

        store.delete(payment.id).unwrap();

        assert!(
            store
                .get_by_application(&ApplicationName::new_unchecked("Crunchyroll"))
                .unwrap()
                .is_empty()
        );
    }
}
