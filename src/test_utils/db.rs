use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{
    PasswordHash,
    auth::{UserID, create_user, parse_email},
    db::initialize,
};

/// An in-memory database with every table created.
///
/// Ledger rows reference the `user` table, so store tests need the whole schema even when they
/// only exercise one table.
pub(crate) fn get_test_connection() -> Connection {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");
    initialize(&connection).expect("Could not create tables");

    connection
}

/// Like [get_test_connection], wrapped for sharing between stores.
pub(crate) fn get_shared_test_connection() -> Arc<Mutex<Connection>> {
    Arc::new(Mutex::new(get_test_connection()))
}

/// Register a user so that payments, balances and contributions have someone to point at.
///
/// The password hash is never checked, so it does not need to be a real bcrypt hash.
pub(crate) fn create_test_user(email: &str, connection: &Connection) -> UserID {
    create_user(
        parse_email(email).expect("test email should be valid"),
        None,
        PasswordHash::new_unchecked("not-a-real-hash"),
        connection,
    )
    .expect("Could not create test user")
    .id
}

#[cfg(test)]
mod test_db_tests {
    use rusqlite::Connection;

    use super::{create_test_user, get_test_connection};

    fn count_rows(table: &str, connection: &Connection) -> i64 {
        connection
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })
            .unwrap()
    }

    #[test]
    fn creates_every_ledger_table() {
        let connection = get_test_connection();

        for table in ["user", "balance", "payment", "contribution"] {
            assert_eq!(count_rows(table, &connection), 0, "table {table}");
        }
    }

    #[test]
    fn test_users_get_distinct_ids() {
        let connection = get_test_connection();

        let dana = create_test_user("dana@example.com", &connection);
        let eli = create_test_user("eli@example.com", &connection);

        assert_ne!(dana, eli);
        assert_eq!(count_rows("user", &connection), 2);
    }
}
