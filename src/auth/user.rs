//! Creating the user table and reading and writing registered users.

use std::{fmt::Display, str::FromStr};

use email_address::EmailAddress;
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, auth::PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from the IDs of ledger records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A registered user who can record payments and contributions.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The email address the user logs in with.
    pub email: EmailAddress,
    /// An optional display name.
    pub name: Option<String>,
    /// The user's password hash.
    pub password_hash: PasswordHash,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                name TEXT,
                password TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Parse `raw_email` as an email address, ignoring surrounding whitespace.
///
/// # Errors
///
/// Returns an [Error::InvalidEmail] if `raw_email` is not a valid email address.
pub fn parse_email(raw_email: &str) -> Result<EmailAddress, Error> {
    let raw_email = raw_email.trim();

    EmailAddress::from_str(raw_email).map_err(|_| Error::InvalidEmail(raw_email.to_owned()))
}

/// Create and insert a new user into the database.
///
/// A blank `name` is stored as no name.
///
/// # Errors
///
/// Returns:
/// - [Error::DuplicateEmail] if another user has registered with `email`.
/// - [Error::SqlError] if an SQL related error occurred.
pub fn create_user(
    email: EmailAddress,
    name: Option<&str>,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<User, Error> {
    let name = name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned);

    connection
        .execute(
            "INSERT INTO user (email, name, password) VALUES (?1, ?2, ?3)",
            (email.as_str(), &name, password_hash.as_ref()),
        )
        .map_err(|error| match error {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(_))
                if sql_error.extended_code == 2067 =>
            {
                Error::DuplicateEmail
            }
            error => error.into(),
        })?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        email,
        name,
        password_hash,
    })
}

fn map_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_email: String = row.get(1)?;
    let raw_password_hash: String = row.get(3)?;

    let email = EmailAddress::from_str(&raw_email).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(error))
    })?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        email,
        name: row.get(2)?,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
    })
}

/// Get the user that registered with `email`.
///
/// # Errors
///
/// Returns an [Error::NotFound] if nobody has registered with `email`,
/// or an [Error::SqlError] if there was an error trying to access the store.
pub fn get_user_by_email(email: &EmailAddress, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, email, name, password FROM user WHERE email = :email")?
        .query_row(&[(":email", email.as_str())], map_row)
        .map_err(|error| error.into())
}

/// Replace the password of the user with `user_id`.
///
/// # Errors
///
/// Returns an [Error::NotFound] if `user_id` does not belong to a registered user.
pub fn update_password(
    user_id: UserID,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET password = ?1 WHERE id = ?2",
        (password_hash.as_ref(), user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

#[cfg(test)]
mod user_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        auth::{
            PasswordHash, UserID,
            user::{
                create_user, create_user_table, get_user_by_email, parse_email, update_password,
            },
        },
    };

    fn get_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        create_user_table(&connection).unwrap();
        connection
    }

    fn hash() -> PasswordHash {
        PasswordHash::new_unchecked("$2b$04$notarealhashbutgoodenoughfortests")
    }

    #[test]
    fn parse_email_trims_whitespace() {
        let email = parse_email("  dana@example.com ").unwrap();

        assert_eq!(email.as_str(), "dana@example.com");
    }

    #[test]
    fn parse_email_rejects_invalid_address() {
        assert_eq!(
            parse_email("not an email"),
            Err(Error::InvalidEmail("not an email".to_owned()))
        );
    }

    #[test]
    fn create_and_get_user() {
        let connection = get_connection();
        let email = parse_email("dana@example.com").unwrap();

        let user = create_user(email.clone(), Some(" Dana "), hash(), &connection).unwrap();

        assert_eq!(user.name.as_deref(), Some("Dana"));
        assert_eq!(get_user_by_email(&email, &connection), Ok(user));
    }

    #[test]
    fn blank_name_is_stored_as_none() {
        let connection = get_connection();

        let user = create_user(
            parse_email("dana@example.com").unwrap(),
            Some("   "),
            hash(),
            &connection,
        )
        .unwrap();

        assert_eq!(user.name, None);
    }

    #[test]
    fn create_user_fails_on_duplicate_email() {
        let connection = get_connection();
        let email = parse_email("dana@example.com").unwrap();
        create_user(email.clone(), None, hash(), &connection).unwrap();

        let result = create_user(email, None, hash(), &connection);

        assert_eq!(result, Err(Error::DuplicateEmail));
    }

    #[test]
    fn get_missing_user_is_not_found() {
        let connection = get_connection();

        assert_eq!(
            get_user_by_email(&parse_email("nobody@example.com").unwrap(), &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn update_password_replaces_hash() {
        let connection = get_connection();
        let user = create_user(
            parse_email("dana@example.com").unwrap(),
            None,
            hash(),
            &connection,
        )
        .unwrap();
        let new_hash = PasswordHash::new_unchecked("$2b$04$anotherfakehash");

        update_password(user.id, &new_hash, &connection).unwrap();

        assert_eq!(
            get_user_by_email(&user.email, &connection)
                .unwrap()
                .password_hash,
            new_hash
        );
    }

    #[test]
    fn update_password_for_missing_user_is_not_found() {
        let connection = get_connection();

        assert_eq!(
            update_password(UserID::new(7), &hash(), &connection),
            Err(Error::NotFound)
        );
    }
}
