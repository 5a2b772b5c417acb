//! SubChecks is a web app for splitting recurring subscription costs among a
//! group of people.
//!
//! Members record contributions into a per-application balance pool, and when
//! someone pays the vendor the payment is split evenly across the existing
//! balances for that application.
//!
//! This library provides a REST API that directly serves HTML pages.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

mod alert;
mod app_state;
mod application;
mod auth;
mod database_id;
mod db;
mod endpoints;
mod html;
mod internal_server_error;
mod ledger;
mod logging;
mod navigation;
mod not_found;
mod overview;
mod pagination;
mod routing;
mod settlement;
pub mod stores;
mod timezone;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use auth::{
    PasswordHash, User, UserID, ValidatedPassword, create_user, get_user_by_email, parse_email,
    update_password,
};
pub use db::initialize as initialize_db;
pub use ledger::{
    Amount, ApplicationName, Balance, ContributionEntry, ContributorName, PaymentRecord,
};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use pagination::PaginationConfig;
pub use routing::build_router;
pub use settlement::{
    ContributionOutcome, ContributionRequest, SettlementOutcome, SettlementRequest,
    record_contribution, settle_payment,
};
pub use timezone::get_local_offset;

use crate::{
    alert::Alert,
    internal_server_error::InternalServerError,
    not_found::get_404_not_found_response,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// An empty string was used as an application (vendor) name.
    #[error("Application name cannot be empty")]
    EmptyApplicationName,

    /// An empty string was used as a contributor's display name.
    #[error("Contributor name cannot be empty")]
    EmptyContributorName,

    /// The amount was not a positive, finite number.
    ///
    /// Callers should pass in the raw input that caused the error.
    #[error("\"{0}\" is not a valid amount, enter a number greater than zero")]
    InvalidAmount(String),

    /// The email address could not be parsed.
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// The password and its confirmation were different.
    #[error("passwords do not match")]
    PasswordsDoNotMatch,

    /// The email and password combination did not match a registered user.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The auth token cookie is missing from the cookie jar in the request.
    #[error("no cookies in the cookie jar :(")]
    CookieMissing,

    /// The auth token in the cookie jar has expired.
    #[error("the session has expired")]
    SessionExpired,

    /// The auth token could not be serialized or deserialized.
    #[error("could not read or write the auth token: {0}")]
    TokenError(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The email address already belongs to a registered user.
    #[error("the email address is already registered")]
    DuplicateEmail,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// Tried to update a balance that does not exist
    #[error("tried to update a balance that is not in the database")]
    UpdateMissingBalance,

    /// Tried to delete a balance that does not exist
    #[error("tried to delete a balance that is not in the database")]
    DeleteMissingBalance,

    /// Tried to delete a payment that does not exist
    #[error("tried to delete a payment that is not in the database")]
    DeleteMissingPayment,

    /// Tried to delete a contribution that does not exist
    #[error("tried to delete a contribution that is not in the database")]
    DeleteMissingContribution,

    /// A payment was recorded but not every balance could be updated.
    ///
    /// The `updated` balances keep their new amounts, nothing is rolled back.
    #[error("the payment was recorded but only {updated} of {total} balances were updated: {source}")]
    PartialSettlement {
        /// The number of balances that were updated before the failure.
        updated: usize,
        /// The number of balances that should have been updated.
        total: usize,
        /// The error that stopped the settlement.
        source: Box<Error>,
    },

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),
}

impl Error {
    /// Whether the error was caused by invalid user input.
    ///
    /// Validation errors are raised before anything is written to the database.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::EmptyApplicationName
                | Error::EmptyContributorName
                | Error::InvalidAmount(_)
                | Error::InvalidEmail(_)
                | Error::TooWeak(_)
                | Error::PasswordsDoNotMatch
        )
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    fn into_alert_response(self) -> Response {
        let status_code = match self {
            ref error if error.is_validation() => StatusCode::BAD_REQUEST,
            Error::UpdateMissingBalance
            | Error::DeleteMissingBalance
            | Error::DeleteMissingPayment
            | Error::DeleteMissingContribution
            | Error::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let alert = match self {
            error if error.is_validation() => Alert::Error {
                message: "Invalid input".to_owned(),
                details: error.to_string(),
            },
            Error::UpdateMissingBalance => Alert::Error {
                message: "Could not update balance".to_owned(),
                details: "The balance could not be found.".to_owned(),
            },
            Error::DeleteMissingBalance => Alert::Error {
                message: "Could not delete balance".to_owned(),
                details: "The balance could not be found. \
                    Try refreshing the page to see if the balance has already been deleted."
                    .to_owned(),
            },
            Error::DeleteMissingPayment => Alert::Error {
                message: "Could not delete payment".to_owned(),
                details: "The payment could not be found. \
                    Try refreshing the page to see if the payment has already been deleted."
                    .to_owned(),
            },
            Error::DeleteMissingContribution => Alert::Error {
                message: "Could not delete contribution".to_owned(),
                details: "The contribution could not be found. \
                    Try refreshing the page to see if the contribution has already been deleted."
                    .to_owned(),
            },
            Error::PartialSettlement {
                updated,
                total,
                source,
            } => Alert::Error {
                message: "Payment only partially applied".to_owned(),
                details: format!(
                    "The payment was recorded but only {updated} of {total} balances were \
                    updated: {source}. Check the balances before trying again."
                ),
            },
            error @ Error::SqlError(_) => Alert::Error {
                message: "Could not save your changes".to_owned(),
                details: error.to_string(),
            },
            Error::DatabaseLockError => Alert::ErrorSimple {
                message: "The server is busy, please try again in a moment.".to_owned(),
            },
            Error::InvalidTimezoneError(timezone) => Alert::Error {
                message: "Invalid Timezone Settings".to_owned(),
                details: format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            },
            _ => Alert::Error {
                message: "Something went wrong".to_owned(),
                details: "An unexpected error occurred, check the server logs for more details."
                    .to_owned(),
            },
        };

        (status_code, alert).into_response()
    }
}

#[cfg(test)]
mod error_tests {
    use axum::{http::StatusCode, response::Response};

    use crate::{
        Error,
        test_utils::{must_get_alert_text, parse_html_fragment},
    };

    async fn alert_text(response: Response) -> String {
        must_get_alert_text(&parse_html_fragment(response).await)
    }

    #[test]
    fn validation_errors_are_classified() {
        assert!(Error::EmptyApplicationName.is_validation());
        assert!(Error::EmptyContributorName.is_validation());
        assert!(Error::InvalidAmount("0".to_owned()).is_validation());
        assert!(!Error::DatabaseLockError.is_validation());
        assert!(!Error::NotFound.is_validation());
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        let error: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(error, Error::NotFound);
    }

    #[test]
    fn validation_alert_is_bad_request() {
        let response = Error::EmptyApplicationName.into_alert_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_row_alert_is_not_found() {
        let response = Error::DeleteMissingPayment.into_alert_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn store_error_alert_shows_store_message() {
        let error = Error::SqlError(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_IOERR),
            Some("disk I/O error on table balance".to_owned()),
        ));

        let response = error.into_alert_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let text = alert_text(response).await;
        assert!(
            text.contains("disk I/O error on table balance"),
            "want store message in alert, got {text:?}"
        );
    }

    #[tokio::test]
    async fn partial_settlement_alert_shows_cause() {
        let error = Error::PartialSettlement {
            updated: 2,
            total: 3,
            source: Box::new(Error::DatabaseLockError),
        };

        let response = error.into_alert_response();

        let text = alert_text(response).await;
        assert!(text.contains("only 2 of 3 balances"), "got {text:?}");
        assert!(
            text.contains("could not acquire the database lock"),
            "want cause in alert, got {text:?}"
        );
    }

    #[test]
    fn partial_settlement_message_includes_counts() {
        let error = Error::PartialSettlement {
            updated: 1,
            total: 3,
            source: Box::new(Error::DatabaseLockError),
        };

        assert_eq!(
            error.to_string(),
            "the payment was recorded but only 1 of 3 balances were updated: \
            could not acquire the database lock"
        );
    }
}
