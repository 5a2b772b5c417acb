//! The session token carried by the auth cookie.
//!
//! A token names the logged in user and the instant their session ends. It is stored as compact
//! JSON with the expiry as a Unix timestamp, so sessions only have whole second precision.

use std::cmp::max;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{Error, auth::UserID};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Token {
    /// The user the session belongs to.
    #[serde(rename = "uid")]
    pub user_id: UserID,
    /// The session is invalid from this instant onwards.
    #[serde(rename = "exp", with = "time::serde::timestamp")]
    pub expires_at: OffsetDateTime,
}

impl Token {
    /// Start a session for `user_id` that lasts `duration` from `now`.
    ///
    /// # Errors
    ///
    /// Returns [Error::TokenError] if the expiry does not fit in a date time.
    pub fn issue(user_id: UserID, duration: Duration, now: OffsetDateTime) -> Result<Self, Error> {
        let expires_at = now
            .checked_add(duration)
            .ok_or_else(|| Error::TokenError("session expiry overflowed".to_owned()))?;

        Ok(Self {
            user_id,
            expires_at,
        })
    }

    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }

    /// Keep the session alive for at least `duration` from `now`.
    ///
    /// A token that already outlives the new expiry keeps its expiry, so a short refresh never
    /// cuts a remember-me session down.
    pub fn extended(self, duration: Duration, now: OffsetDateTime) -> Result<Self, Error> {
        let refreshed = Self::issue(self.user_id, duration, now)?;

        Ok(Self {
            expires_at: max(self.expires_at, refreshed.expires_at),
            ..self
        })
    }

    pub fn encode(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|error| Error::TokenError(error.to_string()))
    }

    pub fn decode(value: &str) -> Result<Self, Error> {
        serde_json::from_str(value).map_err(|error| Error::TokenError(error.to_string()))
    }
}
