//! Defines functions for handling user authentication with cookies.
//!
//! The auth cookie holds an encoded [Token] with the user ID and the expiry of the session.
//! The cookie is private, so the token is encrypted and cannot be read or forged by the client.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime, UtcOffset};

use crate::{
    Error,
    auth::{UserID, token::Token},
};

pub(crate) const COOKIE_TOKEN: &str = "token";
/// The default duration for which auth cookies are valid.
pub const DEFAULT_COOKIE_DURATION: Duration = Duration::minutes(5);

fn build_token_cookie(token: &Token) -> Result<Cookie<'static>, Error> {
    Ok(Cookie::build((COOKIE_TOKEN, token.encode()?))
        .expires(token.expires_at)
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(true)
        .path("/")
        .build())
}

/// Add an auth cookie to the cookie jar, indicating that a user is logged in and authenticated.
///
/// Sets the expiry of the cookie to `duration` from the current time, expressed in `local_offset`.
/// You can use [DEFAULT_COOKIE_DURATION] for the default duration.
///
/// # Errors
///
/// Returns an [Error::TokenError] if the token could not be encoded or its expiry overflows.
pub fn set_auth_cookie(
    jar: PrivateCookieJar,
    user_id: UserID,
    duration: Duration,
    local_offset: UtcOffset,
) -> Result<PrivateCookieJar, Error> {
    let now = OffsetDateTime::now_utc().to_offset(local_offset);
    let cookie = build_token_cookie(&Token::issue(user_id, duration, now)?)?;

    Ok(jar.add(cookie))
}

/// Set the auth cookie to an invalid value and set its max age to zero, which should delete the
/// cookie on the client side.
pub fn invalidate_auth_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_TOKEN, "deleted"))
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true)
            .path("/"),
    )
}

/// Read and validate the auth token in `jar`.
///
/// # Errors
///
/// Returns:
/// - [Error::CookieMissing] if there is no auth cookie in the jar.
/// - [Error::TokenError] if the cookie does not hold a valid token.
/// - [Error::SessionExpired] if the token has expired.
pub(crate) fn get_token_from_cookies(jar: &PrivateCookieJar) -> Result<Token, Error> {
    let cookie = jar.get(COOKIE_TOKEN).ok_or(Error::CookieMissing)?;
    let token = Token::decode(cookie.value_trimmed())?;

    if token.is_expired_at(OffsetDateTime::now_utc()) {
        return Err(Error::SessionExpired);
    }

    Ok(token)
}

/// The ID of the logged in user, or `None` if there is no valid session.
///
/// Use this on public pages that only change appearance for logged in users.
pub fn current_user_id(jar: &PrivateCookieJar) -> Option<UserID> {
    get_token_from_cookies(jar).ok().map(|token| token.user_id)
}

/// Set the expiry of the auth cookie in `jar` to the latest of now plus `duration` and the
/// token's current expiry.
///
/// # Errors
///
/// The cookie jar is not modified if an error is returned.
///
/// Returns an error if the auth cookie is missing, invalid or has expired,
/// or if extending the expiry by `duration` would overflow the date time.
pub(crate) fn extend_auth_cookie_duration_if_needed(
    jar: PrivateCookieJar,
    duration: Duration,
    local_offset: UtcOffset,
) -> Result<PrivateCookieJar, Error> {
    let now = OffsetDateTime::now_utc().to_offset(local_offset);
    let token = get_token_from_cookies(&jar)?.extended(duration, now)?;
    let cookie = build_token_cookie(&token)?;

    Ok(jar.add(cookie))
}
