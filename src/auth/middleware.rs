//! Route guards that admit requests with a live session and send everyone else to log in.
//!
//! Guarded handlers receive the logged in user as `Extension<UserID>`, which the settlement
//! endpoints record as the payer or recorder. Every admitted request pushes the session expiry
//! out by [DEFAULT_COOKIE_DURATION] so that active users are not logged out mid-form.

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{StatusCode, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use time::{Duration, UtcOffset};

use crate::{
    AppState,
    auth::{
        DEFAULT_COOKIE_DURATION,
        cookie::{extend_auth_cookie_duration_if_needed, get_token_from_cookies},
        redirect::{build_log_in_redirect_url, build_log_in_redirect_url_from_target},
    },
    endpoints,
    timezone::get_local_offset,
};

/// The state needed by the route guards.
#[derive(Clone)]
pub struct AuthState {
    /// The key for decrypting the auth cookie.
    pub cookie_key: Key,
    /// How long a fresh log-in lasts without "remember me".
    pub cookie_duration: Duration,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            local_timezone: state.local_timezone.clone(),
        }
    }
}

impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// How a guard sends a visitor without a session to the log-in page.
#[derive(Debug, Clone, Copy)]
enum LogInPrompt {
    /// A plain redirect for full page loads.
    Redirect,
    /// An `HX-Redirect` for HTMX form posts and deletes, which would otherwise swap the
    /// log-in page into the form.
    Htmx,
}

impl LogInPrompt {
    fn respond(self, log_in_url: &str) -> Response {
        match self {
            Self::Redirect => Redirect::to(log_in_url).into_response(),
            Self::Htmx => (HxRedirect(log_in_url.to_owned()), StatusCode::OK).into_response(),
        }
    }
}

/// The log-in URL that returns the visitor to the page they were on, or to the overview when
/// that page cannot be worked out.
fn log_in_url_for(request: &Request) -> String {
    build_log_in_redirect_url(request).unwrap_or_else(|| {
        tracing::warn!(
            "Could not work out the page behind {}. Returning to the overview after log-in.",
            request.uri().path()
        );

        build_log_in_redirect_url_from_target(endpoints::ROOT)
            .unwrap_or_else(|| endpoints::LOG_IN_VIEW.to_owned())
    })
}

/// Append the extended auth cookie to `response`.
///
/// The response goes out unchanged if the session cannot be extended, in which case the
/// client keeps the cookie it already has.
fn refresh_session(jar: PrivateCookieJar, local_offset: UtcOffset, response: Response) -> Response {
    let jar = match extend_auth_cookie_duration_if_needed(jar, DEFAULT_COOKIE_DURATION, local_offset)
    {
        Ok(jar) => jar,
        Err(error) => {
            tracing::error!("Could not extend session: {error}");
            return response;
        }
    };

    let cookies = jar.into_response();
    let (mut parts, body) = response.into_parts();
    for value in cookies.headers().get_all(SET_COOKIE) {
        parts.headers.append(SET_COOKIE, value.clone());
    }

    Response::from_parts(parts, body)
}

async fn guard(state: AuthState, request: Request, next: Next, prompt: LogInPrompt) -> Response {
    let log_in_url = log_in_url_for(&request);

    let Some(local_offset) = get_local_offset(&state.local_timezone) else {
        tracing::error!(
            "Unknown timezone {}. Sending the visitor to log in.",
            state.local_timezone
        );
        return prompt.respond(&log_in_url);
    };

    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(error) => {
            tracing::error!("Could not read cookies: {error:?}");
            return prompt.respond(&log_in_url);
        }
    };
    let token = match get_token_from_cookies(&jar) {
        Ok(token) => token,
        Err(error) => {
            tracing::debug!("No session for {}: {error}", parts.uri.path());
            return prompt.respond(&log_in_url);
        }
    };

    parts.extensions.insert(token.user_id);
    let response = next.run(Request::from_parts(parts, body)).await;

    refresh_session(jar, local_offset, response)
}

/// Guard for pages. Visitors without a session are redirected to the log-in page, which will
/// bring them back to the requested page afterwards.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    guard(state, request, next, LogInPrompt::Redirect).await
}

/// Guard for the HTMX endpoints under `/api`.
///
/// Visitors without a session get an `HX-Redirect` to the log-in page that returns them to the
/// page named in `HX-Current-URL`.
pub async fn auth_guard_hx(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    guard(state, request, next, LogInPrompt::Htmx).await
}
