//! This file defines the routes for displaying the log-in page and handling log-in requests.
//! The auth module handles the lower level authentication and cookie auth logic.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error,
    auth::{
        UserID, invalidate_auth_cookie,
        redirect::normalize_redirect_url,
        set_auth_cookie,
        user::{get_user_by_email, parse_email},
    },
    endpoints,
    html::{base, email_input, loading_spinner, log_in_register, password_input},
    stores::sqlite::lock_connection,
    timezone::get_local_offset,
};

fn log_in_form(
    email: &str,
    email_error: Option<&str>,
    password_error: Option<&str>,
    redirect_url: Option<&str>,
) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN_API)
            hx-indicator="#indicator"
            hx-disabled-elt="#email, #password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            @if let Some(redirect_url) = redirect_url {
                input type="hidden" name="redirect_url" value=(redirect_url);
            }

            (email_input(email, email_error))
            (password_input("", 0, password_error))

            div class="flex items-center gap-x-3"
            {
                input
                    type="checkbox"
                    name="remember_me"
                    id="remember_me"
                    tabindex="0"
                    class="rounded-xs";

                label
                    for="remember_me"
                    class="block text-sm font-medium text-gray-900 dark:text-white"
                {
                    "Keep me logged in for one week"
                }
            }

            button
                type="submit" id="submit-button" tabindex="0"
                class="w-full px-4 py-2 bg-blue-500 dark:bg-blue-600 disabled:bg-blue-700
                    hover:enabled:bg-blue-600 hover:enabled:dark:bg-blue-700 text-white rounded"
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Log in"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400" {
                "Don't have an account? "
                a
                    href=(endpoints::REGISTER_VIEW) tabindex="0"
                    class="font-semibold leading-6 text-blue-600 hover:text-blue-500 dark:text-blue-500 dark:hover:text-blue-400"
                {
                  "Register here"
                }
            }
        }
    }
}

fn parse_redirect_url(raw_url: Option<&str>, source: &str) -> Option<String> {
    match raw_url.and_then(normalize_redirect_url) {
        Some(redirect_url) => Some(redirect_url),
        None => {
            if let Some(redirect_url) = raw_url {
                tracing::warn!("Invalid redirect URL from {source}: {redirect_url}");
            }
            None
        }
    }
}

/// Display the log-in page.
pub async fn get_log_in_page(Query(query): Query<RedirectQuery>) -> Response {
    let redirect_url = parse_redirect_url(query.redirect_url.as_deref(), "log-in query");
    let log_in_form = log_in_form("", None, None, redirect_url.as_deref());
    let content = log_in_register("Log in to your account", &log_in_form);
    base("Log In", &[], &content).into_response()
}

/// How long the auth cookie should last if the user selects "remember me" at log-in.
const REMEMBER_ME_COOKIE_DURATION: Duration = Duration::days(7);

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// The connection used to look up registered users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

const INTERNAL_ERROR_MSG: &str = "An internal error occurred. Please try again later.";

/// Look up the user with `email` and check their password.
///
/// A missing user and a wrong password both give [Error::InvalidCredentials] so that the
/// response does not reveal which email addresses are registered.
fn check_credentials(
    email: &str,
    password: &str,
    connection: &Mutex<Connection>,
) -> Result<UserID, Error> {
    let email = parse_email(email)?;
    let lookup = {
        let connection = lock_connection(connection)?;
        get_user_by_email(&email, &connection)
    };
    let user = match lookup {
        Ok(user) => user,
        Err(Error::NotFound) => return Err(Error::InvalidCredentials),
        Err(error) => return Err(error),
    };

    if user.password_hash.verify(password)? {
        Ok(user.id)
    } else {
        Err(Error::InvalidCredentials)
    }
}

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in request, the auth cookie is set and the client is redirected to the
/// requested page, or the overview page if none was requested.
/// Otherwise, the form is returned with an error message explaining the problem.
pub async fn post_log_in(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<LogInData>,
) -> Response {
    let redirect_url = parse_redirect_url(user_data.redirect_url.as_deref(), "log-in form");
    let redirect_url = redirect_url.as_deref();

    let user_id = match check_credentials(
        &user_data.email,
        &user_data.password,
        &state.db_connection,
    ) {
        Ok(user_id) => user_id,
        Err(error @ Error::InvalidEmail(_)) => {
            return log_in_form(
                &user_data.email,
                Some(&error.to_string()),
                None,
                redirect_url,
            )
            .into_response();
        }
        Err(error @ Error::InvalidCredentials) => {
            tracing::info!("Failed log-in attempt for {}", user_data.email.trim());
            return log_in_form(
                &user_data.email,
                None,
                Some(&error.to_string()),
                redirect_url,
            )
            .into_response();
        }
        Err(error) => {
            tracing::error!("Unhandled error while verifying credentials: {error}");
            return log_in_form(
                &user_data.email,
                None,
                Some(INTERNAL_ERROR_MSG),
                redirect_url,
            )
            .into_response();
        }
    };

    let cookie_duration = if user_data.remember_me.is_some() {
        REMEMBER_ME_COOKIE_DURATION
    } else {
        state.cookie_duration
    };

    let local_timezone = match get_local_offset(&state.local_timezone) {
        Some(offset) => offset,
        None => return Error::InvalidTimezoneError(state.local_timezone).into_response(),
    };

    let redirect_url = redirect_url.unwrap_or(endpoints::ROOT);

    set_auth_cookie(jar.clone(), user_id, cookie_duration, local_timezone)
        .map(|updated_jar| {
            (
                StatusCode::SEE_OTHER,
                HxRedirect(redirect_url.to_owned()),
                updated_jar,
            )
        })
        .map_err(|err| {
            tracing::error!("Error setting auth cookie: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                HxRedirect(endpoints::INTERNAL_ERROR_VIEW.to_owned()),
                invalidate_auth_cookie(jar),
            )
        })
        .into_response()
}

#[derive(Deserialize)]
pub struct RedirectQuery {
    pub redirect_url: Option<String>,
}

/// The raw data entered by the user in the log-in form.
///
/// The password is stored as a plain string. There is no need for validation here since
/// it will be compared against the password in the database, which has been verified.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInData {
    /// Email address entered during log-in.
    pub email: String,

    /// Password entered during log-in.
    pub password: String,

    /// Whether to extend the initial auth cookie duration.
    ///
    /// This value comes from a checkbox, so it either has a string value or is not set
    /// (see the [MDN docs](https://developer.mozilla.org/en-US/docs/Web/HTML/Element/input/checkbox#value_2)).
    /// The `Some` variant should be interpreted as `true` irregardless of the
    /// string value, and the `None` variant should be interpreted as `false`.
    pub remember_me: Option<String>,

    /// Optional URL to redirect to after logging in.
    /// Only accepted from the log-in form submission.
    pub redirect_url: Option<String>,
}

#[cfg(test)]
fn get_test_state() -> LoginState {
    use crate::{app_state::create_cookie_key, auth::DEFAULT_COOKIE_DURATION, db::initialize};

    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");
    initialize(&connection).expect("Could not initialize database");

    LoginState {
        cookie_key: create_cookie_key("foobar"),
        cookie_duration: DEFAULT_COOKIE_DURATION,
        local_timezone: "Etc/UTC".to_owned(),
        db_connection: Arc::new(Mutex::new(connection)),
    }
}


#[cfg(test)]
mod log_in_tests {
    use std::collections::HashSet;

    use axum::{
        Form, Router,
        body::Body,
        extract::State,
        http::{Response, StatusCode, header::SET_COOKIE},
        routing::post,
    };
    use axum_extra::extract::{PrivateCookieJar, cookie::Cookie};
    use axum_test::TestServer;
    use time::{Duration, OffsetDateTime};

    use crate::{
        Error, PasswordHash, ValidatedPassword,
        auth::{COOKIE_TOKEN, create_user, get_user_by_email, user::parse_email},
        endpoints,
        stores::sqlite::lock_connection,
        test_utils::{assert_hx_redirect, parse_html_fragment},
    };

    use super::{
        LogInData, LoginState, REMEMBER_ME_COOKIE_DURATION, check_credentials, get_test_state,
        post_log_in,
    };

    const EMAIL: &str = "dana@example.com";
    const PASSWORD: &str = "correcthorsebatterystaple";

    fn get_state_with_user() -> LoginState {
        let state = get_test_state();
        let password_hash =
            PasswordHash::new(ValidatedPassword::new_unchecked(PASSWORD), 4).unwrap();
        create_user(
            parse_email(EMAIL).unwrap(),
            Some("Dana"),
            password_hash,
            &lock_connection(&state.db_connection).unwrap(),
        )
        .unwrap();

        state
    }

    fn log_in_data(email: &str, password: &str) -> LogInData {
        LogInData {
            email: email.to_owned(),
            password: password.to_owned(),
            remember_me: None,
            redirect_url: None,
        }
    }

    async fn new_log_in_request(state: LoginState, log_in_form: LogInData) -> Response<Body> {
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        post_log_in(State(state), jar, Form(log_in_form)).await
    }

    #[tokio::test]
    async fn log_in_succeeds_with_valid_credentials() {
        let response = new_log_in_request(get_state_with_user(), log_in_data(EMAIL, PASSWORD)).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::ROOT);
        assert_set_cookie(&response);
    }

    #[tokio::test]
    async fn log_in_trims_whitespace_around_email() {
        let response =
            new_log_in_request(get_state_with_user(), log_in_data("  dana@example.com ", PASSWORD))
                .await;

        assert_hx_redirect(&response, endpoints::ROOT);
    }

    #[tokio::test]
    async fn log_in_redirects_to_requested_url() {
        let redirect_url = "/application?name=YouTube+Premium";
        let mut form = log_in_data(EMAIL, PASSWORD);
        form.redirect_url = Some(redirect_url.to_owned());

        let response = new_log_in_request(get_state_with_user(), form).await;

        assert_hx_redirect(&response, redirect_url);
    }

    #[tokio::test]
    async fn log_in_falls_back_on_invalid_redirect_url() {
        let mut form = log_in_data(EMAIL, PASSWORD);
        form.redirect_url = Some("https://example.com".to_owned());

        let response = new_log_in_request(get_state_with_user(), form).await;

        assert_hx_redirect(&response, endpoints::ROOT);
    }

    #[tokio::test]
    async fn log_in_fails_with_incorrect_password() {
        let response =
            new_log_in_request(get_state_with_user(), log_in_data(EMAIL, "wrongpassword")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_password_error(response, "invalid email or password").await;
    }

    #[test]
    fn check_credentials_returns_registered_user_id() {
        let state = get_state_with_user();
        let want_id = get_user_by_email(
            &parse_email(EMAIL).unwrap(),
            &lock_connection(&state.db_connection).unwrap(),
        )
        .unwrap()
        .id;

        let got = check_credentials(EMAIL, PASSWORD, &state.db_connection);

        assert_eq!(got, Ok(want_id));
    }

    #[test]
    fn check_credentials_hides_unknown_email() {
        let state = get_state_with_user();

        let got = check_credentials("nobody@example.com", PASSWORD, &state.db_connection);

        assert_eq!(got, Err(Error::InvalidCredentials));
    }

    #[tokio::test]
    async fn log_in_fails_with_unknown_email() {
        let response = new_log_in_request(
            get_state_with_user(),
            log_in_data("nobody@example.com", PASSWORD),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_password_error(response, "invalid email or password").await;
    }

    #[tokio::test]
    async fn log_in_fails_with_missing_credentials() {
        let app = Router::new()
            .route(endpoints::LOG_IN_API, post(post_log_in))
            .with_state(get_test_state());
        let server = TestServer::try_new(app).expect("Could not create test server.");

        server
            .post(endpoints::LOG_IN_API)
            .content_type("application/x-www-form-urlencoded")
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn form_deserialises_without_remember_me() {
        let app = Router::new()
            .route(endpoints::LOG_IN_API, post(post_log_in))
            .with_state(get_test_state());
        let server = TestServer::try_new(app).expect("Could not create test server.");
        let form = [("email", EMAIL), ("password", "test")];

        let response = server.post(endpoints::LOG_IN_API).form(&form).await;

        assert_ne!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    /// Test helper macro to assert that two date times are within two seconds
    /// of each other. Used instead of a function so that the file and line
    /// number of the caller is included in the error message instead of the
    /// helper.
    macro_rules! assert_date_time_close {
        ($left:expr, $right:expr$(,)?) => {
            assert!(
                ($left - $right).abs() < Duration::seconds(2),
                "got date time {:?}, want {:?}",
                $left,
                $right
            );
        };
    }

    #[tokio::test]
    async fn remember_me_extends_auth_cookie_through_form() {
        let app = Router::new()
            .route(endpoints::LOG_IN_API, post(post_log_in))
            .with_state(get_state_with_user());
        let server = TestServer::try_new(app).expect("Could not create test server.");
        let form = [("email", EMAIL), ("password", PASSWORD), ("remember_me", "on")];

        let response = server.post(endpoints::LOG_IN_API).form(&form).await;

        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        let token_cookie = response.cookie(COOKIE_TOKEN);
        assert_date_time_close!(
            token_cookie.expires_datetime().unwrap(),
            OffsetDateTime::now_utc() + REMEMBER_ME_COOKIE_DURATION
        );
    }

    #[track_caller]
    fn assert_set_cookie(response: &Response<Body>) {
        let mut found_cookies = HashSet::new();

        for cookie_headers in response.headers().get_all(SET_COOKIE) {
            let cookie_string = cookie_headers.to_str().unwrap();
            let cookie = Cookie::parse(cookie_string).unwrap();

            match cookie.name() {
                COOKIE_TOKEN => {
                    assert!(cookie.expires_datetime() > Some(OffsetDateTime::now_utc()));
                    found_cookies.insert(cookie.name().to_string());
                }
                _ => panic!("Unexpected cookie found: {}", cookie.name()),
            }
        }

        assert!(
            found_cookies.contains(COOKIE_TOKEN),
            "could not find cookie '{}' in {:?}",
            COOKIE_TOKEN,
            found_cookies
        );
    }

    async fn assert_password_error(response: Response<Body>, message: &str) {
        let html = parse_html_fragment(response).await;
        let error_selector = scraper::Selector::parse("input#password + p.text-red-500").unwrap();
        let error = html
            .select(&error_selector)
            .next()
            .expect("expected error message paragraph");
        let error_text = error.text().collect::<String>();
        assert_eq!(
            error_text.trim(),
            message,
            "response body should include error message \"{message}\", got \"{error_text}\""
        );
    }
}
