//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/balances/{balance_id}', use [format_endpoint].

/// The overview page listing every application.
pub const ROOT: &str = "/";
/// The management page for a single application, selected with the `name` query parameter.
pub const APPLICATION_VIEW: &str = "/application";
/// The page for recording a payment made to a vendor.
pub const NEW_PAYMENT_VIEW: &str = "/payments/new";
/// The page for recording a contribution.
pub const NEW_CONTRIBUTION_VIEW: &str = "/contributions/new";
/// The route for getting the registration page.
pub const REGISTER_VIEW: &str = "/register";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route to create users.
pub const USERS: &str = "/api/users";
/// The route to record and settle a vendor payment.
pub const PAYMENTS_API: &str = "/api/payments";
/// The route to delete a vendor payment.
pub const DELETE_PAYMENT: &str = "/api/payments/{payment_id}";
/// The route to record a contribution.
pub const CONTRIBUTIONS_API: &str = "/api/contributions";
/// The route to delete a contribution history entry.
pub const DELETE_CONTRIBUTION: &str = "/api/contributions/{contribution_id}";
/// The route to delete a balance.
pub const DELETE_BALANCE: &str = "/api/balances/{balance_id}";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

/// Build the URL of `endpoint_path` with the query string `params`.
///
/// Values are percent encoded, so application names with spaces produce valid URLs.
/// Returns `endpoint_path` unchanged if the query string cannot be encoded.
pub fn with_query(endpoint_path: &str, params: &[(&str, &str)]) -> String {
    match serde_urlencoded::to_string(params) {
        Ok(query) if !query.is_empty() => format!("{endpoint_path}?{query}"),
        Ok(_) => endpoint_path.to_owned(),
        Err(error) => {
            tracing::error!("Could not encode query parameters {params:?}: {error}");
            endpoint_path.to_owned()
        }
    }
}
