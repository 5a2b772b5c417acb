//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    application::{
        delete_balance_endpoint, delete_contribution_endpoint, delete_payment_endpoint,
        get_application_page,
    },
    auth::{
        auth_guard, auth_guard_hx, get_log_in_page, get_log_out, get_register_page, post_log_in,
        register_user,
    },
    endpoints,
    internal_server_error::get_internal_server_error_page,
    not_found::get_404_not_found,
    overview::get_overview_page,
    settlement::{
        create_contribution_endpoint, create_payment_endpoint, get_new_contribution_page,
        get_new_payment_page,
    },
};

/// Return a router with all the app's routes.
///
/// The overview and application pages are public. Recording and deleting
/// ledger entries requires a logged in user.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::ROOT, get(get_overview_page))
        .route(endpoints::APPLICATION_VIEW, get(get_application_page))
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::REGISTER_VIEW, get(get_register_page))
        .route(endpoints::USERS, post(register_user))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_routes = Router::new()
        .route(endpoints::NEW_PAYMENT_VIEW, get(get_new_payment_page))
        .route(
            endpoints::NEW_CONTRIBUTION_VIEW,
            get(get_new_contribution_page),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These POST/DELETE routes need to use the HX-REDIRECT header for auth redirects to work properly for HTMX requests.
    let protected_routes = protected_routes.merge(
        Router::new()
            .route(endpoints::PAYMENTS_API, post(create_payment_endpoint))
            .route(
                endpoints::CONTRIBUTIONS_API,
                post(create_contribution_endpoint),
            )
            .route(endpoints::DELETE_PAYMENT, delete(delete_payment_endpoint))
            .route(
                endpoints::DELETE_CONTRIBUTION,
                delete(delete_contribution_endpoint),
            )
            .route(endpoints::DELETE_BALANCE, delete(delete_balance_endpoint))
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx)),
    );

    protected_routes
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}
