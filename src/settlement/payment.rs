//! The page and endpoint for recording a payment made to a vendor.

use std::{
    str::FromStr,
    sync::{Arc, Mutex},
};

use axum::{
    Extension, Form,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    alert::Alert,
    auth::UserID,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
        dollar_input_styles, loading_spinner,
    },
    ledger::{Amount, ApplicationName},
    navigation::NavBar,
    overview::get_application_names,
    settlement::{
        SettlementRequest,
        form::{
            APPLICATION_OPTIONS_ID, PrefillQuery, amount_input, datalist, error_message,
            text_input_with_options,
        },
        settle_payment,
    },
    stores::sqlite::{SQLiteBalanceStore, SQLitePaymentStore, lock_connection},
};

/// The state needed for the new payment page.
#[derive(Debug, Clone)]
pub struct NewPaymentPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for NewPaymentPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the page for recording a vendor payment.
///
/// The application field is prefilled from the `application` query parameter.
pub async fn get_new_payment_page(
    State(state): State<NewPaymentPageState>,
    Query(query): Query<PrefillQuery>,
) -> Response {
    let application_names = {
        let connection = match lock_connection(&state.db_connection) {
            Ok(connection) => connection,
            Err(error) => return error.into_response(),
        };

        match get_application_names(&connection) {
            Ok(names) => names,
            Err(error) => {
                tracing::error!("Could not get application names: {error}");
                return error.into_response();
            }
        }
    };

    let form_values = PaymentForm {
        application: query.application.unwrap_or_default(),
        ..Default::default()
    };

    (
        StatusCode::OK,
        new_payment_view(&form_values, &application_names),
    )
        .into_response()
}

/// The form data for recording a payment.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentForm {
    pub application: String,
    /// The raw amount is kept as text so that it can be shown back to the user when it is invalid.
    pub amount: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// The state needed for recording a payment.
#[derive(Debug, Clone)]
pub struct CreatePaymentState {
    pub payment_store: SQLitePaymentStore,
    pub balance_store: SQLiteBalanceStore,
}

impl FromRef<AppState> for CreatePaymentState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            payment_store: state.payment_store.clone(),
            balance_store: state.balance_store.clone(),
        }
    }
}

/// Record a payment and split it across the application's balances.
///
/// Responds with a fresh form and a success alert, or the submitted form with
/// an error message when the input is invalid.
pub async fn create_payment_endpoint(
    State(state): State<CreatePaymentState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<PaymentForm>,
) -> Response {
    let request = match parse_form(&form, user_id) {
        Ok(request) => request,
        Err(error) => {
            return payment_form_view(&form, &format!("Error: {error}")).into_response();
        }
    };

    let CreatePaymentState {
        mut payment_store,
        mut balance_store,
    } = state;

    match settle_payment(&mut payment_store, &mut balance_store, request) {
        Ok(outcome) => {
            let alert = Alert::Success {
                message: "Payment recorded".to_owned(),
                details: outcome.message(),
            };
            let next_form = PaymentForm {
                application: form.application,
                ..Default::default()
            };

            (
                StatusCode::OK,
                html! {
                    (payment_form_view(&next_form, ""))
                    (alert.into_html())
                },
            )
                .into_response()
        }
        Err(error) => {
            tracing::error!("Could not record payment: {error}");
            error.into_alert_response()
        }
    }
}

fn parse_form(form: &PaymentForm, user_id: UserID) -> Result<SettlementRequest, Error> {
    Ok(SettlementRequest {
        application: ApplicationName::new(&form.application)?,
        amount: Amount::from_str(&form.amount)?,
        payer_id: Some(user_id),
        description: form.description.clone(),
    })
}

fn new_payment_view(form: &PaymentForm, application_names: &[String]) -> Markup {
    let nav_bar = NavBar::new(endpoints::NEW_PAYMENT_VIEW, true).into_html();

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            div class="w-full max-w-md space-y-4"
            {
                h1 class="text-xl font-bold leading-tight tracking-tight text-gray-900 md:text-2xl dark:text-white"
                {
                    "Record Payment"
                }

                p class="text-sm text-gray-600 dark:text-gray-400"
                {
                    "The payment is split evenly between everyone with a balance for the application."
                }

                (datalist(APPLICATION_OPTIONS_ID, application_names))
                (payment_form_view(form, ""))
            }
        }
    };

    base("Record Payment", &[dollar_input_styles()], &content)
}

fn payment_form_view(form: &PaymentForm, error: &str) -> Markup {
    html! {
        form
            hx-post=(endpoints::PAYMENTS_API)
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            hx-indicator="#indicator"
            class="w-full space-y-4 md:space-y-6"
        {
            (text_input_with_options(
                "application",
                "Application",
                &form.application,
                APPLICATION_OPTIONS_ID,
                form.application.is_empty(),
            ))

            (amount_input(&form.amount))

            div
            {
                label for="description" class=(FORM_LABEL_STYLE) { "Description (optional)" }

                input
                    id="description"
                    type="text"
                    name="description"
                    value=[form.description.as_deref()]
                    placeholder="e.g. March bill"
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            (error_message(error))

            button type="submit" id="indicator" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="htmx-indicator" { (loading_spinner()) }
                "Record Payment"
            }
        }
    }
}
