//! The page and endpoint for recording money a member put towards a subscription.

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
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, base, dollar_input_styles, loading_spinner,
    },
    ledger::{Amount, ApplicationName, ContributorName},
    navigation::NavBar,
    overview::get_application_names,
    settlement::{
        ContributionRequest,
        form::{
            APPLICATION_OPTIONS_ID, CONTRIBUTOR_OPTIONS_ID, PrefillQuery, amount_input, datalist,
            error_message, text_input_with_options,
        },
        record_contribution,
    },
    stores::{
        BalanceStore,
        sqlite::{SQLiteBalanceStore, SQLiteContributionStore, lock_connection},
    },
};

/// The state needed for the new contribution page.
#[derive(Debug, Clone)]
pub struct NewContributionPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub balance_store: SQLiteBalanceStore,
}

impl FromRef<AppState> for NewContributionPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            balance_store: state.balance_store.clone(),
        }
    }
}

/// Render the page for recording a contribution.
///
/// Contributors that already have a balance are suggested, typing a new name adds a new
/// contributor.
pub async fn get_new_contribution_page(
    State(state): State<NewContributionPageState>,
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

    let contributor_names: Vec<String> = match state.balance_store.contributor_names() {
        Ok(names) => names.iter().map(|name| name.to_string()).collect(),
        Err(error) => {
            tracing::error!("Could not get contributor names: {error}");
            return error.into_response();
        }
    };

    let form_values = ContributionForm {
        application: query.application.unwrap_or_default(),
        ..Default::default()
    };

    (
        StatusCode::OK,
        new_contribution_view(&form_values, &application_names, &contributor_names),
    )
        .into_response()
}

/// The form data for recording a contribution.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContributionForm {
    pub application: String,
    pub contributor: String,
    pub amount: String,
}

/// The state needed for recording a contribution.
#[derive(Debug, Clone)]
pub struct CreateContributionState {
    pub contribution_store: SQLiteContributionStore,
    pub balance_store: SQLiteBalanceStore,
}

impl FromRef<AppState> for CreateContributionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            contribution_store: state.contribution_store.clone(),
            balance_store: state.balance_store.clone(),
        }
    }
}

/// Record a contribution and add it to the contributor's balance.
pub async fn create_contribution_endpoint(
    State(state): State<CreateContributionState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<ContributionForm>,
) -> Response {
    let request = match parse_form(&form, user_id) {
        Ok(request) => request,
        Err(error) => {
            return contribution_form_view(&form, &format!("Error: {error}")).into_response();
        }
    };

    let CreateContributionState {
        mut contribution_store,
        mut balance_store,
    } = state;

    match record_contribution(&mut contribution_store, &mut balance_store, request) {
        Ok(outcome) => {
            let alert = Alert::Success {
                message: "Contribution recorded".to_owned(),
                details: outcome.message(),
            };
            let next_form = ContributionForm {
                application: form.application,
                ..Default::default()
            };

            (
                StatusCode::OK,
                html! {
                    (contribution_form_view(&next_form, ""))
                    (alert.into_html())
                },
            )
                .into_response()
        }
        Err(error) => {
            tracing::error!("Could not record contribution: {error}");
            error.into_alert_response()
        }
    }
}

fn parse_form(form: &ContributionForm, user_id: UserID) -> Result<ContributionRequest, Error> {
    Ok(ContributionRequest {
        application: ApplicationName::new(&form.application)?,
        contributor: ContributorName::new(&form.contributor)?,
        amount: Amount::from_str(&form.amount)?,
        recorder_id: Some(user_id),
    })
}

fn new_contribution_view(
    form: &ContributionForm,
    application_names: &[String],
    contributor_names: &[String],
) -> Markup {
    let nav_bar = NavBar::new(endpoints::NEW_CONTRIBUTION_VIEW, true).into_html();

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            div class="w-full max-w-md space-y-4"
            {
                h1 class="text-xl font-bold leading-tight tracking-tight text-gray-900 md:text-2xl dark:text-white"
                {
                    "Record Contribution"
                }

                (datalist(APPLICATION_OPTIONS_ID, application_names))
                (datalist(CONTRIBUTOR_OPTIONS_ID, contributor_names))
                (contribution_form_view(form, ""))
            }
        }
    };

    base("Record Contribution", &[dollar_input_styles()], &content)
}

fn contribution_form_view(form: &ContributionForm, error: &str) -> Markup {
    html! {
        form
            hx-post=(endpoints::CONTRIBUTIONS_API)
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

            (text_input_with_options(
                "contributor",
                "Contributor",
                &form.contributor,
                CONTRIBUTOR_OPTIONS_ID,
                !form.application.is_empty(),
            ))

            (amount_input(&form.amount))

            (error_message(error))

            button type="submit" id="indicator" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="htmx-indicator" { (loading_spinner()) }
                "Record Contribution"
            }
        }
    }
}
