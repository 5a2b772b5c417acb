//! The overview page lists every application with a summary of its balances and payments.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use maud::{Markup, html};
use rusqlite::Connection;
use time::{OffsetDateTime, UtcOffset};

use crate::{
    AppState, Error,
    auth::current_user_id,
    endpoints,
    html::{PAGE_CONTAINER_STYLE, base, format_currency, format_date_time, link},
    ledger::KNOWN_APPLICATIONS,
    navigation::NavBar,
    stores::sqlite::lock_connection,
    timezone::get_local_offset,
};

/// The state needed for the overview page.
#[derive(Debug, Clone)]
pub struct OverviewState {
    pub cookie_key: Key,
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for OverviewState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

impl FromRef<OverviewState> for Key {
    fn from_ref(state: &OverviewState) -> Self {
        state.cookie_key.clone()
    }
}

/// The totals for one application.
#[derive(Debug, Clone, PartialEq)]
struct ApplicationSummary {
    name: String,
    balance_count: i64,
    balance_total: f64,
    payment_count: i64,
    total_paid: f64,
    last_payment: Option<OffsetDateTime>,
}

impl ApplicationSummary {
    fn empty(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            balance_count: 0,
            balance_total: 0.0,
            payment_count: 0,
            total_paid: 0.0,
            last_payment: None,
        }
    }
}

/// Display one card per known subscription service and one card for every other application
/// that has any balances, payments or contributions.
pub async fn get_overview_page(State(state): State<OverviewState>, jar: PrivateCookieJar) -> Response {
    let Some(local_offset) = get_local_offset(&state.local_timezone) else {
        return Error::InvalidTimezoneError(state.local_timezone).into_response();
    };

    let summaries = {
        let connection = match lock_connection(&state.db_connection) {
            Ok(connection) => connection,
            Err(error) => return error.into_response(),
        };

        match get_application_summaries(&connection) {
            Ok(summaries) => summaries,
            Err(error) => {
                tracing::error!("Could not get application summaries: {error}");
                return error.into_response();
            }
        }
    };

    let is_logged_in = current_user_id(&jar).is_some();

    (
        StatusCode::OK,
        overview_view(&summaries, local_offset, is_logged_in),
    )
        .into_response()
}

/// The totals for the known subscription services, in their usual order, followed by any other
/// recorded application in alphabetical order.
fn get_application_summaries(connection: &Connection) -> Result<Vec<ApplicationSummary>, Error> {
    let mut recorded = get_recorded_summaries(connection)?;

    let mut summaries: Vec<ApplicationSummary> = KNOWN_APPLICATIONS
        .iter()
        .map(|known| {
            match recorded.iter().position(|summary| summary.name == *known) {
                Some(index) => recorded.remove(index),
                None => ApplicationSummary::empty(known),
            }
        })
        .collect();
    summaries.append(&mut recorded);

    Ok(summaries)
}

fn get_recorded_summaries(connection: &Connection) -> Result<Vec<ApplicationSummary>, Error> {
    connection
        .prepare(
            "WITH names AS (
                SELECT application FROM balance
                UNION SELECT application FROM payment
                UNION SELECT application FROM contribution
            )
            SELECT
                names.application,
                (SELECT COUNT(*) FROM balance b WHERE b.application = names.application),
                (SELECT COALESCE(SUM(b.amount), 0.0) FROM balance b
                    WHERE b.application = names.application),
                (SELECT COUNT(*) FROM payment p WHERE p.application = names.application),
                (SELECT COALESCE(SUM(p.amount), 0.0) FROM payment p
                    WHERE p.application = names.application),
                (SELECT MAX(p.paid_at) FROM payment p WHERE p.application = names.application)
            FROM names
            ORDER BY names.application",
        )?
        .query_map([], |row| {
            Ok(ApplicationSummary {
                name: row.get(0)?,
                balance_count: row.get(1)?,
                balance_total: row.get(2)?,
                payment_count: row.get(3)?,
                total_paid: row.get(4)?,
                last_payment: row.get(5)?,
            })
        })?
        .map(|maybe_summary| maybe_summary.map_err(Error::from))
        .collect()
}

/// The application names to offer in forms.
///
/// This is the known subscription services followed by any other application
/// that has been recorded in the database, without duplicates.
pub fn get_application_names(connection: &Connection) -> Result<Vec<String>, Error> {
    let recorded: Vec<String> = connection
        .prepare(
            "SELECT application FROM balance
            UNION SELECT application FROM payment
            UNION SELECT application FROM contribution
            ORDER BY 1",
        )?
        .query_map([], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    let mut names: Vec<String> = KNOWN_APPLICATIONS.iter().map(|name| name.to_string()).collect();

    for name in recorded {
        if !names.contains(&name) {
            names.push(name);
        }
    }

    Ok(names)
}

fn overview_view(
    summaries: &[ApplicationSummary],
    local_offset: UtcOffset,
    is_logged_in: bool,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::ROOT, is_logged_in).into_html();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            h1 class="text-2xl font-bold mb-4" { "Subscriptions" }

            div class="grid gap-4 w-full max-w-screen-lg sm:grid-cols-2"
            {
                @for summary in summaries {
                    (summary_card(summary, local_offset))
                }
            }
        }
    };

    base("Overview", &[], &content)
}

fn summary_card(summary: &ApplicationSummary, local_offset: UtcOffset) -> Markup {
    let application_url =
        endpoints::with_query(endpoints::APPLICATION_VIEW, &[("name", &summary.name)]);

    html! {
        section
            class="p-6 bg-white border border-gray-200 rounded-lg shadow
                dark:bg-gray-800 dark:border-gray-700"
            data-application=(summary.name)
        {
            h2 class="mb-2 text-xl font-semibold"
            {
                (link(&application_url, &summary.name))
            }

            dl class="grid grid-cols-2 gap-1 text-sm"
            {
                dt { "Balances" }
                dd data-field="balance_count" { (summary.balance_count) }

                dt { "Total balance" }
                dd data-field="balance_total" { (format_currency(summary.balance_total)) }

                dt { "Payments" }
                dd data-field="payment_count" { (summary.payment_count) }

                dt { "Total paid" }
                dd data-field="total_paid" { (format_currency(summary.total_paid)) }

                dt { "Last payment" }
                dd data-field="last_payment"
                {
                    @match summary.last_payment {
                        Some(paid_at) => { (format_date_time(paid_at, local_offset)) }
                        None => { "Never" }
                    }
                }
            }
        }
    }
}
