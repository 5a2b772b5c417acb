//! Renders the balances, payments and contribution history for an application.

use axum::{
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use maud::{Markup, html};
use serde::Deserialize;
use time::UtcOffset;

use crate::{
    AppState, Error,
    auth::current_user_id,
    endpoints::{self, format_endpoint, with_query},
    html::{
        BUTTON_DELETE_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency, format_date_time,
    },
    ledger::{ApplicationName, Balance, ContributionEntry, PaymentRecord},
    navigation::NavBar,
    pagination::{Page, PaginationConfig, create_pagination_indicators, paginate, pagination_view},
    stores::{
        BalanceStore, ContributionStore, PaymentStore,
        sqlite::{SQLiteBalanceStore, SQLiteContributionStore, SQLitePaymentStore},
    },
    timezone::get_local_offset,
};

/// The state needed for the application page.
#[derive(Debug, Clone)]
pub struct ApplicationPageState {
    pub cookie_key: Key,
    pub local_timezone: String,
    pub pagination_config: PaginationConfig,
    pub balance_store: SQLiteBalanceStore,
    pub payment_store: SQLitePaymentStore,
    pub contribution_store: SQLiteContributionStore,
}

impl FromRef<AppState> for ApplicationPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            local_timezone: state.local_timezone.clone(),
            pagination_config: state.pagination_config.clone(),
            balance_store: state.balance_store.clone(),
            payment_store: state.payment_store.clone(),
            contribution_store: state.contribution_store.clone(),
        }
    }
}

impl FromRef<ApplicationPageState> for Key {
    fn from_ref(state: &ApplicationPageState) -> Self {
        state.cookie_key.clone()
    }
}

/// The query string for the application page.
#[derive(Debug, Default, Deserialize)]
pub struct ApplicationQuery {
    #[serde(default)]
    pub name: String,
    pub payments_page: Option<u64>,
    pub history_page: Option<u64>,
}

/// Display the application page.
///
/// Anyone can view the page, the delete buttons are only shown to logged in users.
/// An application that has nothing recorded shows empty tables.
pub async fn get_application_page(
    State(state): State<ApplicationPageState>,
    Query(query): Query<ApplicationQuery>,
    jar: PrivateCookieJar,
) -> Response {
    let Ok(application) = ApplicationName::new(&query.name) else {
        return Error::NotFound.into_response();
    };

    let Some(local_offset) = get_local_offset(&state.local_timezone) else {
        return Error::InvalidTimezoneError(state.local_timezone).into_response();
    };

    let data = match get_application_data(&state, &application) {
        Ok(data) => data,
        Err(error) => {
            tracing::error!("Could not get the records for {application}: {error}");
            return error.into_response();
        }
    };

    let config = &state.pagination_config;
    let payments = paginate(
        data.payments,
        query.payments_page.unwrap_or(config.default_page),
        config.default_page_size,
    );
    let history = paginate(
        data.history,
        query.history_page.unwrap_or(config.default_page),
        config.default_page_size,
    );

    let view = ApplicationView {
        application: &application,
        balances: &data.balances,
        payments,
        history,
        max_pages: config.max_pages,
        local_offset,
        can_edit: current_user_id(&jar).is_some(),
    };

    (StatusCode::OK, view.into_html()).into_response()
}

struct ApplicationData {
    balances: Vec<Balance>,
    payments: Vec<PaymentRecord>,
    history: Vec<ContributionEntry>,
}

fn get_application_data(
    state: &ApplicationPageState,
    application: &ApplicationName,
) -> Result<ApplicationData, Error> {
    Ok(ApplicationData {
        balances: state.balance_store.get_by_application(application)?,
        payments: state.payment_store.get_by_application(application)?,
        history: state.contribution_store.get_by_application(application)?,
    })
}

struct ApplicationView<'a> {
    application: &'a ApplicationName,
    balances: &'a [Balance],
    payments: Page<PaymentRecord>,
    history: Page<ContributionEntry>,
    max_pages: u64,
    local_offset: UtcOffset,
    can_edit: bool,
}

impl ApplicationView<'_> {
    fn page_url(&self, payments_page: u64, history_page: u64) -> String {
        with_query(
            endpoints::APPLICATION_VIEW,
            &[
                ("name", self.application.as_ref()),
                ("payments_page", &payments_page.to_string()),
                ("history_page", &history_page.to_string()),
            ],
        )
    }

    fn into_html(self) -> Markup {
        let nav_bar = NavBar::new(endpoints::APPLICATION_VIEW, self.can_edit).into_html();
        let application_query = [("application", self.application.as_ref())];
        let new_payment_url = with_query(endpoints::NEW_PAYMENT_VIEW, &application_query);
        let new_contribution_url = with_query(endpoints::NEW_CONTRIBUTION_VIEW, &application_query);

        let payment_indicators = create_pagination_indicators(
            self.payments.page,
            self.payments.page_count,
            self.max_pages,
        );
        let history_indicators = create_pagination_indicators(
            self.history.page,
            self.history.page_count,
            self.max_pages,
        );

        let content = html! {
            (nav_bar)

            div class=(PAGE_CONTAINER_STYLE)
            {
                div class="w-full max-w-screen-lg space-y-8"
                {
                    div class="flex flex-wrap items-baseline justify-between gap-4"
                    {
                        h1 class="text-2xl font-bold" { (self.application) }

                        div class="flex gap-4"
                        {
                            a href=(new_payment_url) class=(LINK_STYLE) { "Record payment" }
                            a href=(new_contribution_url) class=(LINK_STYLE) { "Record contribution" }
                        }
                    }

                    section
                    {
                        h2 class="text-xl font-semibold mb-2" { "Balances" }
                        (balances_table(self.balances, self.local_offset, self.can_edit))
                    }

                    section
                    {
                        h2 class="text-xl font-semibold mb-2" { "Payments" }
                        (payments_table(&self.payments.items, self.local_offset, self.can_edit))
                        (pagination_view(&payment_indicators, |page| {
                            self.page_url(page, self.history.page)
                        }))
                    }

                    section
                    {
                        h2 class="text-xl font-semibold mb-2" { "Contribution History" }
                        (history_table(&self.history.items, self.local_offset, self.can_edit))
                        (pagination_view(&history_indicators, |page| {
                            self.page_url(self.payments.page, page)
                        }))
                    }
                }
            }
        };

        base(self.application.as_ref(), &[], &content)
    }
}

fn delete_button(endpoint: &str, confirm_message: &str) -> Markup {
    html! {
        button
            type="button"
            hx-delete=(endpoint)
            hx-confirm=(confirm_message)
            hx-target="closest tr"
            hx-swap="delete"
            hx-target-error="#alert-container"
            class=(BUTTON_DELETE_STYLE)
        {
            "Delete"
        }
    }
}

fn balances_table(balances: &[Balance], local_offset: UtcOffset, can_edit: bool) -> Markup {
    html! {
        table id="balances" class="w-full text-sm text-left rtl:text-right"
        {
            thead class=(TABLE_HEADER_STYLE)
            {
                tr
                {
                    th scope="col" class=(TABLE_CELL_STYLE) { "Contributor" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Balance" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Last updated" }
                    @if can_edit {
                        th scope="col" class=(TABLE_CELL_STYLE) { span class="sr-only" { "Actions" } }
                    }
                }
            }

            tbody
            {
                @for balance in balances {
                    tr class=(TABLE_ROW_STYLE)
                    {
                        td class=(TABLE_CELL_STYLE) { (balance.contributor) }
                        td class=(TABLE_CELL_STYLE) { (format_currency(balance.amount)) }
                        td class=(TABLE_CELL_STYLE) { (format_date_time(balance.updated_at, local_offset)) }
                        @if can_edit {
                            td class=(TABLE_CELL_STYLE)
                            {
                                (delete_button(
                                    &format_endpoint(endpoints::DELETE_BALANCE, balance.id),
                                    &format!(
                                        "Are you sure you want to delete the balance for {}? \
                                        Past payments and contributions are not changed.",
                                        balance.contributor
                                    ),
                                ))
                            }
                        }
                    }
                }

                @if balances.is_empty() {
                    tr class=(TABLE_ROW_STYLE)
                    {
                        td colspan="4" class=(TABLE_CELL_STYLE) { "Nobody has a balance yet." }
                    }
                }
            }
        }
    }
}

fn payments_table(payments: &[PaymentRecord], local_offset: UtcOffset, can_edit: bool) -> Markup {
    html! {
        table id="payments" class="w-full text-sm text-left rtl:text-right"
        {
            thead class=(TABLE_HEADER_STYLE)
            {
                tr
                {
                    th scope="col" class=(TABLE_CELL_STYLE) { "Paid at" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                    @if can_edit {
                        th scope="col" class=(TABLE_CELL_STYLE) { span class="sr-only" { "Actions" } }
                    }
                }
            }

            tbody
            {
                @for payment in payments {
                    tr class=(TABLE_ROW_STYLE)
                    {
                        td class=(TABLE_CELL_STYLE) { (format_date_time(payment.paid_at, local_offset)) }
                        td class=(TABLE_CELL_STYLE) { (format_currency(payment.amount)) }
                        td class=(TABLE_CELL_STYLE) { (payment.description.as_deref().unwrap_or_default()) }
                        @if can_edit {
                            td class=(TABLE_CELL_STYLE)
                            {
                                (delete_button(
                                    &format_endpoint(endpoints::DELETE_PAYMENT, payment.id),
                                    "Are you sure you want to delete this payment? \
                                    The balances it was split between are not changed.",
                                ))
                            }
                        }
                    }
                }

                @if payments.is_empty() {
                    tr class=(TABLE_ROW_STYLE)
                    {
                        td colspan="4" class=(TABLE_CELL_STYLE) { "No payments have been recorded." }
                    }
                }
            }
        }
    }
}

fn history_table(history: &[ContributionEntry], local_offset: UtcOffset, can_edit: bool) -> Markup {
    html! {
        table id="history" class="w-full text-sm text-left rtl:text-right"
        {
            thead class=(TABLE_HEADER_STYLE)
            {
                tr
                {
                    th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Contributor" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                    @if can_edit {
                        th scope="col" class=(TABLE_CELL_STYLE) { span class="sr-only" { "Actions" } }
                    }
                }
            }

            tbody
            {
                @for entry in history {
                    tr class=(TABLE_ROW_STYLE)
                    {
                        td class=(TABLE_CELL_STYLE) { (format_date_time(entry.created_at, local_offset)) }
                        td class=(TABLE_CELL_STYLE) { (entry.contributor) }
                        td class=(TABLE_CELL_STYLE) { (format_currency(entry.amount)) }
                        @if can_edit {
                            td class=(TABLE_CELL_STYLE)
                            {
                                (delete_button(
                                    &format_endpoint(endpoints::DELETE_CONTRIBUTION, entry.id),
                                    "Are you sure you want to delete this contribution? \
                                    The contributor's balance is not changed.",
                                ))
                            }
                        }
                    }
                }

                @if history.is_empty() {
                    tr class=(TABLE_ROW_STYLE)
                    {
                        td colspan="4" class=(TABLE_CELL_STYLE) { "No contributions have been recorded." }
                    }
                }
            }
        }
    }
}
