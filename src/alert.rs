//! Alert system for displaying success and error messages to users.
//!
//! Alerts are swapped out-of-band into the `#alert-container` element that
//! [crate::html::base] places at the bottom of every page.

use axum::response::{IntoResponse, Response};
use maud::{Markup, html};

/// An alert message shown to the user after an HTMX request.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// A success message with extra details.
    Success { message: String, details: String },
    /// A success message without details.
    SuccessSimple { message: String },
    /// An error message with extra details.
    Error { message: String, details: String },
    /// An error message without details.
    ErrorSimple { message: String },
}

impl Alert {
    /// Render the alert as an out-of-band swap into the alert container.
    pub fn into_html(self) -> Markup {
        let (is_success, message, details) = match self {
            Alert::Success { message, details } => (true, message, Some(details)),
            Alert::SuccessSimple { message } => (true, message, None),
            Alert::Error { message, details } => (false, message, Some(details)),
            Alert::ErrorSimple { message } => (false, message, None),
        };

        let container_style = if is_success {
            "flex items-start p-4 mb-4 text-green-800 border border-green-300 \
            rounded-lg bg-green-50 dark:bg-gray-800 dark:text-green-400 \
            dark:border-green-800"
        } else {
            "flex items-start p-4 mb-4 text-red-800 border border-red-300 \
            rounded-lg bg-red-50 dark:bg-gray-800 dark:text-red-400 \
            dark:border-red-800"
        };

        html! {
            div
                id="alert-container"
                hx-swap-oob="true"
                class="w-full max-w-md px-4"
                style="position: fixed; bottom: 1rem; left: 50%; transform: translateX(-50%); z-index: 9999;"
            {
                div class=(container_style) role="alert"
                {
                    div class="flex-1"
                    {
                        p class="font-medium" { (message) }

                        @if let Some(details) = details {
                            @if !details.is_empty() {
                                p class="mt-1 text-sm" { (details) }
                            }
                        }
                    }

                    button
                        type="button"
                        class="ms-3 text-sm font-medium underline"
                        aria-label="Close"
                        onclick="document.getElementById('alert-container').classList.add('hidden')"
                    {
                        "Dismiss"
                    }
                }
            }
        }
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        self.into_html().into_response()
    }
}

#[cfg(test)]
mod alert_tests {
    use axum::{http::StatusCode, response::IntoResponse};
    use scraper::Selector;

    use crate::{
        alert::Alert,
        test_utils::{assert_valid_html, parse_html_fragment},
    };

    #[tokio::test]
    async fn renders_message_and_details() {
        let alert = Alert::Success {
            message: "Payment recorded".to_owned(),
            details: "Split among 2 users".to_owned(),
        };

        let response = alert.into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        assert_valid_html(&html);
        let text = html
            .select(&Selector::parse("[role=alert]").unwrap())
            .next()
            .expect("no alert found")
            .text()
            .collect::<String>();
        assert!(text.contains("Payment recorded"));
        assert!(text.contains("Split among 2 users"));
    }

    #[tokio::test]
    async fn alert_is_swapped_out_of_band() {
        let response = Alert::ErrorSimple {
            message: "Oops".to_owned(),
        }
        .into_response();

        let html = parse_html_fragment(response).await;
        let container = html
            .select(&Selector::parse("#alert-container").unwrap())
            .next()
            .expect("no alert container found");
        assert_eq!(container.value().attr("hx-swap-oob"), Some("true"));
    }
}
