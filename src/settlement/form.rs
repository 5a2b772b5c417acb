//! Form fields shared by the payment and contribution forms.

use maud::{Markup, html};
use serde::Deserialize;

use crate::html::{FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE};

pub(super) const APPLICATION_OPTIONS_ID: &str = "application-options";
pub(super) const CONTRIBUTOR_OPTIONS_ID: &str = "contributor-options";

/// The query string accepted by the form pages to preselect an application.
#[derive(Debug, Default, Deserialize)]
pub struct PrefillQuery {
    pub application: Option<String>,
}

/// A `<datalist>` for suggesting values in a text input.
///
/// The datalist lives outside the form so that the form can be swapped out
/// by HTMX without resending the options.
pub(super) fn datalist(id: &str, options: &[String]) -> Markup {
    html! {
        datalist id=(id)
        {
            @for option in options {
                option value=(option) {}
            }
        }
    }
}

pub(super) fn text_input_with_options(
    name: &str,
    label: &str,
    value: &str,
    list_id: &str,
    autofocus: bool,
) -> Markup {
    html! {
        div
        {
            label for=(name) class=(FORM_LABEL_STYLE) { (label) }

            input
                id=(name)
                type="text"
                name=(name)
                value=(value)
                list=(list_id)
                placeholder=(label)
                autocomplete="off"
                required
                autofocus[autofocus]
                class=(FORM_TEXT_INPUT_STYLE);
        }
    }
}

pub(super) fn amount_input(value: &str) -> Markup {
    html! {
        div
        {
            label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

            div class="input-wrapper"
            {
                input
                    id="amount"
                    type="number"
                    name="amount"
                    value=(value)
                    step="0.01"
                    min="0.01"
                    placeholder="0.00"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }
        }
    }
}

pub(super) fn error_message(error_message: &str) -> Markup {
    html! {
        @if !error_message.is_empty() {
            p class="text-red-600 dark:text-red-400" { (error_message) }
        }
    }
}
