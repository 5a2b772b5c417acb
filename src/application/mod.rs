//! The page for managing the balances, payments and contribution history of one application.

mod delete;
mod page;

pub use delete::{
    delete_balance_endpoint, delete_contribution_endpoint, delete_payment_endpoint,
};
pub use page::get_application_page;
