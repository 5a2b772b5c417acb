//! Recording vendor payments and member contributions, and the pages for doing so.

mod contribution;
mod core;
mod form;
mod payment;

pub use contribution::{create_contribution_endpoint, get_new_contribution_page};
pub use core::{
    ContributionOutcome, ContributionRequest, SettlementOutcome, SettlementRequest,
    record_contribution, settle_payment,
};
pub use payment::{create_payment_endpoint, get_new_payment_page};
