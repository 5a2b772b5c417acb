//! The records and validated inputs for tracking shared subscription costs.

mod domain;
mod models;

pub use domain::{Amount, ApplicationName, ContributorName, KNOWN_APPLICATIONS};
pub use models::{
    Balance, BalanceId, ContributionEntry, ContributionId, NewContribution, NewPayment, PaymentId,
    PaymentRecord,
};
