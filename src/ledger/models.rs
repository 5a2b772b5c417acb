//! The records stored for balances, vendor payments and contributions.

use time::OffsetDateTime;

use crate::{
    auth::UserID,
    database_id::DatabaseId,
    ledger::{Amount, ApplicationName, ContributorName},
};

/// Database identifier for a balance.
pub type BalanceId = DatabaseId;
/// Database identifier for a payment made to a vendor.
pub type PaymentId = DatabaseId;
/// Database identifier for a contribution history entry.
pub type ContributionId = DatabaseId;

/// The running amount a contributor has put towards an application.
///
/// A negative amount means the contributor owes money towards the application.
/// There is at most one balance per contributor and application.
#[derive(Debug, Clone, PartialEq)]
pub struct Balance {
    /// The ID of the balance.
    pub id: BalanceId,
    /// The user who first recorded the balance.
    pub owner_id: Option<UserID>,
    /// The person the balance belongs to.
    pub contributor: ContributorName,
    /// The subscription service the balance is for.
    pub application: ApplicationName,
    /// How much the contributor has in the pool after contributions and settled payments.
    pub amount: f64,
    /// When the first contribution created the balance.
    pub created_at: OffsetDateTime,
    /// When the amount last changed.
    pub updated_at: OffsetDateTime,
}

/// A payment made to a vendor, e.g. this month's YouTube Premium bill.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRecord {
    /// The ID of the payment.
    pub id: PaymentId,
    /// The subscription service that was paid.
    pub application: ApplicationName,
    /// The amount paid to the vendor. Always greater than zero.
    pub amount: f64,
    /// The logged in user who recorded the payment, if any.
    pub payer_id: Option<UserID>,
    /// An optional note, e.g. "March billing cycle".
    pub description: Option<String>,
    /// When the payment was recorded.
    pub paid_at: OffsetDateTime,
}

/// The data needed to record a [PaymentRecord].
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    /// The subscription service that was paid.
    pub application: ApplicationName,
    /// The amount paid to the vendor.
    pub amount: Amount,
    /// The logged in user recording the payment, if any.
    pub payer_id: Option<UserID>,
    /// An optional note. Blank notes are stored as `None`.
    pub description: Option<String>,
}

/// An entry in the append-only log of member contributions.
#[derive(Debug, Clone, PartialEq)]
pub struct ContributionEntry {
    /// The ID of the history entry.
    pub id: ContributionId,
    /// The logged in user who recorded the contribution, if any.
    pub recorder_id: Option<UserID>,
    /// The person who actually contributed the money.
    pub contributor: ContributorName,
    /// The subscription service the money was contributed to.
    pub application: ApplicationName,
    /// The amount contributed. Always greater than zero.
    pub amount: f64,
    /// The payment this contribution was made towards, if any.
    pub related_payment_id: Option<PaymentId>,
    /// When the contribution was recorded.
    pub created_at: OffsetDateTime,
}

/// The data needed to record a [ContributionEntry].
#[derive(Debug, Clone, PartialEq)]
pub struct NewContribution {
    /// The logged in user recording the contribution, if any.
    pub recorder_id: Option<UserID>,
    /// The person who contributed the money.
    pub contributor: ContributorName,
    /// The subscription service the money was contributed to.
    pub application: ApplicationName,
    /// The amount contributed.
    pub amount: Amount,
    /// The payment this contribution was made towards, if any.
    pub related_payment_id: Option<PaymentId>,
}
