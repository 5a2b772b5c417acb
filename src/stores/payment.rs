//! Defines the store for payments made to vendors.

use crate::{
    Error,
    ledger::{ApplicationName, NewPayment, PaymentId, PaymentRecord},
};

/// Handles the creation, retrieval and deletion of vendor payments.
pub trait PaymentStore {
    /// Record a new payment.
    fn create(&mut self, payment: NewPayment) -> Result<PaymentRecord, Error>;

    /// Retrieve the payments for `application`, newest first.
    fn get_by_application(
        &self,
        application: &ApplicationName,
    ) -> Result<Vec<PaymentRecord>, Error>;

    /// Delete the payment with the ID `id`.
    ///
    /// # Errors
    /// Returns [Error::DeleteMissingPayment] if there is no payment with the ID `id`.
    fn delete(&mut self, id: PaymentId) -> Result<(), Error>;
}
