//! Defines the store for per-contributor, per-application balances.

use crate::{
    Error,
    auth::UserID,
    ledger::{Amount, ApplicationName, Balance, BalanceId, ContributorName},
};

/// Handles the retrieval and mutation of balances.
pub trait BalanceStore {
    /// Retrieve every balance recorded for `application`, ordered by contributor name.
    fn get_by_application(&self, application: &ApplicationName) -> Result<Vec<Balance>, Error>;

    /// Retrieve the balance for `contributor` and `application`, if there is one.
    fn get_by_contributor(
        &self,
        contributor: &ContributorName,
        application: &ApplicationName,
    ) -> Result<Option<Balance>, Error>;

    /// Add `delta` to the amount of the balance with the ID `id`.
    ///
    /// Implementations must apply the change in a single atomic step so that concurrent
    /// adjustments to the same balance are not lost.
    ///
    /// # Errors
    /// Returns [Error::UpdateMissingBalance] if there is no balance with the ID `id`.
    fn adjust(&mut self, id: BalanceId, delta: f64) -> Result<Balance, Error>;

    /// Add `amount` to the balance for `contributor` and `application`, creating the balance
    /// with `amount` if it does not exist yet.
    ///
    /// Implementations must apply the change in a single atomic step.
    fn add_contribution(
        &mut self,
        owner_id: Option<UserID>,
        contributor: &ContributorName,
        application: &ApplicationName,
        amount: Amount,
    ) -> Result<Balance, Error>;

    /// The distinct names of everyone that has a balance for any application.
    fn contributor_names(&self) -> Result<Vec<ContributorName>, Error>;

    /// Delete the balance with the ID `id`.
    ///
    /// # Errors
    /// Returns [Error::DeleteMissingBalance] if there is no balance with the ID `id`.
    fn delete(&mut self, id: BalanceId) -> Result<(), Error>;
}
