//! Defines the store for the contribution history.

use crate::{
    Error,
    ledger::{ApplicationName, ContributionEntry, ContributionId, NewContribution},
};

/// Handles the append-only log of contributions.
pub trait ContributionStore {
    /// Append a contribution to the history.
    fn create(&mut self, contribution: NewContribution) -> Result<ContributionEntry, Error>;

    /// Retrieve the contributions for `application`, newest first.
    fn get_by_application(
        &self,
        application: &ApplicationName,
    ) -> Result<Vec<ContributionEntry>, Error>;

    /// Delete the contribution with the ID `id`.
    ///
    /// # Errors
    /// Returns [Error::DeleteMissingContribution] if there is no contribution with the ID `id`.
    fn delete(&mut self, id: ContributionId) -> Result<(), Error>;
}
