//! In-memory stores for exercising the settlement functions without SQLite.
//!
//! Each store can be told to fail so that tests can check how partial
//! failures are reported.

use time::OffsetDateTime;

use crate::{
    Error,
    auth::UserID,
    ledger::{
        Amount, ApplicationName, Balance, BalanceId, ContributionEntry, ContributionId,
        ContributorName, NewContribution, NewPayment, PaymentId, PaymentRecord,
    },
    stores::{BalanceStore, ContributionStore, PaymentStore},
};

#[derive(Debug, Default)]
pub(crate) struct FakeBalanceStore {
    pub balances: Vec<Balance>,
    /// Fail every adjustment once this many adjustments have succeeded.
    pub fail_adjust_after: Option<usize>,
    pub fail_on_add: bool,
    pub fail_on_read: bool,
    /// The number of adjustments that have succeeded so far.
    pub adjust_count: usize,
}

impl FakeBalanceStore {
    pub fn with_balances(amounts: &[(&str, &str, f64)]) -> Self {
        let now = OffsetDateTime::now_utc();
        let balances = amounts
            .iter()
            .enumerate()
            .map(|(index, (contributor, application, amount))| Balance {
                id: index as BalanceId + 1,
                owner_id: None,
                contributor: ContributorName::new_unchecked(contributor),
                application: ApplicationName::new_unchecked(application),
                amount: *amount,
                created_at: now,
                updated_at: now,
            })
            .collect();

        Self {
            balances,
            ..Default::default()
        }
    }

    pub fn amount_of(&self, contributor: &str, application: &str) -> Option<f64> {
        self.balances
            .iter()
            .find(|balance| {
                balance.contributor.as_ref() == contributor
                    && balance.application.as_ref() == application
            })
            .map(|balance| balance.amount)
    }
}

impl BalanceStore for FakeBalanceStore {
    fn get_by_application(&self, application: &ApplicationName) -> Result<Vec<Balance>, Error> {
        if self.fail_on_read {
            return Err(Error::DatabaseLockError);
        }

        let mut balances: Vec<Balance> = self
            .balances
            .iter()
            .filter(|balance| &balance.application == application)
            .cloned()
            .collect();
        balances.sort_by(|a, b| a.contributor.as_ref().cmp(b.contributor.as_ref()));

        Ok(balances)
    }

    fn get_by_contributor(
        &self,
        contributor: &ContributorName,
        application: &ApplicationName,
    ) -> Result<Option<Balance>, Error> {
        Ok(self
            .balances
            .iter()
            .find(|balance| {
                &balance.contributor == contributor && &balance.application == application
            })
            .cloned())
    }

    fn adjust(&mut self, id: BalanceId, delta: f64) -> Result<Balance, Error> {
        if self
            .fail_adjust_after
            .is_some_and(|limit| self.adjust_count >= limit)
        {
            return Err(Error::DatabaseLockError);
        }

        let balance = self
            .balances
            .iter_mut()
            .find(|balance| balance.id == id)
            .ok_or(Error::UpdateMissingBalance)?;
        balance.amount += delta;
        balance.updated_at = OffsetDateTime::now_utc();
        self.adjust_count += 1;

        Ok(balance.clone())
    }

    fn add_contribution(
        &mut self,
        owner_id: Option<UserID>,
        contributor: &ContributorName,
        application: &ApplicationName,
        amount: Amount,
    ) -> Result<Balance, Error> {
        if self.fail_on_add {
            return Err(Error::DatabaseLockError);
        }

        let now = OffsetDateTime::now_utc();

        if let Some(balance) = self.balances.iter_mut().find(|balance| {
            &balance.contributor == contributor && &balance.application == application
        }) {
            balance.amount += amount.as_f64();
            balance.updated_at = now;
            return Ok(balance.clone());
        }

        let balance = Balance {
            id: self.balances.len() as BalanceId + 1,
            owner_id,
            contributor: contributor.clone(),
            application: application.clone(),
            amount: amount.as_f64(),
            created_at: now,
            updated_at: now,
        };
        self.balances.push(balance.clone());

        Ok(balance)
    }

    fn contributor_names(&self) -> Result<Vec<ContributorName>, Error> {
        let mut names: Vec<ContributorName> = self
            .balances
            .iter()
            .map(|balance| balance.contributor.clone())
            .collect();
        names.sort_by(|a, b| a.as_ref().cmp(b.as_ref()));
        names.dedup();

        Ok(names)
    }

    fn delete(&mut self, id: BalanceId) -> Result<(), Error> {
        let count_before = self.balances.len();
        self.balances.retain(|balance| balance.id != id);

        if self.balances.len() == count_before {
            return Err(Error::DeleteMissingBalance);
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakePaymentStore {
    pub payments: Vec<PaymentRecord>,
    pub fail_on_create: bool,
}

impl PaymentStore for FakePaymentStore {
    fn create(&mut self, payment: NewPayment) -> Result<PaymentRecord, Error> {
        if self.fail_on_create {
            return Err(Error::DatabaseLockError);
        }

        let record = PaymentRecord {
            id: self.payments.len() as PaymentId + 1,
            application: payment.application,
            amount: payment.amount.as_f64(),
            payer_id: payment.payer_id,
            description: payment.description,
            paid_at: OffsetDateTime::now_utc(),
        };
        self.payments.push(record.clone());

        Ok(record)
    }

    fn get_by_application(
        &self,
        application: &ApplicationName,
    ) -> Result<Vec<PaymentRecord>, Error> {
        Ok(self
            .payments
            .iter()
            .rev()
            .filter(|payment| &payment.application == application)
            .cloned()
            .collect())
    }

    fn delete(&mut self, id: PaymentId) -> Result<(), Error> {
        let count_before = self.payments.len();
        self.payments.retain(|payment| payment.id != id);

        if self.payments.len() == count_before {
            return Err(Error::DeleteMissingPayment);
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeContributionStore {
    pub entries: Vec<ContributionEntry>,
    pub fail_on_create: bool,
}

impl ContributionStore for FakeContributionStore {
    fn create(&mut self, contribution: NewContribution) -> Result<ContributionEntry, Error> {
        if self.fail_on_create {
            return Err(Error::DatabaseLockError);
        }

        let entry = ContributionEntry {
            id: self.entries.len() as ContributionId + 1,
            recorder_id: contribution.recorder_id,
            contributor: contribution.contributor,
            application: contribution.application,
            amount: contribution.amount.as_f64(),
            related_payment_id: contribution.related_payment_id,
            created_at: OffsetDateTime::now_utc(),
        };
        self.entries.push(entry.clone());

        Ok(entry)
    }

    fn get_by_application(
        &self,
        application: &ApplicationName,
    ) -> Result<Vec<ContributionEntry>, Error> {
        Ok(self
            .entries
            .iter()
            .rev()
            .filter(|entry| &entry.application == application)
            .cloned()
            .collect())
    }

    fn delete(&mut self, id: ContributionId) -> Result<(), Error> {
        let count_before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);

        if self.entries.len() == count_before {
            return Err(Error::DeleteMissingContribution);
        }

        Ok(())
    }
}
