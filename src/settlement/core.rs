//! Splits vendor payments across balances and records member contributions.

use crate::{
    Error,
    auth::UserID,
    ledger::{
        Amount, ApplicationName, Balance, ContributionEntry, ContributorName, NewContribution,
        NewPayment, PaymentRecord,
    },
    stores::{BalanceStore, ContributionStore, PaymentStore},
};

/// A validated request to record a payment made to a vendor.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementRequest {
    /// The application the payment was made for.
    pub application: ApplicationName,
    /// The amount paid to the vendor.
    pub amount: Amount,
    /// The logged in user who made the payment, if any.
    pub payer_id: Option<UserID>,
    /// An optional note, e.g. "March bill".
    pub description: Option<String>,
}

/// The result of a successful [settle_payment] call.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementOutcome {
    /// The payment that was recorded.
    pub payment: PaymentRecord,
    /// How many balances the payment was split between.
    pub split_between: usize,
    /// The amount subtracted from each balance, `None` if there were no balances.
    pub share: Option<f64>,
}

impl SettlementOutcome {
    /// A short summary of the settlement suitable for showing to the user.
    pub fn message(&self) -> String {
        match self.share {
            Some(share) => format!(
                "Payment of ${:.2} recorded for {} and split among {} users, ${:.2} each.",
                self.payment.amount, self.payment.application, self.split_between, share
            ),
            None => format!(
                "Payment of ${:.2} recorded for {}. There were no users with a prior balance \
                to split the payment between.",
                self.payment.amount, self.payment.application
            ),
        }
    }
}

/// Record a vendor payment and split it evenly across the application's balances.
///
/// The payment is recorded first. Every balance for the application then has
/// `amount / N` subtracted from it, where N is the number of balances. When
/// there are no balances the payment is recorded without touching any balance.
///
/// # Errors
///
/// Returns the store error if the payment could not be recorded, in which case no balance
/// has been changed.
///
/// Returns [Error::PartialSettlement] if the payment was recorded but the balances could not
/// all be updated. The balances that were already updated keep their new amounts.
pub fn settle_payment<P, B>(
    payment_store: &mut P,
    balance_store: &mut B,
    request: SettlementRequest,
) -> Result<SettlementOutcome, Error>
where
    P: PaymentStore,
    B: BalanceStore,
{
    let SettlementRequest {
        application,
        amount,
        payer_id,
        description,
    } = request;

    let payment = payment_store.create(NewPayment {
        application: application.clone(),
        amount,
        payer_id,
        description,
    })?;
    tracing::debug!(
        "Recorded payment {} of {} for {application}",
        payment.id,
        payment.amount
    );

    let balances = balance_store
        .get_by_application(&application)
        .map_err(|error| Error::PartialSettlement {
            updated: 0,
            total: 0,
            source: Box::new(error),
        })?;

    if balances.is_empty() {
        tracing::info!("No balances for {application}, payment {} not split", payment.id);

        return Ok(SettlementOutcome {
            payment,
            split_between: 0,
            share: None,
        });
    }

    let total = balances.len();
    let share = amount.as_f64() / total as f64;

    for (updated, balance) in balances.iter().enumerate() {
        if let Err(error) = balance_store.adjust(balance.id, -share) {
            tracing::error!(
                "Could not apply share of payment {} to balance {}: {error}",
                payment.id,
                balance.id
            );

            return Err(Error::PartialSettlement {
                updated,
                total,
                source: Box::new(error),
            });
        }
    }

    tracing::info!(
        "Split payment {} for {application} among {total} balances, {share} each",
        payment.id
    );

    Ok(SettlementOutcome {
        payment,
        split_between: total,
        share: Some(share),
    })
}

/// A validated request to record a contribution made by a member.
#[derive(Debug, Clone, PartialEq)]
pub struct ContributionRequest {
    /// The application the money was contributed towards.
    pub application: ApplicationName,
    /// The person who contributed the money.
    pub contributor: ContributorName,
    /// The amount contributed.
    pub amount: Amount,
    /// The logged in user who recorded the contribution, if any.
    pub recorder_id: Option<UserID>,
}

/// The result of a successful [record_contribution] call.
#[derive(Debug, Clone, PartialEq)]
pub struct ContributionOutcome {
    /// The history entry that was appended.
    pub entry: ContributionEntry,
    /// The contributor's balance after the contribution was added.
    pub balance: Balance,
}

impl ContributionOutcome {
    /// A short summary of the contribution suitable for showing to the user.
    pub fn message(&self) -> String {
        format!(
            "Recorded ${:.2} from {} for {}. Their balance is now ${:.2}.",
            self.entry.amount, self.entry.contributor, self.entry.application, self.balance.amount
        )
    }
}

/// Append a contribution to the history and add it to the contributor's balance.
///
/// The balance is created with the contributed amount if the contributor has no balance for
/// the application yet, otherwise the amount is added to the existing balance.
///
/// # Errors
///
/// Returns the store error if the history entry or the balance could not be written.
/// The history entry is kept if only the balance update fails.
pub fn record_contribution<C, B>(
    contribution_store: &mut C,
    balance_store: &mut B,
    request: ContributionRequest,
) -> Result<ContributionOutcome, Error>
where
    C: ContributionStore,
    B: BalanceStore,
{
    let ContributionRequest {
        application,
        contributor,
        amount,
        recorder_id,
    } = request;

    let entry = contribution_store.create(NewContribution {
        recorder_id,
        contributor: contributor.clone(),
        application: application.clone(),
        amount,
        related_payment_id: None,
    })?;

    let balance = balance_store
        .add_contribution(recorder_id, &contributor, &application, amount)
        .inspect_err(|error| {
            tracing::error!(
                "Recorded contribution {} but could not update the balance for {contributor}: {error}",
                entry.id
            );
        })?;

    tracing::info!(
        "Recorded contribution {} of {amount} from {contributor} for {application}",
        entry.id
    );

    Ok(ContributionOutcome { entry, balance })
}


#[cfg(test)]
mod record_contribution_tests {
    use crate::{
        Error,
        auth::UserID,
        ledger::{Amount, ApplicationName, ContributorName},
        settlement::{ContributionRequest, record_contribution},
        stores::{
            BalanceStore, ContributionStore,
            fake::{FakeBalanceStore, FakeContributionStore},
            sqlite::{SQLiteBalanceStore, SQLiteContributionStore},
        },
        test_utils::{create_test_user, get_shared_test_connection},
    };

    fn request(contributor: &str, application: &str, amount: f64) -> ContributionRequest {
        ContributionRequest {
            application: ApplicationName::new_unchecked(application),
            contributor: ContributorName::new_unchecked(contributor),
            amount: Amount::new(amount).unwrap(),
            recorder_id: None,
        }
    }

    /// SQLite stores sharing one database, and a registered user to act as the recorder.
    fn get_sqlite_stores() -> (SQLiteContributionStore, SQLiteBalanceStore, UserID) {
        let connection = get_shared_test_connection();
        let recorder = create_test_user("dana@example.com", &connection.lock().unwrap());

        (
            SQLiteContributionStore::new(connection.clone()),
            SQLiteBalanceStore::new(connection),
            recorder,
        )
    }

    #[test]
    fn first_contribution_creates_balance() {
        let (mut contributions, mut balances, recorder) = get_sqlite_stores();
        let youtube = ApplicationName::new_unchecked("YouTube Premium");
        let request = ContributionRequest {
            recorder_id: Some(recorder),
            ..request("Dana", "YouTube Premium", 30.0)
        };

        let outcome = record_contribution(&mut contributions, &mut balances, request).unwrap();

        assert_eq!(outcome.balance.amount, 30.0);
        assert_eq!(outcome.balance.owner_id, Some(recorder));
        assert_eq!(outcome.entry.recorder_id, Some(recorder));
        assert_eq!(
            outcome.balance.contributor,
            ContributorName::new_unchecked("Dana")
        );
        assert_eq!(outcome.balance.application, youtube);
        assert_eq!(balances.get_by_application(&youtube).unwrap().len(), 1);
        let history = contributions.get_by_application(&youtube).unwrap();
        assert_eq!(history, vec![outcome.entry]);
    }

    #[test]
    fn second_contribution_increments_balance() {
        let (mut contributions, mut balances, _) = get_sqlite_stores();
        let youtube = ApplicationName::new_unchecked("YouTube Premium");

        record_contribution(
            &mut contributions,
            &mut balances,
            request("Dana", "YouTube Premium", 30.0),
        )
        .unwrap();
        let outcome = record_contribution(
            &mut contributions,
            &mut balances,
            request("Dana", "YouTube Premium", 15.0),
        )
        .unwrap();

        assert_eq!(outcome.balance.amount, 45.0);
        assert_eq!(balances.get_by_application(&youtube).unwrap().len(), 1);
        assert_eq!(contributions.get_by_application(&youtube).unwrap().len(), 2);
    }

    #[test]
    fn contribution_after_settlement_offsets_negative_balance() {
        let mut contributions = FakeContributionStore::default();
        let mut balances = FakeBalanceStore::with_balances(&[("Dana", "Crunchyroll", -8.0)]);

        let outcome = record_contribution(
            &mut contributions,
            &mut balances,
            request("Dana", "Crunchyroll", 10.0),
        )
        .unwrap();

        assert_eq!(outcome.balance.amount, 2.0);
    }

    #[test]
    fn history_write_failure_leaves_balance_untouched() {
        let mut contributions = FakeContributionStore {
            fail_on_create: true,
            ..Default::default()
        };
        let mut balances = FakeBalanceStore::default();

        let result = record_contribution(
            &mut contributions,
            &mut balances,
            request("Dana", "Crunchyroll", 10.0),
        );

        assert_eq!(result, Err(Error::DatabaseLockError));
        assert!(balances.balances.is_empty());
    }

    #[test]
    fn balance_failure_keeps_history_entry() {
        let mut contributions = FakeContributionStore::default();
        let mut balances = FakeBalanceStore {
            fail_on_add: true,
            ..Default::default()
        };

        let result = record_contribution(
            &mut contributions,
            &mut balances,
            request("Dana", "Crunchyroll", 10.0),
        );

        assert_eq!(result, Err(Error::DatabaseLockError));
        assert_eq!(contributions.entries.len(), 1);
    }

    #[test]
    fn outcome_message_includes_new_balance() {
        let mut contributions = FakeContributionStore::default();
        let mut balances = FakeBalanceStore::default();

        let outcome = record_contribution(
            &mut contributions,
            &mut balances,
            request("Dana", "YouTube Premium", 30.0),
        )
        .unwrap();

        assert_eq!(
            outcome.message(),
            "Recorded $30.00 from Dana for YouTube Premium. Their balance is now $30.00."
        );
    }
}
