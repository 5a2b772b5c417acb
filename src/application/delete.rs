//! Endpoints for deleting single balances, payments and contributions.
//!
//! Deleting a row never changes any other row, e.g. deleting a payment does not
//! give the split amounts back to the balances.

use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    alert::Alert,
    ledger::{BalanceId, ContributionId, PaymentId},
    stores::{
        BalanceStore, ContributionStore, PaymentStore,
        sqlite::{SQLiteBalanceStore, SQLiteContributionStore, SQLitePaymentStore},
    },
};

/// The state needed to delete ledger records.
#[derive(Debug, Clone)]
pub struct DeleteRecordState {
    pub balance_store: SQLiteBalanceStore,
    pub payment_store: SQLitePaymentStore,
    pub contribution_store: SQLiteContributionStore,
}

impl FromRef<AppState> for DeleteRecordState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            balance_store: state.balance_store.clone(),
            payment_store: state.payment_store.clone(),
            contribution_store: state.contribution_store.clone(),
        }
    }
}

// The status code has to be 200 OK or HTMX will not delete the table row.
fn deleted_response(message: &str) -> Response {
    (
        StatusCode::OK,
        Alert::SuccessSimple {
            message: message.to_owned(),
        },
    )
        .into_response()
}

/// A route handler for deleting a balance, responds with an alert.
pub async fn delete_balance_endpoint(
    State(mut state): State<DeleteRecordState>,
    Path(balance_id): Path<BalanceId>,
) -> Response {
    match state.balance_store.delete(balance_id) {
        Ok(()) => deleted_response("Balance deleted successfully"),
        Err(error) => {
            tracing::error!("Could not delete balance {balance_id}: {error}");
            error.into_alert_response()
        }
    }
}

/// A route handler for deleting a payment, responds with an alert.
pub async fn delete_payment_endpoint(
    State(mut state): State<DeleteRecordState>,
    Path(payment_id): Path<PaymentId>,
) -> Response {
    match state.payment_store.delete(payment_id) {
        Ok(()) => deleted_response("Payment deleted successfully"),
        Err(error) => {
            tracing::error!("Could not delete payment {payment_id}: {error}");
            error.into_alert_response()
        }
    }
}

/// A route handler for deleting a contribution, responds with an alert.
pub async fn delete_contribution_endpoint(
    State(mut state): State<DeleteRecordState>,
    Path(contribution_id): Path<ContributionId>,
) -> Response {
    match state.contribution_store.delete(contribution_id) {
        Ok(()) => deleted_response("Contribution deleted successfully"),
        Err(error) => {
            tracing::error!("Could not delete contribution {contribution_id}: {error}");
            error.into_alert_response()
        }
    }
}
