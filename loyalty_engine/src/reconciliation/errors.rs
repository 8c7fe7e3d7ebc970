use std::time::Duration;

use thiserror::Error;

use crate::traits::OrderStoreError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconciliationError {
    #[error("There are no pending orders to reconcile")]
    NoPendingOrders,
    #[error("The accrual service is rate limiting us{}", retry_hint(.retry_after))]
    RateLimited { retry_after: Option<Duration> },
    #[error("The accrual service is unavailable: {0}")]
    Transient(String),
    #[error("The reconciliation tick did not finish within {}s", .0.as_secs())]
    DeadlineExceeded(Duration),
    #[error("Internal database error: {0}")]
    DatabaseError(String),
}

fn retry_hint(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(". Retrying in {}s", d.as_secs()),
        None => String::new(),
    }
}

impl From<OrderStoreError> for ReconciliationError {
    fn from(e: OrderStoreError) -> Self {
        ReconciliationError::DatabaseError(e.to_string())
    }
}
