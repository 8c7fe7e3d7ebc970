use thiserror::Error;

use crate::db_types::{AccrualUpdate, ClaimResult, LedgerOperation, Order, OrderNumber, UserId};

#[derive(Debug, Clone, Error)]
pub enum OrderStoreError {
    #[error("Order number {0} is not valid")]
    InvalidOrderNumber(String),
    #[error("Order {0} has already been claimed by another user")]
    AlreadyClaimedByOtherOwner(OrderNumber),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderNumber),
    #[error("Internal database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for OrderStoreError {
    fn from(e: sqlx::Error) -> Self {
        OrderStoreError::DatabaseError(e.to_string())
    }
}

/// The result of applying an [`AccrualUpdate`] to the order store.
#[derive(Debug, Clone, PartialEq)]
pub enum AccrualUpdateResult {
    /// The status (and accrual, if any) was written. No ledger entry was made.
    StatusUpdated(Order),
    /// The order moved to `Processed` and the owner's ledger was credited, in the same transaction.
    Credited(Order, LedgerOperation),
    /// Nothing changed. The order was already terminal, is not an accrual order, or the update would not move it
    /// forward.
    Skipped,
}

impl AccrualUpdateResult {
    pub fn is_skipped(&self) -> bool {
        matches!(self, AccrualUpdateResult::Skipped)
    }

    pub fn order(&self) -> Option<&Order> {
        match self {
            AccrualUpdateResult::StatusUpdated(o) | AccrualUpdateResult::Credited(o, _) => Some(o),
            AccrualUpdateResult::Skipped => None,
        }
    }
}

/// The `OrderManagement` trait defines the behaviour of the order store.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Atomically claims `number` for `owner`.
    ///
    /// * If the number has never been seen, a new `NEW` accrual order is created and [`ClaimResult::Claimed`] is
    ///   returned.
    /// * If `owner` already holds the number, the existing order is returned unchanged as
    ///   [`ClaimResult::AlreadyClaimedBySameOwner`].
    /// * If anyone else holds it (including as a withdrawal reference), [`OrderStoreError::AlreadyClaimedByOtherOwner`]
    ///   is returned.
    ///
    /// Of any number of concurrent claims on the same number, exactly one creates the order.
    async fn claim_order(&self, owner: &UserId, number: &OrderNumber) -> Result<ClaimResult, OrderStoreError>;

    async fn fetch_order(&self, number: &OrderNumber) -> Result<Option<Order>, OrderStoreError>;

    /// Returns the accrual orders submitted by `owner`, newest first. Withdrawal references are not included.
    async fn fetch_orders_for_user(&self, owner: &UserId) -> Result<Vec<Order>, OrderStoreError>;

    /// Returns the numbers of every accrual order in `NEW` or `PROCESSING`, oldest first.
    async fn fetch_pending_order_numbers(&self) -> Result<Vec<OrderNumber>, OrderStoreError>;

    /// Applies a status update to a pending accrual order.
    ///
    /// The status change and, when the update moves the order to `PROCESSED` with a positive accrual, the credit to the
    /// owner's ledger are committed together or not at all. An order is credited at most once: an update against an
    /// order that is already terminal is [`AccrualUpdateResult::Skipped`].
    async fn apply_accrual_update(&self, update: &AccrualUpdate) -> Result<AccrualUpdateResult, OrderStoreError>;
}
