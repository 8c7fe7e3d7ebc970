use thiserror::Error;

use crate::db_types::{Balance, LedgerOperation, OrderNumber, Points, UserId, Withdrawal};

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Order number {0} is not valid")]
    InvalidOrderNumber(String),
    #[error("Withdrawal amounts must be positive. {0} is not")]
    InvalidAmount(Points),
    #[error("Insufficient funds. Balance is {balance}, but {requested} was requested")]
    InsufficientFunds { balance: Points, requested: Points },
    #[error("Order {0} is already in use")]
    OrderNumberTaken(OrderNumber),
    #[error("Internal database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}

/// The `LedgerManagement` trait defines the behaviour of the append-only points ledger.
///
/// A user's balance is always derived from their ledger operations. Operations are never modified or removed.
#[allow(async_fn_in_trait)]
pub trait LedgerManagement {
    async fn fetch_balance(&self, user: &UserId) -> Result<Balance, LedgerError>;

    /// Returns the user's withdrawals, newest first.
    async fn fetch_withdrawals(&self, user: &UserId) -> Result<Vec<Withdrawal>, LedgerError>;

    /// Returns every ledger operation for the user, oldest first.
    async fn fetch_operations(&self, user: &UserId) -> Result<Vec<LedgerOperation>, LedgerError>;

    /// Debits `amount` from the user's balance against the order reference `number`.
    ///
    /// In a single transaction, the reference is recorded as a withdrawal order (it must be unused), the balance is
    /// checked, and the debit is appended. Concurrent withdrawals for the same user are serialized, so the balance can
    /// never go negative.
    async fn withdraw(
        &self,
        user: &UserId,
        number: &OrderNumber,
        amount: Points,
    ) -> Result<LedgerOperation, LedgerError>;
}
