use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Balance, LedgerOperation, OrderNumber, Points, UserId, Withdrawal},
    traits::{LedgerError, LedgerManagement},
};

/// `LedgerApi` exposes a user's points balance and history, and is the only way to withdraw points.
pub struct LedgerApi<B> {
    db: B,
}

impl<B> Debug for LedgerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LedgerApi")
    }
}

impl<B> LedgerApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> LedgerApi<B>
where B: LedgerManagement
{
    pub async fn balance(&self, user: &UserId) -> Result<Balance, LedgerError> {
        self.db.fetch_balance(user).await
    }

    /// Withdraws `amount` points from the user's balance against the order reference `raw_number`.
    ///
    /// The reference must pass the Luhn checksum and not have been used before, and `amount` must be positive. The
    /// balance check and the debit are atomic, so concurrent withdrawals can never overdraw the account.
    pub async fn withdraw(&self, user: &UserId, raw_number: &str, amount: Points) -> Result<Withdrawal, LedgerError> {
        let number = OrderNumber::parse_checked(raw_number).map_err(|e| {
            debug!("💰️ {user} requested a withdrawal with an invalid order number. {e}");
            LedgerError::InvalidOrderNumber(raw_number.trim().to_string())
        })?;
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let op = self.db.withdraw(user, &number, amount).await.map_err(|e| {
            match &e {
                LedgerError::InsufficientFunds { .. } => info!("💰️ Withdrawal by {user} refused. {e}"),
                _ => warn!("💰️ Withdrawal of {amount} by {user} failed. {e}"),
            }
            e
        })?;
        info!("💰️ {user} withdrew {amount} against order {number}");
        Ok(Withdrawal { order_number: op.order_number, sum: op.amount.abs(), processed_at: op.processed_at })
    }

    /// The user's withdrawals, newest first.
    pub async fn withdrawals(&self, user: &UserId) -> Result<Vec<Withdrawal>, LedgerError> {
        self.db.fetch_withdrawals(user).await
    }

    /// Every credit and debit on the user's ledger, oldest first.
    pub async fn history(&self, user: &UserId) -> Result<Vec<LedgerOperation>, LedgerError> {
        self.db.fetch_operations(user).await
    }
}
