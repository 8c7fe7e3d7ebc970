//! `SqliteDatabase` is the concrete SQLite backend for the loyalty engine.
//!
//! It implements all the traits defined in the [`traits`](crate::traits) module.
use std::fmt::Debug;

use log::*;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::{new_pool, operations, orders};
use crate::{
    db_types::{
        AccrualUpdate,
        Balance,
        ClaimResult,
        LedgerOperation,
        OperationKind,
        Order,
        OrderNumber,
        OrderStatusType,
        Points,
        UserId,
        Withdrawal,
    },
    traits::{AccrualUpdateResult, LedgerError, LedgerManagement, LoyaltyDatabase, OrderManagement, OrderStoreError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({})", self.url)
    }
}

impl LoyaltyDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn close(&mut self) {
        self.pool.close().await;
    }
}

impl OrderManagement for SqliteDatabase {
    async fn claim_order(&self, owner: &UserId, number: &OrderNumber) -> Result<ClaimResult, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        let result = orders::claim(owner, number, &mut tx).await?;
        tx.commit().await?;
        if result.is_new() {
            debug!("🗃️ Order {number} claimed by {owner}");
        }
        Ok(result)
    }

    async fn fetch_order(&self, number: &OrderNumber) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(number, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_for_user(&self, owner: &UserId) -> Result<Vec<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_owner(owner, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_pending_order_numbers(&self) -> Result<Vec<OrderNumber>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let numbers = orders::fetch_pending_order_numbers(&mut conn).await?;
        Ok(numbers)
    }

    /// In a single atomic transaction:
    /// * moves the order to the new status, provided it is still pending;
    /// * if the order is now `Processed` with a positive accrual, appends the credit to the owner's ledger.
    ///
    /// If the status update touches no rows, nothing is written and the transaction is rolled back.
    async fn apply_accrual_update(&self, update: &AccrualUpdate) -> Result<AccrualUpdateResult, OrderStoreError> {
        if update.status == OrderStatusType::New {
            trace!("🗃️ Ignoring update to {} for order {}", update.status, update.number);
            return Ok(AccrualUpdateResult::Skipped);
        }
        let mut tx = self.pool.begin().await?;
        let Some(order) = orders::update_pending_status(update, &mut tx).await? else {
            trace!("🗃️ Order {} is not awaiting a move to {}. Skipping", update.number, update.status);
            return Ok(AccrualUpdateResult::Skipped);
        };
        let result = match update.credit_amount() {
            Some(amount) => {
                let op =
                    operations::insert_operation(&order.owner, &order.number, OperationKind::Accrual, amount, &mut tx)
                        .await?;
                AccrualUpdateResult::Credited(order, op)
            },
            None => AccrualUpdateResult::StatusUpdated(order),
        };
        tx.commit().await?;
        match &result {
            AccrualUpdateResult::Credited(order, op) => {
                debug!("🗃️ Order {} is {}. {} credited to {}", order.number, order.status, op.amount, order.owner)
            },
            AccrualUpdateResult::StatusUpdated(order) => debug!("🗃️ Order {} is now {}", order.number, order.status),
            AccrualUpdateResult::Skipped => {},
        }
        Ok(result)
    }
}

impl LedgerManagement for SqliteDatabase {
    async fn fetch_balance(&self, user: &UserId) -> Result<Balance, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let balance = operations::fetch_balance(user, &mut conn).await?;
        Ok(balance)
    }

    async fn fetch_withdrawals(&self, user: &UserId) -> Result<Vec<Withdrawal>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let withdrawals = operations::fetch_withdrawals(user, &mut conn).await?;
        Ok(withdrawals)
    }

    async fn fetch_operations(&self, user: &UserId) -> Result<Vec<LedgerOperation>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let ops = operations::fetch_operations(user, &mut conn).await?;
        Ok(ops)
    }

    /// The withdrawal order is inserted first, so the write lock is held while the balance is read and the debit is
    /// written. Any early return drops the transaction, which rolls it back.
    async fn withdraw(
        &self,
        user: &UserId,
        number: &OrderNumber,
        amount: Points,
    ) -> Result<LedgerOperation, LedgerError> {
        if !number.has_valid_checksum() {
            return Err(LedgerError::InvalidOrderNumber(number.as_str().to_string()));
        }
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let mut tx = self.pool.begin().await?;
        if orders::insert_withdrawal_order(user, number, &mut tx).await?.is_none() {
            return Err(LedgerError::OrderNumberTaken(number.clone()));
        }
        let balance = operations::fetch_balance(user, &mut tx).await?;
        if balance.current < amount {
            debug!("🗃️ Withdrawal of {amount} by {user} refused. Balance is {}", balance.current);
            return Err(LedgerError::InsufficientFunds { balance: balance.current, requested: amount });
        }
        let op = operations::insert_operation(user, number, OperationKind::Withdrawal, -amount, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ {amount} withdrawn by {user} against order {number}");
        Ok(op)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Runs the embedded schema migrations against the pool.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
