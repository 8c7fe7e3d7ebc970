use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{ClaimResult, Order, OrderNumber, UserId},
    traits::{OrderManagement, OrderStoreError},
};

/// `OrderFlowApi` handles order submissions on behalf of authenticated users.
pub struct OrderFlowApi<B> {
    db: B,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement
{
    /// Submits an order number for accrual on behalf of `user`.
    ///
    /// The number is trimmed and must consist only of digits that pass the Luhn checksum. Resubmitting a number the
    /// user already owns is not an error; [`ClaimResult::AlreadyClaimedBySameOwner`] is returned instead.
    pub async fn submit_order(&self, user: &UserId, raw_number: &str) -> Result<ClaimResult, OrderStoreError> {
        let number = OrderNumber::parse_checked(raw_number).map_err(|e| {
            debug!("📦️ {user} submitted an invalid order number. {e}");
            OrderStoreError::InvalidOrderNumber(raw_number.trim().to_string())
        })?;
        let result = self.db.claim_order(user, &number).await?;
        match &result {
            ClaimResult::Claimed(_) => info!("📦️ Order {number} accepted for {user}"),
            ClaimResult::AlreadyClaimedBySameOwner(_) => debug!("📦️ {user} resubmitted order {number}"),
        }
        Ok(result)
    }

    /// The user's accrual orders, newest first.
    pub async fn orders_for_user(&self, user: &UserId) -> Result<Vec<Order>, OrderStoreError> {
        self.db.fetch_orders_for_user(user).await
    }

    pub async fn order(&self, number: &OrderNumber) -> Result<Order, OrderStoreError> {
        self.db.fetch_order(number).await?.ok_or_else(|| OrderStoreError::OrderNotFound(number.clone()))
    }

    pub async fn pending_orders(&self) -> Result<Vec<OrderNumber>, OrderStoreError> {
        self.db.fetch_pending_order_numbers().await
    }
}
