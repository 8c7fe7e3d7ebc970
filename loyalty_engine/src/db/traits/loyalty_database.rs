use crate::traits::{LedgerManagement, OrderManagement};

/// This trait defines the highest level of behaviour for backends supporting the loyalty engine.
#[allow(async_fn_in_trait)]
pub trait LoyaltyDatabase: Clone + OrderManagement + LedgerManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Closes the underlying connection pool. Calls made after this will fail.
    async fn close(&mut self);
}
