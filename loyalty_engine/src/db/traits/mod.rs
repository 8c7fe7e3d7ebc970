//! #  Database management and control.
//!
//! This module defines the interface contracts that database *backends* for the loyalty engine must fulfil.
//!
//! * [`OrderManagement`] covers the order store: claiming order numbers, querying orders, and applying status updates
//!   resolved against the accrual service. Applying a terminal update and crediting the owner's ledger happen in one
//!   atomic unit of work.
//! * [`LedgerManagement`] covers the append-only ledger of credits and debits, balances, and withdrawals.
//! * [`LoyaltyDatabase`] ties the two together and is what the public APIs and the reconciliation agent are generic
//!   over.
mod ledger_management;
mod loyalty_database;
mod order_management;

pub use ledger_management::{LedgerError, LedgerManagement};
pub use loyalty_database::LoyaltyDatabase;
pub use order_management::{AccrualUpdateResult, OrderManagement, OrderStoreError};
