//! Loyalty Engine
//!
//! The loyalty engine tracks order numbers submitted by users, asks an external accrual service how many points each
//! order earns, and keeps a per-user ledger of credits and withdrawals from which balances are derived.
//!
//! The library is divided into these sections:
//! 1. Database management and control ([`mod@db`]). The storage traits in [`traits`] define what a backend must do;
//!    SQLite is the supported backend. The data types used in the database are defined in [`db_types`].
//! 2. The public API ([`OrderFlowApi`] and [`LedgerApi`]). Order submissions and withdrawals are validated here
//!    before they reach the database.
//! 3. The accrual client adapter ([`accrual`]), which turns one accrual service response into an
//!    [`AccrualOutcome`](accrual::AccrualOutcome).
//! 4. The [`ReconciliationAgent`], the background process that moves pending orders through their lifecycle and
//!    credits processed orders to their owners.
mod db;

pub mod accrual;
pub mod db_types;
pub mod helpers;
mod loyalty_api;
pub mod reconciliation;

pub use accrual::{AccrualClient, HttpAccrualClient};
#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SQLITE_DB_URL};
pub use db::traits;
pub use loyalty_api::{ledger_api::LedgerApi, order_flow_api::OrderFlowApi};
pub use reconciliation::{AgentConfig, ReconciliationAgent, TickReport};
pub use traits::{LedgerManagement, LoyaltyDatabase, OrderManagement};
