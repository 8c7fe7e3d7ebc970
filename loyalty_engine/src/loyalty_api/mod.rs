//! # Loyalty engine public API
//!
//! * [`order_flow_api`] accepts order submissions from users and reports on their orders.
//! * [`ledger_api`] reports balances and ledger history, and validates and executes withdrawals.
//!
//! Both are created by supplying a database backend that implements the backend traits they require:
//!
//! ```rust,ignore
//! use loyalty_engine::{LedgerApi, SqliteDatabase, db_types::UserId};
//! let db = SqliteDatabase::new_with_url("sqlite://data/loyalty.db", 5).await?;
//! let api = LedgerApi::new(db);
//! let balance = api.balance(&UserId::from("alice")).await?;
//! ```
pub mod ledger_api;
pub mod order_flow_api;
