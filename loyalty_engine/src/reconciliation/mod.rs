//! # Reconciliation
//!
//! The [`ReconciliationAgent`] periodically asks the order store for every pending order, fans the order numbers out
//! to a bounded [`WorkerPool`] of accrual requests, and applies each result to the store as it comes back. A rate
//! limit or transient failure from the accrual service stops the tick early. Whatever was already resolved is kept, and
//! the rest is picked up on the next tick.
mod agent;
mod errors;
mod tick_report;
mod worker_pool;

pub use agent::{AgentConfig, ReconciliationAgent};
pub use errors::ReconciliationError;
pub use tick_report::TickReport;
pub use worker_pool::{PoolHandle, WorkerPool};
