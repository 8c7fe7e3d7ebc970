//! # Loyalty server
//! This crate hosts the long-running loyalty process. It is responsible for:
//! * opening (and migrating) the loyalty database,
//! * running the reconciliation agent, which polls the accrual service for every pending order and credits processed
//!   orders to their owners,
//! * shutting the agent down cleanly when the process is stopped.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
pub mod accrual_worker;
pub mod cli;
pub mod config;
pub mod errors;
pub mod routes;
pub mod server;
