//! # SQLite backend
//!
//! The "low-level" SQLite interactions live in [`orders`] and [`operations`] as plain functions that accept a
//! `&mut SqliteConnection`. Callers obtain a connection from the pool, or open a transaction and pass `&mut tx`, without
//! any other changes. [`SqliteDatabase`] composes them into the atomic units of work the storage traits promise.
//!
//! SQLite allows one writer at a time. Every transaction that writes opens with its write statement, so the write lock
//! is taken before anything is read. This is what serializes a withdrawal against a concurrent credit for the same
//! user.
mod sqlite_impl;

pub mod operations;
pub mod orders;

use std::{str::FromStr, time::Duration};

use log::*;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};
pub use sqlite_impl::SqliteDatabase;

pub const SQLITE_DB_URL: &str = "sqlite://data/loyalty.db";
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);
    debug!("🗃️ Opening SQLite pool at {url} with up to {max_connections} connections");
    let pool = SqlitePoolOptions::new().max_connections(max_connections.max(1)).connect_with(options).await?;
    Ok(pool)
}
