use chrono::Utc;
use sqlx::SqliteConnection;

use crate::db_types::{Balance, LedgerOperation, OperationKind, OrderNumber, Points, UserId, Withdrawal};

/// Appends an operation to the ledger. The schema rejects credits that are not positive, debits that are not
/// negative, and a second operation of the same kind against the same order.
pub async fn insert_operation(
    user: &UserId,
    number: &OrderNumber,
    kind: OperationKind,
    amount: Points,
    conn: &mut SqliteConnection,
) -> Result<LedgerOperation, sqlx::Error> {
    let op = sqlx::query_as(
        r#"
            INSERT INTO operations (user_id, order_number, kind, amount, processed_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(user.as_str())
    .bind(number.as_str())
    .bind(kind)
    .bind(amount.value())
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(op)
}

pub async fn fetch_balance(user: &UserId, conn: &mut SqliteConnection) -> Result<Balance, sqlx::Error> {
    let balance = sqlx::query_as(
        r#"
            SELECT
                COALESCE(SUM(amount), 0) AS current,
                COALESCE(-SUM(CASE WHEN amount < 0 THEN amount ELSE 0 END), 0) AS withdrawn
            FROM operations
            WHERE user_id = $1;
        "#,
    )
    .bind(user.as_str())
    .fetch_one(conn)
    .await?;
    Ok(balance)
}

pub async fn fetch_withdrawals(user: &UserId, conn: &mut SqliteConnection) -> Result<Vec<Withdrawal>, sqlx::Error> {
    let withdrawals = sqlx::query_as(
        r#"
            SELECT order_number, -amount AS sum, processed_at
            FROM operations
            WHERE user_id = $1 AND kind = 'WITHDRAWAL'
            ORDER BY processed_at DESC, id DESC;
        "#,
    )
    .bind(user.as_str())
    .fetch_all(conn)
    .await?;
    Ok(withdrawals)
}

pub async fn fetch_operations(user: &UserId, conn: &mut SqliteConnection) -> Result<Vec<LedgerOperation>, sqlx::Error> {
    let ops = sqlx::query_as("SELECT * FROM operations WHERE user_id = $1 ORDER BY id ASC")
        .bind(user.as_str())
        .fetch_all(conn)
        .await?;
    Ok(ops)
}
