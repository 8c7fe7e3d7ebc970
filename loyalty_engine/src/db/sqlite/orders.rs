use chrono::Utc;
use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{AccrualUpdate, ClaimResult, Order, OrderNumber, OrderStatusType, UserId},
    traits::OrderStoreError,
};

/// Inserts a new accrual order for `owner`, unless the number is already taken. In that case the existing order is
/// compared against `owner`.
///
/// The insert is the first statement, so when this runs inside a transaction the write lock is held before the
/// existing order is read back.
pub async fn claim(
    owner: &UserId,
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<ClaimResult, OrderStoreError> {
    let now = Utc::now();
    let inserted: Option<Order> = sqlx::query_as(
        r#"
            INSERT INTO orders (number, owner, kind, status, uploaded_at, updated_at)
            VALUES ($1, $2, 'ACCRUAL', 'NEW', $3, $4)
            ON CONFLICT (number) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(number.as_str())
    .bind(owner.as_str())
    .bind(now)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(order) = inserted {
        trace!("🗃️ Order {number} inserted for {owner}");
        return Ok(ClaimResult::Claimed(order));
    }
    // The conflicting row is visible in this transaction and orders are never deleted, so this cannot be empty
    let existing = fetch_order(number, conn).await?.ok_or_else(|| {
        OrderStoreError::DatabaseError(format!("order {number} conflicted on insert but could not be read back"))
    })?;
    if &existing.owner == owner {
        trace!("🗃️ Order {number} was already claimed by {owner}");
        Ok(ClaimResult::AlreadyClaimedBySameOwner(existing))
    } else {
        trace!("🗃️ Order {number} is owned by {}, not {owner}", existing.owner);
        Err(OrderStoreError::AlreadyClaimedByOtherOwner(number.clone()))
    }
}

/// Records `number` as a withdrawal reference for `owner`. Returns `None` if the number is already in use.
pub async fn insert_withdrawal_order(
    owner: &UserId,
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let now = Utc::now();
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (number, owner, kind, status, uploaded_at, updated_at)
            VALUES ($1, $2, 'WITHDRAWAL', 'PROCESSED', $3, $4)
            ON CONFLICT (number) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(number.as_str())
    .bind(owner.as_str())
    .bind(now)
    .bind(now)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn fetch_order(number: &OrderNumber, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE number = $1").bind(number.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_orders_for_owner(owner: &UserId, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        r#"
            SELECT * FROM orders
            WHERE owner = $1 AND kind = 'ACCRUAL'
            ORDER BY uploaded_at DESC, rowid DESC;
        "#,
    )
    .bind(owner.as_str())
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

pub async fn fetch_pending_order_numbers(conn: &mut SqliteConnection) -> Result<Vec<OrderNumber>, sqlx::Error> {
    let numbers = sqlx::query_scalar(
        r#"
            SELECT number FROM orders
            WHERE kind = 'ACCRUAL' AND status IN ('NEW', 'PROCESSING')
            ORDER BY uploaded_at ASC, rowid ASC;
        "#,
    )
    .fetch_all(conn)
    .await?;
    Ok(numbers)
}

/// Moves a pending accrual order to the status in `update`. Returns `None` if no row qualified: the order is missing,
/// is a withdrawal reference, is already terminal, or already has the requested status.
///
/// The accrual amount is only stored for `Processed` orders.
pub async fn update_pending_status(
    update: &AccrualUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let accrual = match update.status {
        OrderStatusType::Processed => update.accrual.map(|a| a.value()),
        _ => None,
    };
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET status = $1, accrual = $2, updated_at = $3
            WHERE number = $4
              AND kind = 'ACCRUAL'
              AND status IN ('NEW', 'PROCESSING')
              AND status <> $5
            RETURNING *;
        "#,
    )
    .bind(update.status)
    .bind(accrual)
    .bind(Utc::now())
    .bind(update.number.as_str())
    .bind(update.status)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}
