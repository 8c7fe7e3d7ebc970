#![allow(dead_code)]

pub mod prepare_env;
pub mod scripted_client;

use loyalty_engine::{
    db_types::{AccrualUpdate, OrderNumber, OrderStatusType, Points, UserId},
    helpers::luhn,
    traits::AccrualUpdateResult,
    OrderManagement,
    SqliteDatabase,
};

/// Appends the Luhn check digit to `payload`.
pub fn with_check_digit(payload: &str) -> String {
    (0..10)
        .map(|d| format!("{payload}{d}"))
        .find(|candidate| luhn::is_valid(candidate))
        .expect("One of the ten check digits is always valid")
}

/// A Luhn-valid order number that is unique for each `seed`.
pub fn order_number(seed: u64) -> OrderNumber {
    OrderNumber::parse_checked(&with_check_digit(&format!("7{seed:09}"))).expect("Generated an invalid order number")
}

pub fn points(value: f64) -> Points {
    Points::try_from(value).expect("Not a valid points amount")
}

/// Claims `number` for `user` and immediately processes it with the given accrual.
pub async fn credit(db: &SqliteDatabase, user: &UserId, number: &OrderNumber, amount: f64) {
    db.claim_order(user, number).await.expect("Error claiming order");
    let update = AccrualUpdate::new(number.clone(), OrderStatusType::Processed).with_accrual(points(amount));
    let result = db.apply_accrual_update(&update).await.expect("Error applying update");
    assert!(matches!(result, AccrualUpdateResult::Credited(..)), "Expected a credit, got {result:?}");
}
