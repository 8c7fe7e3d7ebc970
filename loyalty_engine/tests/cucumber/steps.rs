use cucumber::{given, then, when};
use loyalty_engine::{
    accrual::AccrualOutcome,
    db_types::{OrderNumber, OrderStatusType, Points, UserId},
    traits::{LedgerError, OrderStoreError},
    OrderManagement,
};

use crate::{
    cucumber::{LoyaltySystem, LoyaltyWorld},
    support::points,
};

#[given("a loyalty system")]
async fn a_loyalty_system(world: &mut LoyaltyWorld) {
    world.system = Some(LoyaltySystem::new().await);
}

#[given(expr = "the accrual service reports order {word} as {word} with {float} points")]
async fn accrual_reports_with_points(world: &mut LoyaltyWorld, number: String, status: String, amount: f64) {
    let status = status.parse::<OrderStatusType>().expect("Not a valid order status");
    world.system().accrual.respond(&number, AccrualOutcome::Resolved { status, accrual: Some(points(amount)) });
}

#[given(expr = "the accrual service reports order {word} as {word}")]
async fn accrual_reports(world: &mut LoyaltyWorld, number: String, status: String) {
    let status = status.parse::<OrderStatusType>().expect("Not a valid order status");
    world.system().accrual.status(&number, status);
}

#[given(expr = "the accrual service rate limits order {word}")]
async fn accrual_rate_limits(world: &mut LoyaltyWorld, number: String) {
    world.system().accrual.respond(&number, AccrualOutcome::RateLimited { retry_after: None });
}

#[given(expr = "the accrual service has no record of order {word}")]
async fn accrual_unknown(world: &mut LoyaltyWorld, number: String) {
    world.system().accrual.respond(&number, AccrualOutcome::Unknown);
}

#[given(expr = "user {word} has earned {float} points on order {word}")]
async fn user_has_earned(world: &mut LoyaltyWorld, user: String, amount: f64, number: String) {
    let sys = world.system();
    sys.accrual.processed(&number, Some(points(amount)));
    sys.orders.submit_order(&UserId::from(user), &number).await.expect("Error submitting order");
    let report = sys.agent.tick().await.expect("Error running reconciliation tick");
    assert!(report.credited >= 1, "Order {number} was not credited: {report}");
}

#[when(expr = "user {word} submits order {word}")]
async fn user_submits_order(world: &mut LoyaltyWorld, user: String, number: String) {
    let sys = world.system();
    sys.last_submission = Some(sys.orders.submit_order(&UserId::from(user), &number).await);
}

#[when("a reconciliation tick runs")]
async fn reconciliation_tick(world: &mut LoyaltyWorld) {
    let sys = world.system();
    sys.last_tick = Some(sys.agent.run_tick().await);
}

#[when(expr = "user {word} withdraws {float} points against order {word}")]
async fn user_withdraws(world: &mut LoyaltyWorld, user: String, amount: f64, number: String) {
    let sys = world.system();
    sys.last_withdrawal = Some(sys.ledger.withdraw(&UserId::from(user), &number, points(amount)).await);
}

#[then("the submission is accepted")]
async fn submission_accepted(world: &mut LoyaltyWorld) {
    let result = world.system().last_submission.as_ref().expect("Nothing was submitted");
    assert!(result.is_ok(), "Submission failed: {result:?}");
}

#[then("the submission is refused because another user owns the order")]
async fn submission_refused_owned(world: &mut LoyaltyWorld) {
    let result = world.system().last_submission.as_ref().expect("Nothing was submitted");
    assert!(matches!(result, Err(OrderStoreError::AlreadyClaimedByOtherOwner(_))), "Got {result:?}");
}

#[then("the submission is refused as an invalid order number")]
async fn submission_refused_invalid(world: &mut LoyaltyWorld) {
    let result = world.system().last_submission.as_ref().expect("Nothing was submitted");
    assert!(matches!(result, Err(OrderStoreError::InvalidOrderNumber(_))), "Got {result:?}");
}

#[then("the tick was cut short by a rate limit")]
async fn tick_rate_limited(world: &mut LoyaltyWorld) {
    let result = world.system().last_tick.as_ref().expect("No tick has run");
    let report = result.as_ref().expect("The tick failed");
    assert!(report.was_interrupted(), "The tick was not interrupted: {report}");
}

#[then("the withdrawal succeeds")]
async fn withdrawal_succeeds(world: &mut LoyaltyWorld) {
    let result = world.system().last_withdrawal.as_ref().expect("No withdrawal was made");
    assert!(result.is_ok(), "Withdrawal failed: {result:?}");
}

#[then("the withdrawal is refused for insufficient funds")]
async fn withdrawal_insufficient(world: &mut LoyaltyWorld) {
    let result = world.system().last_withdrawal.as_ref().expect("No withdrawal was made");
    assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })), "Got {result:?}");
}

#[then("the withdrawal is refused as an invalid order number")]
async fn withdrawal_invalid_number(world: &mut LoyaltyWorld) {
    let result = world.system().last_withdrawal.as_ref().expect("No withdrawal was made");
    assert!(matches!(result, Err(LedgerError::InvalidOrderNumber(_))), "Got {result:?}");
}

#[then(expr = "order {word} is {word}")]
async fn order_status_is(world: &mut LoyaltyWorld, number: String, status: String) {
    let expected = status.parse::<OrderStatusType>().expect("Not a valid order status");
    let number = number.parse::<OrderNumber>().expect("Not a valid order number");
    let order = world.system().db.fetch_order(&number).await.expect("Error fetching order").expect("No such order");
    assert_eq!(order.status, expected);
}

#[then(expr = "the balance of user {word} is {float} points")]
async fn balance_is(world: &mut LoyaltyWorld, user: String, amount: f64) {
    let balance = world.system().ledger.balance(&UserId::from(user)).await.expect("Error fetching balance");
    assert_eq!(balance.current, points(amount), "Balance is {}", balance.current);
}

#[then(expr = "the withdrawn total of user {word} is {float} points")]
async fn withdrawn_is(world: &mut LoyaltyWorld, user: String, amount: f64) {
    let balance = world.system().ledger.balance(&UserId::from(user)).await.expect("Error fetching balance");
    assert_eq!(balance.withdrawn, points(amount), "Withdrawn total is {}", balance.withdrawn);
}

#[then(expr = "user {word} has {int} ledger operation(s)")]
async fn ledger_operations(world: &mut LoyaltyWorld, user: String, count: usize) {
    let user = UserId::from(user);
    let ops = world.system().ledger.history(&user).await.expect("Error fetching history");
    assert_eq!(ops.len(), count, "Ledger: {ops:?}");
    let total: Points = ops.iter().map(|op| op.amount).sum();
    let balance = world.system().ledger.balance(&user).await.expect("Error fetching balance");
    assert_eq!(balance.current, total);
}
