use std::{fmt::Display, time::Duration};

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::db_types::{AccrualUpdate, OrderNumber, OrderStatusType, Points};

/// The order status as reported by the accrual service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccrualStatus {
    Registered,
    Processing,
    Invalid,
    Processed,
}

impl From<AccrualStatus> for OrderStatusType {
    fn from(status: AccrualStatus) -> Self {
        match status {
            AccrualStatus::Registered | AccrualStatus::Processing => OrderStatusType::Processing,
            AccrualStatus::Invalid => OrderStatusType::Invalid,
            AccrualStatus::Processed => OrderStatusType::Processed,
        }
    }
}

/// The body of a `200` response from the accrual service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualResponse {
    pub order: String,
    pub status: AccrualStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Points>,
}

/// What the reconciliation agent needs to know about a single accrual request.
#[derive(Debug, Clone, PartialEq)]
pub enum AccrualOutcome {
    /// The accrual service knows the order. `accrual` is only ever set when `status` is `Processed`.
    Resolved { status: OrderStatusType, accrual: Option<Points> },
    /// The accrual service has no record of the order yet.
    Unknown,
    /// We are being throttled. Stop polling until the next tick, or until `retry_after` has passed.
    RateLimited { retry_after: Option<Duration> },
    /// Network failure, timeout, or an unexpected status code.
    Transient(String),
    /// The accrual service answered `200`, but the body makes no sense. The order is marked `Invalid`.
    Malformed(String),
}

impl AccrualOutcome {
    /// Outcomes that must stop the current reconciliation tick.
    pub fn is_abort(&self) -> bool {
        matches!(self, AccrualOutcome::RateLimited { .. } | AccrualOutcome::Transient(_))
    }

    /// The store update this outcome calls for, if any.
    pub fn into_update(self, number: OrderNumber) -> Option<AccrualUpdate> {
        match self {
            AccrualOutcome::Resolved { status, accrual } => Some(AccrualUpdate { number, status, accrual }),
            AccrualOutcome::Malformed(_) => Some(AccrualUpdate::new(number, OrderStatusType::Invalid)),
            _ => None,
        }
    }
}

impl Display for AccrualOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccrualOutcome::Resolved { status, accrual: Some(a) } => write!(f, "{status} ({a})"),
            AccrualOutcome::Resolved { status, accrual: None } => write!(f, "{status}"),
            AccrualOutcome::Unknown => write!(f, "unknown to the accrual service"),
            AccrualOutcome::RateLimited { retry_after: Some(d) } => write!(f, "rate limited for {}s", d.as_secs()),
            AccrualOutcome::RateLimited { retry_after: None } => write!(f, "rate limited"),
            AccrualOutcome::Transient(reason) => write!(f, "transient failure: {reason}"),
            AccrualOutcome::Malformed(reason) => write!(f, "malformed response: {reason}"),
        }
    }
}

/// Normalises a raw accrual service response for order `number`.
///
/// `retry_after` is the raw `Retry-After` header, if any. Only the delay-seconds form is understood.
pub fn interpret_response(
    number: &OrderNumber,
    status: StatusCode,
    retry_after: Option<&str>,
    body: &[u8],
) -> AccrualOutcome {
    match status {
        StatusCode::OK => decode_body(number, body),
        StatusCode::NO_CONTENT => AccrualOutcome::Unknown,
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = retry_after.and_then(|s| s.trim().parse::<u64>().ok()).map(Duration::from_secs);
            AccrualOutcome::RateLimited { retry_after }
        },
        code => AccrualOutcome::Transient(format!("accrual service returned {code}")),
    }
}

fn decode_body(number: &OrderNumber, body: &[u8]) -> AccrualOutcome {
    let response = match serde_json::from_slice::<AccrualResponse>(body) {
        Ok(r) => r,
        Err(e) => return AccrualOutcome::Malformed(format!("could not decode body: {e}")),
    };
    if response.order.trim() != number.as_str() {
        return AccrualOutcome::Malformed(format!("response is for order {}, not {number}", response.order));
    }
    let status = OrderStatusType::from(response.status);
    let accrual = match (status, response.accrual) {
        (OrderStatusType::Processed, Some(a)) if a.is_negative() => {
            return AccrualOutcome::Malformed(format!("negative accrual {a}"));
        },
        (OrderStatusType::Processed, accrual) => accrual,
        _ => None,
    };
    AccrualOutcome::Resolved { status, accrual }
}
