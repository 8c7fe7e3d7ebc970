use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use loyalty_common::Points;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

use crate::helpers::luhn;

//--------------------------------------        UserId         ---------------------------------------------------------
/// The verified identity of a user, as supplied by the authentication layer. The engine treats it as an opaque key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct UserId(String);

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------      OrderNumber      ---------------------------------------------------------
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderNumberError {
    #[error("An order number cannot be empty")]
    Empty,
    #[error("Order number '{0}' contains characters other than digits")]
    NotNumeric(String),
    #[error("Order number '{0}' fails the Luhn checksum")]
    ChecksumFailed(String),
}

/// An order number: a non-empty string of ASCII digits. Parsing via [`FromStr`] only checks the format; call
/// [`OrderNumber::parse_checked`] (or [`OrderNumber::has_valid_checksum`]) where the Luhn checksum is required.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNumber(String);

impl FromStr for OrderNumber {
    type Err = OrderNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(OrderNumberError::Empty);
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OrderNumberError::NotNumeric(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for OrderNumber {
    type Error = OrderNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OrderNumber> for String {
    fn from(value: OrderNumber) -> Self {
        value.0
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderNumber {
    /// Parses the order number and additionally requires it to pass the Luhn checksum.
    pub fn parse_checked(s: &str) -> Result<Self, OrderNumberError> {
        let number = s.parse::<Self>()?;
        if !number.has_valid_checksum() {
            return Err(OrderNumberError::ChecksumFailed(number.0));
        }
        Ok(number)
    }

    pub fn has_valid_checksum(&self) -> bool {
        luhn::is_valid(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
/// The lifecycle of an order. `New -> Processing -> {Processed, Invalid}`. The last two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatusType {
    /// The order has been submitted, but the accrual service has not seen it yet.
    New,
    /// The accrual service is calculating the reward.
    Processing,
    /// The reward has been calculated. Terminal.
    Processed,
    /// The accrual service rejected the order. Terminal.
    Invalid,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Processed | Self::Invalid)
    }

    pub fn is_pending(&self) -> bool {
        !self.is_terminal()
    }

    /// Status only ever moves forward. Re-entering `Processing` is allowed (the accrual service reports it on every
    /// poll until it finishes), but nothing goes back to `New` and nothing leaves a terminal state.
    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        use OrderStatusType::*;
        match (self, next) {
            (New, Processing | Processed | Invalid) => true,
            (Processing, Processing | Processed | Invalid) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatusType::New => "NEW",
            OrderStatusType::Processing => "PROCESSING",
            OrderStatusType::Processed => "PROCESSED",
            OrderStatusType::Invalid => "INVALID",
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NEW" => Ok(Self::New),
            "PROCESSING" => Ok(Self::Processing),
            "PROCESSED" => Ok(Self::Processed),
            "INVALID" => Ok(Self::Invalid),
            _ => Err(ConversionError(s.to_string())),
        }
    }
}

//--------------------------------------      OrderKind        ---------------------------------------------------------
/// Orders are either submitted by users to earn an accrual, or created on the fly to record a withdrawal.
/// Withdrawal orders are never polled against the accrual service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderKind {
    Accrual,
    Withdrawal,
}

impl Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderKind::Accrual => write!(f, "ACCRUAL"),
            OrderKind::Withdrawal => write!(f, "WITHDRAWAL"),
        }
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub number: OrderNumber,
    pub owner: UserId,
    pub kind: OrderKind,
    pub status: OrderStatusType,
    /// Only ever set once the order is `Processed`.
    pub accrual: Option<Points>,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     ClaimResult       ---------------------------------------------------------
/// The non-error outcomes of claiming an order number.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimResult {
    /// The number was unseen and now belongs to the caller.
    Claimed(Order),
    /// The caller had already claimed this number. Resubmission is idempotent.
    AlreadyClaimedBySameOwner(Order),
}

impl ClaimResult {
    pub fn order(&self) -> &Order {
        match self {
            ClaimResult::Claimed(o) | ClaimResult::AlreadyClaimedBySameOwner(o) => o,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, ClaimResult::Claimed(_))
    }
}

//--------------------------------------     AccrualUpdate     ---------------------------------------------------------
/// A status change for one order, as resolved against the accrual service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccrualUpdate {
    pub number: OrderNumber,
    pub status: OrderStatusType,
    /// `None` and `Some(0)` are different: the first means the accrual service did not send an amount.
    pub accrual: Option<Points>,
}

impl AccrualUpdate {
    pub fn new(number: OrderNumber, status: OrderStatusType) -> Self {
        Self { number, status, accrual: None }
    }

    pub fn with_accrual(mut self, accrual: Points) -> Self {
        self.accrual = Some(accrual);
        self
    }

    /// The amount to credit to the owner's ledger, if this update warrants a credit at all.
    pub fn credit_amount(&self) -> Option<Points> {
        match (self.status, self.accrual) {
            (OrderStatusType::Processed, Some(amount)) if amount.is_positive() => Some(amount),
            _ => None,
        }
    }
}

//--------------------------------------    OperationKind      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    /// A credit from a processed order
    Accrual,
    /// A debit requested by the user
    Withdrawal,
}

impl Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::Accrual => write!(f, "ACCRUAL"),
            OperationKind::Withdrawal => write!(f, "WITHDRAWAL"),
        }
    }
}

//--------------------------------------   LedgerOperation     ---------------------------------------------------------
/// One immutable entry in a user's ledger. Credits are positive, debits negative.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct LedgerOperation {
    pub id: i64,
    pub user_id: UserId,
    pub order_number: OrderNumber,
    pub kind: OperationKind,
    pub amount: Points,
    pub processed_at: DateTime<Utc>,
}

//--------------------------------------       Balance         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Balance {
    /// The sum of every operation in the ledger
    pub current: Points,
    /// The sum of the magnitudes of every debit in the ledger
    pub withdrawn: Points,
}

impl Balance {
    /// Derives the balance from a list of ledger operations.
    pub fn from_operations(operations: &[LedgerOperation]) -> Self {
        operations.iter().fold(Self::default(), |mut balance, op| {
            balance.current += op.amount;
            if op.amount.is_negative() {
                balance.withdrawn += op.amount.abs();
            }
            balance
        })
    }
}

impl Display for Balance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "current: {}, withdrawn: {}", self.current, self.withdrawn)
    }
}

//--------------------------------------      Withdrawal       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Withdrawal {
    #[serde(rename = "order")]
    pub order_number: OrderNumber,
    /// The amount withdrawn, as a positive number
    pub sum: Points,
    pub processed_at: DateTime<Utc>,
}
