use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// The number of [`Points`] units in one whole loyalty point.
pub const POINTS_PRECISION: i64 = 100;

//--------------------------------------       Points        ---------------------------------------------------------
/// A loyalty point amount, stored as a whole number of hundredths so that ledger sums are exact.
///
/// On the wire (JSON) points are plain decimal numbers, e.g. `729.98`.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(try_from = "f64", into = "f64")]
pub struct Points(i64);

op!(binary Points, Add, add);
op!(binary Points, Sub, sub);
op!(inplace Points, AddAssign, add_assign);
op!(inplace Points, SubAssign, sub_assign);
op!(unary Points, Neg, neg);

impl Mul<i64> for Points {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Points {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as loyalty points: {0}")]
pub struct PointsConversionError(String);

/// Construct from a raw number of hundredths.
impl From<i64> for Points {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<f64> for Points {
    type Error = PointsConversionError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        let scaled = (value * POINTS_PRECISION as f64).round();
        if !scaled.is_finite() || scaled.abs() >= i64::MAX as f64 {
            return Err(PointsConversionError(format!("{value} is out of range")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(scaled as i64))
    }
}

impl From<Points> for f64 {
    fn from(value: Points) -> Self {
        value.0 as f64 / POINTS_PRECISION as f64
    }
}

impl Display for Points {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let precision = POINTS_PRECISION.unsigned_abs();
        write!(f, "{sign}{}.{:02}pts", abs / precision, abs % precision)
    }
}

impl Points {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_points(points: i64) -> Self {
        Self(points * POINTS_PRECISION)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }
}
