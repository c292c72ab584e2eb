//! Unknown-propagating measure values
//!
//! Statistical sources encode "no data" with reserved sentinels; once
//! normalized, missing data travels through every arithmetic step as
//! [`MeasureValue::Unknown`] rather than as zero or NaN. Any operation with
//! an Unknown operand yields Unknown.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Div, Mul, Sub};

/// A numeric measure value that may be unknown
///
/// Unknown is first-class: it propagates through all arithmetic and
/// serializes as an empty CSV field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum MeasureValue {
    /// A known numeric value
    Known(f64),
    /// Missing or suppressed data
    Unknown,
}

impl MeasureValue {
    /// True if this value is unknown
    pub fn is_unknown(&self) -> bool {
        matches!(self, MeasureValue::Unknown)
    }

    /// The inner value, if known
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MeasureValue::Known(v) => Some(*v),
            MeasureValue::Unknown => None,
        }
    }

    /// Apply a function to a known value; Unknown passes through
    pub fn map(self, f: impl FnOnce(f64) -> f64) -> MeasureValue {
        match self {
            MeasureValue::Known(v) => MeasureValue::Known(f(v)),
            MeasureValue::Unknown => MeasureValue::Unknown,
        }
    }

    /// Combine two values; Unknown on either side propagates
    pub fn zip_with(self, other: MeasureValue, f: impl FnOnce(f64, f64) -> f64) -> MeasureValue {
        match (self, other) {
            (MeasureValue::Known(a), MeasureValue::Known(b)) => MeasureValue::Known(f(a, b)),
            _ => MeasureValue::Unknown,
        }
    }

    /// Round to two decimal places, the publication precision
    pub fn round2(self) -> MeasureValue {
        self.map(|v| (v * 100.0).round() / 100.0)
    }

    /// Clamp a known value to be non-negative (rates cannot go below zero)
    pub fn max_zero(self) -> MeasureValue {
        self.map(|v| v.max(0.0))
    }
}

impl From<f64> for MeasureValue {
    fn from(v: f64) -> Self {
        MeasureValue::Known(v)
    }
}

impl From<Option<f64>> for MeasureValue {
    fn from(v: Option<f64>) -> Self {
        match v {
            Some(v) => MeasureValue::Known(v),
            None => MeasureValue::Unknown,
        }
    }
}

impl From<MeasureValue> for Option<f64> {
    fn from(v: MeasureValue) -> Self {
        v.as_f64()
    }
}

impl Add for MeasureValue {
    type Output = MeasureValue;
    fn add(self, rhs: MeasureValue) -> MeasureValue {
        self.zip_with(rhs, |a, b| a + b)
    }
}

impl Sub for MeasureValue {
    type Output = MeasureValue;
    fn sub(self, rhs: MeasureValue) -> MeasureValue {
        self.zip_with(rhs, |a, b| a - b)
    }
}

impl Mul for MeasureValue {
    type Output = MeasureValue;
    fn mul(self, rhs: MeasureValue) -> MeasureValue {
        self.zip_with(rhs, |a, b| a * b)
    }
}

impl Div for MeasureValue {
    /// Division by a zero denominator yields Unknown here; callers that must
    /// treat a zero denominator as an error check before dividing.
    type Output = MeasureValue;
    fn div(self, rhs: MeasureValue) -> MeasureValue {
        match rhs {
            MeasureValue::Known(d) if d != 0.0 => self.zip_with(rhs, |a, b| a / b),
            _ => MeasureValue::Unknown,
        }
    }
}

impl Sum for MeasureValue {
    /// Sum propagates Unknown: one Unknown addend makes the total Unknown.
    /// An empty sum is Known(0.0).
    fn sum<I: Iterator<Item = MeasureValue>>(iter: I) -> MeasureValue {
        let mut total = 0.0;
        for v in iter {
            match v {
                MeasureValue::Known(x) => total += x,
                MeasureValue::Unknown => return MeasureValue::Unknown,
            }
        }
        MeasureValue::Known(total)
    }
}

impl fmt::Display for MeasureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasureValue::Known(v) => write!(f, "{}", v),
            MeasureValue::Unknown => Ok(()),
        }
    }
}
