use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A statement amount, kept at the scale it was written with.
///
/// `Display` never rounds and never adds separators or a currency symbol, so
/// `"150.00"` renders back as `"150.00"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(Decimal);

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut decimal = Decimal::from_str(s)?;
        // Keep the sign of a written negative zero such as "-0.00".
        if s.starts_with('-') {
            decimal.set_sign_negative(true);
        }
        Ok(Money(decimal))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_zero() && self.0.is_sign_negative() {
            write!(f, "-{}", self.0.abs())
        } else {
            write!(f, "{}", self.0)
        }
    }
}
