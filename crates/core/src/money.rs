use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Neg;
use std::str::FromStr;

/// Signed statement amount. Negative values leave the account, positive
/// values arrive in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(decimal: Decimal) -> Self {
        Amount(decimal)
    }

    pub fn from_cents(cents: i64) -> Self {
        Amount(Decimal::new(cents, 2))
    }

    pub fn zero() -> Self {
        Amount(Decimal::ZERO)
    }

    pub fn decimal(self) -> Decimal {
        self.0
    }

    /// Same value with trailing zeros dropped, so equal amounts render alike.
    pub fn normalized(self) -> Self {
        Amount(self.0.normalize())
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Amount)
    }
}

impl Neg for Amount {
    type Output = Self;
    fn neg(self) -> Self {
        Amount(-self.0)
    }
}
