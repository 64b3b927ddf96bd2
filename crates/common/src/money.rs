//! Money arithmetic in integer cents.

use serde::{Deserialize, Serialize};

/// Money amount represented in cents to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = $10.00)
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Applies an agency markup percentage, rounding to the nearest cent.
    ///
    /// A markup of `5.0` turns 100.00 into 105.00. Zero or negative
    /// percentages return the amount unchanged.
    pub fn with_markup(&self, percent: f64) -> Self {
        if percent <= 0.0 {
            return *self;
        }
        let marked = (self.cents as f64) * (1.0 + percent / 100.0);
        Self {
            cents: marked.round() as i64,
        }
    }

    /// Multiplies the amount by a quantity.
    pub fn times(&self, quantity: u32) -> Self {
        Self {
            cents: self.cents * i64::from(quantity),
        }
    }

    /// Parses a decimal amount such as `123.45` (provider wire format)
    /// into cents, rounding to the nearest cent.
    pub fn from_decimal(amount: f64) -> Self {
        Self {
            cents: (amount * 100.0).round() as i64,
        }
    }

    /// Returns the amount as a decimal value for wire serialization.
    pub fn as_decimal(&self) -> f64 {
        self.cents as f64 / 100.0
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money {
            cents: self.cents + other.cents,
        }
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, (self.cents % 100).abs())
    }
}
