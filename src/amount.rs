//! A fixed-point money type stored as whole cents.

use std::{
    fmt::Display,
    iter::Sum,
    ops::Add,
    str::FromStr,
};

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlResult, ToSqlOutput, ValueRef},
};
use rust_decimal::{Decimal, prelude::ToPrimitive};

use crate::Error;

/// The number of digits allowed after the decimal point.
pub const DECIMAL_PLACES: u32 = 2;

/// The number of digits allowed before the decimal point.
pub const MAX_WHOLE_DIGITS: u32 = 8;

/// An amount of money with exactly two decimal places.
///
/// Amounts are written to the database as integer cents so that sums computed
/// in SQL are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    /// The amount zero.
    pub fn zero() -> Self {
        Self(Decimal::new(0, DECIMAL_PLACES))
    }

    /// Create an amount from a whole number of cents, e.g. `1050` is `10.50`.
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, DECIMAL_PLACES))
    }

    /// The amount as a whole number of cents.
    ///
    /// Returns `None` if the amount does not fit in an `i64`.
    pub fn as_cents(&self) -> Option<i64> {
        let mut value = self.0.round_dp(DECIMAL_PLACES);
        value.rescale(DECIMAL_PLACES);

        i64::try_from(value.mantissa()).ok()
    }

    /// The amount as a float for charting.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }

    /// Whether the amount is greater than zero.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// The mean of `count` amounts that sum to `total`, rounded to the nearest cent.
    ///
    /// Returns zero when `count` is zero.
    pub fn average(total: Amount, count: u32) -> Amount {
        if count == 0 {
            return Amount::zero();
        }

        let mut mean = (total.0 / Decimal::from(count)).round_dp(DECIMAL_PLACES);
        mean.rescale(DECIMAL_PLACES);

        Amount(mean)
    }
}

impl FromStr for Amount {
    type Err = Error;

    /// Parse a decimal string such as "12.5" or "1234.56".
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidAmount] if the string is not a number, has more
    /// than two decimal places or has more than eight whole digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())
            .map_err(|_| Error::InvalidAmount("Enter a number.".to_owned()))?;

        if value.normalize().scale() > DECIMAL_PLACES {
            return Err(Error::InvalidAmount(format!(
                "Ensure that there are no more than {DECIMAL_PLACES} decimal places."
            )));
        }

        if value.abs().trunc() >= Decimal::from(10_i64.pow(MAX_WHOLE_DIGITS)) {
            return Err(Error::InvalidAmount(format!(
                "Ensure that there are no more than {MAX_WHOLE_DIGITS} digits before the decimal point."
            )));
        }

        let mut value = value;
        value.rescale(DECIMAL_PLACES);

        Ok(Self(value))
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl ToSql for Amount {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let cents = self.as_cents().ok_or_else(|| {
            rusqlite::Error::ToSqlConversionFailure(
                format!("amount {self} is too large to store as cents").into(),
            )
        })?;

        Ok(ToSqlOutput::from(cents))
    }
}

impl FromSql for Amount {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Amount::from_cents)
    }
}
