use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const DEFAULT_CURRENCY_CODE: &str = "USD";

//--------------------------------------       Cents         ---------------------------------------------------------
/// An amount of money in the minor unit of the store currency.
///
/// Both Shopify and Stripe agree on two-decimal currencies for every store SynqSell supports, so a signed integer
/// number of cents is exact and cheap to store.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[sqlx(transparent)]
pub struct Cents(i64);

op!(binary Cents, Add, add);
op!(binary Cents, Sub, sub);
op!(inplace Cents, SubAssign, sub_assign);
op!(inplace Cents, AddAssign, add_assign);
op!(unary Cents, Neg, neg);

impl Mul<i64> for Cents {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Value cannot be represented in cents: {0}")]
pub struct CentsConversionError(String);

impl From<i64> for Cents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Cents {
    type Error = CentsConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value)
            .map(Self)
            .map_err(|_| CentsConversionError(format!("Value {value} is too large to convert to Cents")))
    }
}

/// Shopify expresses prices as decimal strings, e.g. "12.5" or "12.50".
impl FromStr for Cents {
    type Err = CentsConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let mut parts = digits.splitn(2, '.');
        let whole = parts.next().unwrap_or_default();
        let fraction = parts.next().unwrap_or_default();
        if whole.is_empty() && fraction.is_empty() {
            return Err(CentsConversionError(format!("Empty price value: '{s}'")));
        }
        if fraction.len() > 2 {
            return Err(CentsConversionError(format!("Too many decimal places in price value: '{s}'")));
        }
        let whole_units = if whole.is_empty() {
            0
        } else {
            whole.parse::<i64>().map_err(|e| CentsConversionError(format!("Invalid price value: '{s}'. {e}.")))?
        };
        let cents = match fraction.len() {
            0 => 0,
            1 => 10 * parse_fraction(fraction, s)?,
            _ => parse_fraction(fraction, s)?,
        };
        let value = whole_units
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .ok_or_else(|| CentsConversionError(format!("Price value overflows: '{s}'")))?;
        Ok(Self(if negative { -value } else { value }))
    }
}

fn parse_fraction(fraction: &str, original: &str) -> Result<i64, CentsConversionError> {
    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(CentsConversionError(format!("Invalid price value: '{original}'")));
    }
    fraction.parse::<i64>().map_err(|e| CentsConversionError(format!("Invalid price value: '{original}'. {e}.")))
}

impl Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${}", self.to_decimal_string())
    }
}

impl Cents {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_dollars(dollars: i64) -> Self {
        Self(dollars * 100)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// The decimal representation Shopify expects in `MoneyInput`/price fields, e.g. `12.50`.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_shopify_prices() {
        assert_eq!("12.50".parse::<Cents>().unwrap(), Cents::from(1250));
        assert_eq!("12.5".parse::<Cents>().unwrap(), Cents::from(1250));
        assert_eq!("12".parse::<Cents>().unwrap(), Cents::from(1200));
        assert_eq!("0.07".parse::<Cents>().unwrap(), Cents::from(7));
        assert_eq!("-3.01".parse::<Cents>().unwrap(), Cents::from(-301));
        assert!("12.505".parse::<Cents>().is_err());
        assert!("abc".parse::<Cents>().is_err());
        assert!("".parse::<Cents>().is_err());
        assert!("1.-5".parse::<Cents>().is_err());
    }

    #[test]
    fn decimal_strings() {
        assert_eq!(Cents::from(1250).to_decimal_string(), "12.50");
        assert_eq!(Cents::from(7).to_decimal_string(), "0.07");
        assert_eq!(Cents::from(-301).to_decimal_string(), "-3.01");
        assert_eq!(Cents::from_dollars(10).to_string(), "$10.00");
    }

    #[test]
    fn arithmetic() {
        let total: Cents = vec![Cents::from(100), Cents::from(250)].into_iter().sum();
        assert_eq!(total, Cents::from(350));
        assert_eq!(Cents::from(300) * 3, Cents::from(900));
        let mut c = Cents::from(500);
        c -= Cents::from(120);
        assert_eq!(c, Cents::from(380));
    }
}
