use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const STORE_CURRENCY_CODE: &str = "EUR";
pub const STORE_CURRENCY_CODE_LOWER: &str = "eur";

//--------------------------------------      Cents        ------------------------------------------------------------
/// An amount of money in minor currency units (euro cents). Every amount that crosses a module boundary is expressed
/// in `Cents`; conversion from major units happens exactly once, at the cart intake boundary.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Cents(i64);

op!(binary Cents, Add, add);
op!(binary Cents, Sub, sub);
op!(inplace Cents, SubAssign, sub_assign);
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

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in cents: {0}")]
pub struct CentsConversionError(String);

impl From<i64> for Cents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Cents {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Cents {}

impl TryFrom<u64> for Cents {
    type Error = CentsConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(CentsConversionError(format!("Value {} is too large to convert to Cents", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let euros = self.0 / 100;
        let cents = (self.0 % 100).abs();
        write!(f, "€{euros}.{cents:02}")
    }
}

impl Cents {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_euros(euros: i64) -> Self {
        Self(euros * 100)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = Cents::from(4500);
        let b = Cents::from_euros(5);
        assert_eq!(a + b, Cents::from(5000));
        assert_eq!(a - b, Cents::from(4000));
        assert_eq!(a * 2, Cents::from(9000));
        assert_eq!(-b, Cents::from(-500));
        let total: Cents = [a, b].into_iter().sum();
        assert_eq!(total, Cents::from(5000));
    }

    #[test]
    fn display_formats_major_and_minor_units() {
        assert_eq!(Cents::from(4500).to_string(), "€45.00");
        assert_eq!(Cents::from(199).to_string(), "€1.99");
        assert_eq!(Cents::from(5).to_string(), "€0.05");
    }
}
