//! Fixed-scale money type.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Every `Money` value carries exactly [`MONEY_SCALE`] fractional digits. Addition and
//! subtraction are exact. Multiplication by a quantity or a percentage is the only place
//! rounding happens, and it always rounds once, with Banker's Rounding, at this scale.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Number of fractional digits carried by every monetary amount.
///
/// Matches the `NUMERIC(19, 4)` columns used for persistence.
pub const MONEY_SCALE: u32 = 4;

/// Largest absolute value representable by a `NUMERIC(19, 4)` column.
const MAX_ABS: Decimal = Decimal::from_parts(2_313_682_943, 2_328_306_436, 0, false, MONEY_SCALE);

/// Errors raised when a value cannot be represented as `Money`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// The value has more fractional digits than the money scale allows.
    #[error("Amount {value} has more than {scale} fractional digits")]
    ExcessPrecision {
        /// The rejected value.
        value: Decimal,
        /// The money scale.
        scale: u32,
    },

    /// The value exceeds the storable range.
    #[error("Amount {0} is outside the storable range")]
    OutOfRange(Decimal),

    /// The text is not a decimal number.
    #[error("Invalid amount: {0}")]
    Parse(String),
}

/// A signed monetary amount with exactly four fractional digits.
///
/// Equality and ordering are exact. The currency tag is stored beside the amount on
/// each entity, not inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(Decimal);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::from_parts(0, 0, 0, false, MONEY_SCALE));

    /// Creates an amount from minor units of `10^-4` (e.g. `1_500_000` is `150.0000`).
    #[must_use]
    pub fn from_minor_units(units: i64) -> Self {
        Self(Decimal::new(units, MONEY_SCALE))
    }

    /// Creates an amount from an exact decimal.
    ///
    /// # Errors
    ///
    /// Returns `ExcessPrecision` if the value needs more than four fractional digits and
    /// `OutOfRange` if it does not fit the storage column. The value is never rounded.
    pub fn from_decimal(value: Decimal) -> Result<Self, MoneyError> {
        if value.normalize().scale() > MONEY_SCALE {
            return Err(MoneyError::ExcessPrecision {
                value,
                scale: MONEY_SCALE,
            });
        }
        Self::rescaled(value)
    }

    /// Rounds a decimal to the money scale using Banker's Rounding.
    ///
    /// This is the single rounding boundary of the ledger; it is only used for products
    /// such as `quantity × unit_price` or percentages.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if the rounded value does not fit the storage column.
    pub fn round_from(value: Decimal) -> Result<Self, MoneyError> {
        Self::rescaled(
            value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven),
        )
    }

    fn rescaled(mut value: Decimal) -> Result<Self, MoneyError> {
        if value.abs() > MAX_ABS {
            return Err(MoneyError::OutOfRange(value));
        }
        value.rescale(MONEY_SCALE);
        Ok(Self(value))
    }

    /// Returns the underlying decimal (always at scale 4).
    #[must_use]
    pub const fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the amount is strictly negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns true if the amount is strictly positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Absolute value.
    #[must_use]
    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// Multiplies by a quantity, rounding the product once at the money scale.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if the product overflows or does not fit the storage column.
    pub fn mul_quantity(self, quantity: Decimal) -> Result<Self, MoneyError> {
        let product = self
            .0
            .checked_mul(quantity)
            .ok_or(MoneyError::OutOfRange(self.0))?;
        Self::round_from(product)
    }

    /// Computes `rate` percent of this amount (`rate = 11` means 11%), rounded once.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if the result does not fit the storage column.
    pub fn percentage(self, rate: Decimal) -> Result<Self, MoneyError> {
        let product = self
            .0
            .checked_mul(rate)
            .ok_or(MoneyError::OutOfRange(self.0))?;
        Self::round_from(product / Decimal::ONE_HUNDRED)
    }

    /// Returns the smaller of two amounts.
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        if self <= other { self } else { other }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::from_decimal(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str_exact(s.trim()).map_err(|_| MoneyError::Parse(s.to_string()))?;
        Self::from_decimal(value)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// ISO 4217 currency codes supported by the ledger.
///
/// The ledger only stores the tag; it never converts between currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// US Dollar
    Usd,
    /// Euro
    Eur,
    /// Pound Sterling
    Gbp,
    /// Indonesian Rupiah
    Idr,
    /// Singapore Dollar
    Sgd,
    /// Japanese Yen
    Jpy,
}

impl Currency {
    /// Returns the ISO 4217 code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Idr => "IDR",
            Self::Sgd => "SGD",
            Self::Jpy => "JPY",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "USD" => Ok(Self::Usd),
            "EUR" => Ok(Self::Eur),
            "GBP" => Ok(Self::Gbp),
            "IDR" => Ok(Self::Idr),
            "SGD" => Ok(Self::Sgd),
            "JPY" => Ok(Self::Jpy),
            _ => Err(format!("Unknown currency: {s}")),
        }
    }
}
