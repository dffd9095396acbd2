use std::{
    fmt,
    ops::{Add, AddAssign, Sub},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Money amount represented as **whole rupees**.
///
/// Every amount the engine handles (dakshina, travel, refunds, payouts) is an
/// integer number of currency units; rounding happens once, where a
/// percentage is applied, and nowhere else.
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::new(2_600);
/// assert_eq!(amount.rupees(), 2600);
/// assert_eq!(amount.to_string(), "₹2600");
/// ```
///
/// Parsing from admin input (accepts `,` grouping, rejects fractions):
///
/// ```rust
/// use engine::Money;
///
/// assert_eq!("2,100".parse::<Money>().unwrap().rupees(), 2100);
/// assert!("12.50".parse::<Money>().is_err());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    #[must_use]
    pub const fn new(rupees: i64) -> Self {
        Self(rupees)
    }

    #[must_use]
    pub const fn rupees(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Absolute difference between two amounts.
    #[must_use]
    pub const fn abs_diff(self, other: Money) -> u64 {
        self.0.abs_diff(other.0)
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// Applies `percent` and rounds half up to the nearest rupee.
    ///
    /// Only meaningful for non-negative amounts; callers validate that first.
    pub fn percent_of(self, percent: u8) -> Result<Money, EngineError> {
        let overflow = || EngineError::InvalidAmount(format!("{self} is too large"));
        let scaled = self
            .0
            .checked_mul(i64::from(percent))
            .and_then(|v| v.checked_add(50))
            .ok_or_else(overflow)?;
        Ok(Money(scaled / 100))
    }

    /// Parses an optional form field: blank input means zero.
    pub fn parse_or_zero(input: Option<&str>) -> Result<Money, EngineError> {
        match input.map(str::trim) {
            None | Some("") => Ok(Money::ZERO),
            Some(raw) => raw.parse(),
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{sign}₹{}", self.0.unsigned_abs())
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses a whole-rupee amount.
    ///
    /// Accepts an optional leading `₹`, `+` or `-` and `,` digit grouping.
    /// Fractions are rejected: amounts are whole rupees.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::InvalidAmount(format!("invalid amount: {}", s.trim()));

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(EngineError::InvalidAmount("empty amount".to_string()));
        }

        let (negative, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (true, stripped)
        } else if let Some(stripped) = trimmed.strip_prefix('+') {
            (false, stripped)
        } else {
            (false, trimmed)
        };
        let digits: String = rest
            .trim()
            .trim_start_matches('₹')
            .chars()
            .filter(|c| *c != ',')
            .collect();

        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let value: i64 = digits
            .parse()
            .map_err(|_| EngineError::InvalidAmount("amount too large".to_string()))?;
        Ok(Money(if negative { -value } else { value }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_inr() {
        assert_eq!(Money::new(0).to_string(), "₹0");
        assert_eq!(Money::new(2100).to_string(), "₹2100");
        assert_eq!(Money::new(-75).to_string(), "-₹75");
    }

    #[test]
    fn parse_accepts_grouping_and_symbol() {
        assert_eq!("2100".parse::<Money>().unwrap(), Money::new(2100));
        assert_eq!("₹1,200".parse::<Money>().unwrap(), Money::new(1200));
        assert_eq!(" -50 ".parse::<Money>().unwrap(), Money::new(-50));
    }

    #[test]
    fn parse_rejects_fractions_and_garbage() {
        assert!("12.5".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
        assert!("".parse::<Money>().is_err());
    }

    #[test]
    fn blank_fields_default_to_zero() {
        assert_eq!(Money::parse_or_zero(None).unwrap(), Money::ZERO);
        assert_eq!(Money::parse_or_zero(Some("   ")).unwrap(), Money::ZERO);
        assert_eq!(Money::parse_or_zero(Some("350")).unwrap(), Money::new(350));
    }

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(Money::new(10_000).percent_of(75).unwrap(), Money::new(7_500));
        assert_eq!(Money::new(2_100).percent_of(15).unwrap(), Money::new(315));
        assert_eq!(Money::new(999).percent_of(75).unwrap(), Money::new(749));
        assert_eq!(Money::new(1).percent_of(50).unwrap(), Money::new(1));
    }
}
