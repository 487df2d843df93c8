//! Typed money amounts.
//!
//! Amounts arrive as free text typed by traders (`"+$123.45"`, `"-30"`,
//! `"1,250.5 USD"`). They are parsed once at the edge into [`Money`] and
//! stored as plain decimal text.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};
use std::str::FromStr;

use crate::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    pub fn from_f64(value: f64) -> Self {
        Decimal::from_f64_retain(value)
            .map(|d| Money(d.round_dp(8)))
            .unwrap_or_default()
    }

    /// Lenient parse: drop every character outside `[0-9.-]`, then read the
    /// longest numeric prefix. Anything unreadable is zero.
    pub fn parse_lenient(raw: &str) -> Self {
        let cleaned: String = raw
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
            .collect();
        Money::parse_prefix(&cleaned).unwrap_or_default()
    }

    /// Longest numeric prefix (`"1.5x"` is 1.5), `None` when there is no
    /// leading number at all.
    pub fn parse_prefix(raw: &str) -> Option<Self> {
        let raw = raw.trim_start();
        let mut end = 0;
        let mut seen_digit = false;
        let mut seen_dot = false;
        for (i, c) in raw.char_indices() {
            match c {
                '-' | '+' if i == 0 => {}
                '0'..='9' => seen_digit = true,
                '.' if !seen_dot => seen_dot = true,
                _ => break,
            }
            end = i + 1;
        }
        if !seen_digit {
            return None;
        }

        let mut number = raw[..end].trim_start_matches('+').to_string();
        if number.ends_with('.') {
            number.pop();
        }
        if number.starts_with("-.") {
            number.replace_range(..2, "-0.");
        } else if number.starts_with('.') {
            number.insert(0, '0');
        }
        Decimal::from_str(&number).ok().map(Money)
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }

    pub fn abs(&self) -> Money {
        Money(self.0.abs())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Rounded to cents, halves away from zero.
    pub fn rounded(&self) -> Money {
        Money(self.0.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Canonical text form used in storage columns.
    pub fn to_storage(&self) -> String {
        format!("{:.2}", self.rounded().0)
    }

    /// `+$50.00`, `-$30.00`, `$0.00`
    pub fn signed_display(&self) -> String {
        let sign = if self.is_positive() {
            "+"
        } else if self.is_negative() {
            "-"
        } else {
            ""
        };
        format!("{}${:.2}", sign, self.rounded().0.abs())
    }
}

/// Strict parse for form input: currency symbols, thousands separators,
/// spaces and a leading `+` are accepted, anything else is an error.
impl FromStr for Money {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '$' | '€' | ',' | ' '))
            .collect();
        let cleaned = cleaned.strip_prefix('+').unwrap_or(&cleaned);
        Decimal::from_str(cleaned)
            .map(Money)
            .map_err(|_| DomainError::InvalidAmount(s.to_string()))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.rounded().0)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.rounded().to_f64())
    }
}

/// Accepts JSON numbers and plain decimal strings.
impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <Decimal as Deserialize>::deserialize(deserializer).map(Money)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
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

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + *m)
    }
}
