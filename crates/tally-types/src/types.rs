use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{TallyError, TallyResult};

/// Largest integer an IEEE double represents exactly
const MAX_EXACT_F64_INTEGER: f64 = 9_007_199_254_740_992.0;

/// An amount of money in minor currency units
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cents(i64);

impl Cents {
    /// Zero cents
    pub const ZERO: Self = Self(0);

    /// Wrap a raw amount of cents
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// The raw amount of cents
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Whether the amount is strictly positive
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl From<i64> for Cents {
    fn from(cents: i64) -> Self {
        Self(cents)
    }
}

impl From<Cents> for i64 {
    fn from(cents: Cents) -> Self {
        cents.0
    }
}

impl fmt::Display for Cents {
    /// Renders major units with two decimals, e.g. `1234` as `12.34`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

/// A strictly positive integer weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Weight(u64);

impl Weight {
    /// Validate a signed integer as a weight
    ///
    /// # Errors
    /// Returns [`TallyError::InvalidInput`] when `value` is zero or negative.
    pub fn new(value: i64) -> TallyResult<Self> {
        if value <= 0 {
            return Err(TallyError::invalid_field(
                "weight",
                format!("weight must be a positive integer, got {value}"),
            ));
        }
        Ok(Self(value.unsigned_abs()))
    }

    /// Validate an untyped JSON value as a weight
    ///
    /// Whole-valued floats such as `3.0` are accepted, fractional values are not.
    ///
    /// # Errors
    /// Returns [`TallyError::InvalidInput`] for non-numbers, fractions, zero and negatives.
    pub fn from_json(value: &Value) -> TallyResult<Self> {
        let Value::Number(number) = value else {
            return Err(TallyError::invalid_field(
                "weight",
                format!("weight must be an integer, got {value}"),
            ));
        };

        if let Some(i) = number.as_i64() {
            return Self::new(i);
        }
        if let Some(u) = number.as_u64() {
            return Ok(Self(u));
        }

        match number.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() <= MAX_EXACT_F64_INTEGER => {
                #[allow(clippy::cast_possible_truncation)]
                let whole = f as i64;
                Self::new(whole)
            }
            _ => Err(TallyError::invalid_field(
                "weight",
                format!("weight must be an integer, got {number}"),
            )),
        }
    }

    /// The raw weight
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl TryFrom<i64> for Weight {
    type Error = TallyError;

    fn try_from(value: i64) -> TallyResult<Self> {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for Weight {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(&value).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one entry in a split
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SplitKey(String);

impl SplitKey {
    /// Build a key from an arbitrary identifier, trimming surrounding whitespace
    ///
    /// # Errors
    /// Returns [`TallyError::InvalidInput`] when nothing is left after trimming.
    pub fn new(raw: &str) -> TallyResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TallyError::invalid_field("key", "key must not be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Build a key from a SKU
    ///
    /// SKUs are compared case-insensitively and with runs of inner whitespace
    /// treated as a single `-`, so `" ab  12 "` and `"AB-12"` collide.
    ///
    /// # Errors
    /// Returns [`TallyError::InvalidInput`] when the SKU is blank.
    pub fn sku(raw: &str) -> TallyResult<Self> {
        let normalized = raw.split_whitespace().collect::<Vec<_>>().join("-").to_uppercase();
        if normalized.is_empty() {
            return Err(TallyError::invalid_field("sku", "sku must not be empty"));
        }
        Ok(Self(normalized))
    }

    /// The key as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SplitKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SplitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
