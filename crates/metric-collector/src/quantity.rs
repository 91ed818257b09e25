//! Exact fixed-point quantity used for every collected metric value
//!
//! Values are held as a signed count of milli-units, so comparisons against
//! scaling thresholds never go through floating point. Digits finer than a
//! milli-unit round toward positive infinity.

use crate::error::{CollectorError, Result};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const MILLI: i128 = 1000;

const BINARY_SUFFIXES: [(&str, u32); 6] = [
    ("Ki", 1),
    ("Mi", 2),
    ("Gi", 3),
    ("Ti", 4),
    ("Pi", 5),
    ("Ei", 6),
];

const DECIMAL_SUFFIXES: [(&str, i32); 7] = [
    ("m", -3),
    ("k", 3),
    ("M", 6),
    ("G", 9),
    ("T", 12),
    ("P", 15),
    ("E", 18),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Quantity {
    milli: i128,
}

impl Quantity {
    pub const ZERO: Quantity = Quantity { milli: 0 };

    pub fn from_int(value: i64) -> Self {
        Self {
            milli: i128::from(value) * MILLI,
        }
    }

    pub fn from_milli(milli: i128) -> Self {
        Self { milli }
    }

    /// Exact value in milli-units
    pub fn milli_value(&self) -> i128 {
        self.milli
    }

    /// Integer value, rounded up when a fractional part is present
    pub fn value(&self) -> i128 {
        let whole = self.milli.div_euclid(MILLI);
        if self.milli.rem_euclid(MILLI) != 0 {
            whole + 1
        } else {
            whole
        }
    }

    pub fn checked_add(self, other: Quantity) -> Option<Quantity> {
        self.milli.checked_add(other.milli).map(Quantity::from_milli)
    }

    /// Divide by a sample count, rounding toward negative infinity
    pub fn checked_div_floor(self, divisor: usize) -> Option<Quantity> {
        let divisor = i128::try_from(divisor).ok().filter(|d| *d > 0)?;
        Some(Quantity::from_milli(self.milli.div_euclid(divisor)))
    }

    /// Convert a decoded JSON number without passing through `f64`
    pub fn from_json_number(number: &serde_json::Number) -> Result<Self> {
        if let Some(v) = number.as_i64() {
            return Ok(Quantity::from_int(v));
        }
        if let Some(v) = number.as_u64() {
            return Ok(Quantity::from_milli(i128::from(v) * MILLI));
        }
        number.to_string().parse()
    }
}

impl FromStr for Quantity {
    type Err = CollectorError;

    fn from_str(input: &str) -> Result<Self> {
        parse_quantity(input).ok_or_else(|| CollectorError::InvalidQuantity {
            input: input.to_string(),
        })
    }
}

fn parse_quantity(input: &str) -> Option<Quantity> {
    let s = input.trim();
    let (negative, s) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };

    let number_len = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, rest) = s.split_at(number_len);

    let (int_part, frac_part) = match number.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (number, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if frac_part.contains('.') {
        return None;
    }

    let mut mantissa: i128 = 0;
    for digit in int_part.bytes().chain(frac_part.bytes()) {
        mantissa = mantissa
            .checked_mul(10)?
            .checked_add(i128::from(digit - b'0'))?;
    }

    let (exp10, binary_power) = parse_suffix(rest)?;
    for _ in 0..binary_power {
        mantissa = mantissa.checked_mul(1024)?;
    }

    let frac_len = i32::try_from(frac_part.len()).ok()?;
    let scale = exp10.checked_add(3)?.checked_sub(frac_len)?;

    let magnitude = if scale >= 0 {
        mantissa.checked_mul(10_i128.checked_pow(scale as u32)?)?
    } else {
        match 10_i128.checked_pow(scale.unsigned_abs()) {
            Some(divisor) => {
                let whole = mantissa / divisor;
                let exact = mantissa % divisor == 0;
                if negative || exact {
                    whole
                } else {
                    whole + 1
                }
            }
            // Below a milli-unit no matter the mantissa
            None if mantissa == 0 || negative => 0,
            None => 1,
        }
    };

    Some(Quantity::from_milli(if negative {
        -magnitude
    } else {
        magnitude
    }))
}

/// Returns (decimal exponent, binary power) for the text after the digits
fn parse_suffix(rest: &str) -> Option<(i32, u32)> {
    if rest.is_empty() {
        return Some((0, 0));
    }

    if let Some(exponent) = rest.strip_prefix(['e', 'E']) {
        if !exponent.is_empty() {
            let digits = exponent.trim_start_matches(['+', '-']);
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                return exponent.parse::<i32>().ok().map(|e| (e, 0));
            }
        }
    }

    if let Some((_, power)) = BINARY_SUFFIXES.iter().find(|(s, _)| *s == rest) {
        return Some((0, *power));
    }
    DECIMAL_SUFFIXES
        .iter()
        .find(|(s, _)| *s == rest)
        .map(|(_, exp)| (*exp, 0))
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.milli % MILLI == 0 {
            write!(f, "{}", self.milli / MILLI)
        } else {
            write!(f, "{}m", self.milli)
        }
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
