use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of micro-units in one token.
pub const SCALE: i64 = 1_000_000;

/// Number of fractional digits in the canonical text form.
pub const DECIMALS: usize = 6;

/// Token amounts are held as integer micro-units to avoid floating-point drift.
/// 1 token = 1_000_000 micro-units, so "12.500000" = 12_500_000.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    pub const fn micros(self) -> i64 {
        self.0
    }

    /// Whole tokens, e.g. `Amount::from_tokens(3)` is "3.000000".
    pub fn from_tokens(tokens: i64) -> Option<Self> {
        tokens.checked_mul(SCALE).map(Self)
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Fixed-point product, rounded half-to-even at the sixth decimal.
    pub fn checked_mul(self, other: Amount) -> Option<Amount> {
        let product = i128::from(self.0) * i128::from(other.0);
        narrow(div_round_half_even(product, i128::from(SCALE)))
    }

    /// Fixed-point quotient, rounded half-to-even at the sixth decimal.
    /// Returns `None` on division by zero or overflow.
    pub fn checked_div(self, other: Amount) -> Option<Amount> {
        if other.0 == 0 {
            return None;
        }
        let numerator = i128::from(self.0) * i128::from(SCALE);
        narrow(div_round_half_even(numerator, i128::from(other.0)))
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    /// Convert a wire number back to micro-units, rounding to the nearest one.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let scaled = (value * SCALE as f64).round();
        if scaled < i64::MIN as f64 || scaled >= i64::MAX as f64 {
            return None;
        }
        Some(Self(scaled as i64))
    }
}

fn narrow(value: i128) -> Option<Amount> {
    i64::try_from(value).ok().map(Amount)
}

fn div_round_half_even(numerator: i128, denominator: i128) -> i128 {
    let negative = (numerator < 0) != (denominator < 0);
    let n = numerator.abs();
    let d = denominator.abs();
    let mut quotient = n / d;
    let twice_rem = (n % d) * 2;
    if twice_rem > d || (twice_rem == d && quotient % 2 == 1) {
        quotient += 1;
    }
    if negative { -quotient } else { quotient }
}

/// Format an amount in canonical 6-decimal form.
/// Example: 1_500_000 -> "1.500000", -1 -> "-0.000001"
pub fn format_amount(amount: Amount) -> String {
    amount.to_string()
}

/// Parse a decimal string into an amount.
/// Example: "1.5" -> 1_500_000, "12.000000" -> 12_000_000, "-2" -> -2_000_000,
/// "1e2" -> 100_000_000
///
/// Digits past the sixth decimal are rounded half-to-even. A decimal exponent
/// is applied before rounding. Non-finite spellings are rejected.
pub fn parse_amount(input: &str) -> Result<Amount, ParseAmountError> {
    let input = input.trim();
    let (negative, digits) = match input.as_bytes().first() {
        None => return Err(ParseAmountError::Empty),
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        Some(_) => (false, input),
    };

    let (mantissa, exponent) = match digits.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => (mantissa, parse_exponent(exponent)?),
        None => (digits, 0),
    };

    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(ParseAmountError::InvalidFormat);
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(ParseAmountError::InvalidFormat);
    }

    let total = if exponent == 0 {
        scale_digits(whole, fraction)?
    } else {
        let (whole, fraction) = shift_point(whole, fraction, exponent)?;
        scale_digits(&whole, &fraction)?
    };

    let signed = if negative { -total } else { total };
    i64::try_from(signed)
        .map(Amount)
        .map_err(|_| ParseAmountError::Overflow)
}

fn parse_exponent(text: &str) -> Result<i64, ParseAmountError> {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseAmountError::InvalidFormat);
    }
    text.parse().map_err(|_| ParseAmountError::Overflow)
}

/// Move the decimal point of `whole.fraction` by `exponent` places.
fn shift_point(
    whole: &str,
    fraction: &str,
    exponent: i64,
) -> Result<(String, String), ParseAmountError> {
    let digits = format!("{}{}", whole, fraction);
    let significant = digits.trim_start_matches('0');
    if significant.is_empty() {
        return Ok((String::new(), String::new()));
    }

    // Position of the point relative to the first significant digit
    let leading_zeros = (digits.len() - significant.len()) as i64;
    let point = (whole.len() as i64 - leading_zeros).saturating_add(exponent);

    // Every value below 10^-7 rounds to zero
    if point < -(DECIMALS as i64) - 1 {
        return Ok((String::new(), String::new()));
    }
    // i64 micro-units hold at most 13 whole-token digits
    if point > 20 {
        return Err(ParseAmountError::Overflow);
    }

    let len = significant.len() as i64;
    Ok(if point <= 0 {
        let zeros = "0".repeat(point.unsigned_abs() as usize);
        (String::new(), format!("{}{}", zeros, significant))
    } else if point >= len {
        let zeros = "0".repeat((point - len) as usize);
        (format!("{}{}", significant, zeros), String::new())
    } else {
        let (whole, fraction) = significant.split_at(point as usize);
        (whole.to_string(), fraction.to_string())
    })
}

/// Micro-units of validated `whole.fraction` digits, rounding half-to-even.
fn scale_digits(whole: &str, fraction: &str) -> Result<i128, ParseAmountError> {
    let units: i128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| ParseAmountError::Overflow)?
    };

    let kept_len = fraction.len().min(DECIMALS);
    let (kept, rest) = fraction.split_at(kept_len);
    let mut fractional: i128 = if kept.is_empty() {
        0
    } else {
        kept.parse().map_err(|_| ParseAmountError::InvalidFormat)?
    };
    fractional *= 10_i128.pow((DECIMALS - kept_len) as u32);

    let mut total = units
        .checked_mul(i128::from(SCALE))
        .and_then(|v| v.checked_add(fractional))
        .ok_or(ParseAmountError::Overflow)?;

    if let Some(first) = rest.bytes().next() {
        let tail_nonzero = rest.bytes().skip(1).any(|b| b != b'0');
        let round_up = match first {
            b'6'..=b'9' => true,
            b'5' => tail_nonzero || total % 2 == 1,
            _ => false,
        };
        if round_up {
            total += 1;
        }
    }

    Ok(total)
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = SCALE as u64;
        write!(f, "{}{}.{:06}", sign, abs / scale, abs % scale)
    }
}

impl FromStr for Amount {
    type Err = ParseAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_amount(s)
    }
}

// Payload fields carry amounts as plain JSON numbers. An f64 holds every
// micro-unit exactly only up to 2^53 micro-units (about 9 * 10^9 tokens);
// larger balances come back rounded to a neighbouring representable value.
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Amount::from_f64(value)
            .ok_or_else(|| serde::de::Error::custom(format!("amount out of range: {}", value)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    Empty,
    InvalidFormat,
    Overflow,
}

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAmountError::Empty => write!(f, "empty amount"),
            ParseAmountError::InvalidFormat => write!(f, "invalid amount format"),
            ParseAmountError::Overflow => write!(f, "amount out of range"),
        }
    }
}

impl std::error::Error for ParseAmountError {}
