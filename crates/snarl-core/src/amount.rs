//! Fixed-point transfer amounts.
//!
//! Amounts arrive from untrusted submitters as decimal strings and feed
//! directly into duplicate-detection digests, so they must round-trip
//! bit-exactly. [`Amount`] stores a `u128` mantissa with twelve fractional
//! digits and performs integer arithmetic only; no binary floats touch the
//! canonical representation.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AmountError;

/// Fractional digits carried by an [`Amount`].
pub const AMOUNT_SCALE: u32 = 12;

/// Mantissa value of one whole unit (`10^12`).
pub const AMOUNT_PRECISION: u128 = 1_000_000_000_000;

/// Mantissa step of one micro-unit (`10^-6` units), the canonical-digest
/// rounding granularity.
const MICRO_STEP: u128 = AMOUNT_PRECISION / 1_000_000;

/// A non-negative fixed-point amount with twelve fractional digits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Self = Self(0);

    /// Construct from a raw mantissa (value × 10^12).
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Construct from whole units.
    pub const fn from_units(units: u64) -> Self {
        Self(units as u128 * AMOUNT_PRECISION)
    }

    /// Raw mantissa (value × 10^12).
    pub const fn raw(&self) -> u128 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition. Returns `None` on mantissa overflow.
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Round half-up to six fractional digits (micro-units), the precision
    /// at which the canonical digest collapses benign noise.
    ///
    /// Idempotent: rounding an already-rounded amount is a no-op.
    pub fn round_micros(self) -> Self {
        let rem = self.0 % MICRO_STEP;
        if rem == 0 {
            return self;
        }
        let floor = self.0 - rem;
        if rem * 2 >= MICRO_STEP {
            // Saturate to the floor on the (astronomical) overflow edge
            // rather than wrapping.
            Self(floor.checked_add(MICRO_STEP).unwrap_or(floor))
        } else {
            Self(floor)
        }
    }

    /// Number of significant fractional digits, after stripping trailing
    /// zeros. Zero for whole-unit amounts.
    pub fn fractional_digits(&self) -> u32 {
        let mut frac = self.0 % AMOUNT_PRECISION;
        if frac == 0 {
            return 0;
        }
        let mut digits = AMOUNT_SCALE;
        while frac % 10 == 0 {
            frac /= 10;
            digits -= 1;
        }
        digits
    }

    /// Lossy conversion for score computations. Never used in digests.
    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / AMOUNT_PRECISION as f64
    }

    /// Canonical minimal decimal rendering: no sign, no exponent, no
    /// trailing fractional zeros, `"0"` for zero.
    pub fn to_decimal_string(&self) -> String {
        let int = self.0 / AMOUNT_PRECISION;
        let frac = self.0 % AMOUNT_PRECISION;
        if frac == 0 {
            return int.to_string();
        }
        let mut frac_str = format!("{frac:012}");
        while frac_str.ends_with('0') {
            frac_str.pop();
        }
        format!("{int}.{frac_str}")
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    /// Parse a plain decimal string such as `"100"`, `"0.25"`, or
    /// `"1.000000000001"`. Signs, exponents, and more than twelve
    /// fractional digits are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || AmountError::Malformed(s.to_string());
        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(malformed());
        }
        if !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return Err(malformed());
        }
        if frac_part.len() > AMOUNT_SCALE as usize {
            return Err(AmountError::TooManyDecimals {
                got: frac_part.len(),
                max: AMOUNT_SCALE as usize,
            });
        }

        let int: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| AmountError::Overflow)?
        };
        let mut frac: u128 = if frac_part.is_empty() {
            0
        } else {
            frac_part.parse().map_err(|_| malformed())?
        };
        // Scale the fraction up to twelve digits.
        for _ in frac_part.len()..AMOUNT_SCALE as usize {
            frac *= 10;
        }

        int.checked_mul(AMOUNT_PRECISION)
            .and_then(|v| v.checked_add(frac))
            .map(Self)
            .ok_or(AmountError::Overflow)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_decimal_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // --- parsing ---

    #[test]
    fn parse_whole_units() {
        assert_eq!("100".parse::<Amount>().unwrap(), Amount::from_units(100));
        assert_eq!("0".parse::<Amount>().unwrap(), Amount::ZERO);
    }

    #[test]
    fn parse_fractional() {
        let a: Amount = "0.25".parse().unwrap();
        assert_eq!(a.raw(), AMOUNT_PRECISION / 4);
    }

    #[test]
    fn parse_full_precision() {
        let a: Amount = "1.000000000001".parse().unwrap();
        assert_eq!(a.raw(), AMOUNT_PRECISION + 1);
    }

    #[test]
    fn parse_bare_fraction() {
        let a: Amount = ".5".parse().unwrap();
        assert_eq!(a.raw(), AMOUNT_PRECISION / 2);
    }

    #[test]
    fn parse_rejects_garbage() {
        for bad in ["", ".", "abc", "1.2.3", "-1", "+1", "1e6", "1,000"] {
            assert!(bad.parse::<Amount>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn parse_rejects_excess_precision() {
        let err = "1.0000000000001".parse::<Amount>().unwrap_err();
        assert_eq!(err, AmountError::TooManyDecimals { got: 13, max: 12 });
    }

    #[test]
    fn parse_rejects_overflow() {
        let huge = "9".repeat(40);
        assert_eq!(huge.parse::<Amount>().unwrap_err(), AmountError::Overflow);
    }

    // --- rendering ---

    #[test]
    fn render_trims_trailing_zeros() {
        let a: Amount = "1.500000".parse().unwrap();
        assert_eq!(a.to_decimal_string(), "1.5");
    }

    #[test]
    fn render_zero() {
        assert_eq!(Amount::ZERO.to_decimal_string(), "0");
    }

    #[test]
    fn render_whole_has_no_point() {
        assert_eq!(Amount::from_units(42).to_decimal_string(), "42");
    }

    // --- rounding ---

    #[test]
    fn round_micros_half_up() {
        let down: Amount = "1.0000004".parse().unwrap();
        let up: Amount = "1.0000005".parse().unwrap();
        assert_eq!(down.round_micros().to_decimal_string(), "1");
        assert_eq!(up.round_micros().to_decimal_string(), "1.000001");
    }

    #[test]
    fn round_micros_idempotent() {
        let a: Amount = "3.14159265358".parse().unwrap();
        let once = a.round_micros();
        assert_eq!(once, once.round_micros());
    }

    #[test]
    fn round_micros_preserves_micro_precision() {
        let a: Amount = "0.000001".parse().unwrap();
        assert_eq!(a.round_micros(), a);
    }

    // --- fractional digits ---

    #[test]
    fn fractional_digits_counts_significant() {
        assert_eq!(Amount::from_units(7).fractional_digits(), 0);
        assert_eq!("1.5".parse::<Amount>().unwrap().fractional_digits(), 1);
        assert_eq!("1.50".parse::<Amount>().unwrap().fractional_digits(), 1);
        assert_eq!("0.123456".parse::<Amount>().unwrap().fractional_digits(), 6);
    }

    // --- arithmetic ---

    #[test]
    fn checked_add_sums() {
        let a = Amount::from_units(1);
        let b: Amount = "0.5".parse().unwrap();
        assert_eq!(a.checked_add(b).unwrap().to_decimal_string(), "1.5");
    }

    #[test]
    fn checked_add_overflow_is_none() {
        let max = Amount::from_raw(u128::MAX);
        assert!(max.checked_add(Amount::from_raw(1)).is_none());
    }

    // --- serde ---

    #[test]
    fn serde_round_trip_as_string() {
        let a: Amount = "12.000003".parse().unwrap();
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, "\"12.000003\"");
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }

    // --- proptest ---

    proptest! {
        #[test]
        fn parse_render_round_trip(raw in 0u128..u128::MAX / 2) {
            let a = Amount::from_raw(raw);
            let rendered = a.to_decimal_string();
            let parsed: Amount = rendered.parse().unwrap();
            prop_assert_eq!(parsed, a);
        }

        #[test]
        fn round_micros_within_half_step(raw in 0u128..u128::MAX / 2) {
            let a = Amount::from_raw(raw);
            let rounded = a.round_micros();
            let diff = rounded.raw().abs_diff(a.raw());
            prop_assert!(diff * 2 <= MICRO_STEP);
        }

        #[test]
        fn rounded_amounts_have_at_most_six_digits(raw in 0u128..u128::MAX / 2) {
            let rounded = Amount::from_raw(raw).round_micros();
            prop_assert!(rounded.fractional_digits() <= 6);
        }
    }
}
