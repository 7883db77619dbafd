//! Sampled scalars: a fixed number or a uniform random range.
//!
//! Every property in a script (`volume`, `every`, `fade_in`, ...) is written
//! either as a single number or as `min..max`. A [`RangeOrValue`] keeps that
//! shape and draws a fresh value each time it is sampled.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::Serialize;

/// The token separating the two bounds of a range.
pub const RANGE_DELIMITER: &str = "..";

/// Error returned when a value cannot be parsed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueError {
    #[error("invalid number '{0}'")]
    Number(String),
    #[error("range '{0}' is too wide")]
    TooWide(String),
}

/// A fixed value, an inclusive `[min, max]` range, or nothing at all.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum RangeOrValue {
    #[default]
    Unset,
    Fixed(f64),
    Range(f64, f64),
}

impl RangeOrValue {
    /// Build a range, swapping the bounds if they arrive reversed.
    pub fn range(a: f64, b: f64) -> Self {
        if a <= b {
            Self::Range(a, b)
        } else {
            Self::Range(b, a)
        }
    }

    /// Parse `"3"`, `"-0.5"`, `"3..5"` or `"3 .. 5"`.
    ///
    /// Blank input yields [`RangeOrValue::Unset`]. Anything else that is not
    /// a number is an error.
    pub fn parse(text: &str) -> Result<Self, ValueError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Self::Unset);
        }
        match text.split_once(RANGE_DELIMITER) {
            Some((lo, hi)) => {
                let (lo, hi) = (parse_number(lo)?, parse_number(hi)?);
                if !(hi - lo).is_finite() {
                    return Err(ValueError::TooWide(text.to_string()));
                }
                Ok(Self::range(lo, hi))
            }
            None => Ok(Self::Fixed(parse_number(text)?)),
        }
    }

    /// Draw a value: uniform for ranges, the value itself when fixed, 0 when unset.
    ///
    /// A range too wide to measure yields its lower bound.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            Self::Unset => 0.0,
            Self::Fixed(v) => v,
            Self::Range(min, max) if min == max || !(max - min).is_finite() => min,
            Self::Range(min, max) => rng.gen_range(min..=max),
        }
    }

    /// Like [`sample`](Self::sample), but unset values produce `default`.
    pub fn sample_or<R: Rng + ?Sized>(&self, rng: &mut R, default: f64) -> f64 {
        if self.is_set() {
            self.sample(rng)
        } else {
            default
        }
    }

    /// Both bounds multiplied by `k`. Unset stays unset.
    pub fn scaled_by(&self, k: f64) -> Self {
        match *self {
            Self::Unset => Self::Unset,
            Self::Fixed(v) => Self::Fixed(v * k),
            Self::Range(min, max) => Self::range(min * k, max * k),
        }
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, Self::Unset)
    }

    /// Return `self` if set, otherwise `other`.
    pub fn or(self, other: Self) -> Self {
        if self.is_set() {
            self
        } else {
            other
        }
    }
}

impl FromStr for RangeOrValue {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<f64> for RangeOrValue {
    fn from(v: f64) -> Self {
        Self::Fixed(v)
    }
}

impl fmt::Display for RangeOrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => write!(f, "unset"),
            Self::Fixed(v) => write!(f, "{v}"),
            Self::Range(min, max) => write!(f, "{min}{RANGE_DELIMITER}{max}"),
        }
    }
}

fn parse_number(text: &str) -> Result<f64, ValueError> {
    let text = text.trim();
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ValueError::Number(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn parse_single_number() {
        assert_eq!(RangeOrValue::parse("3").unwrap(), RangeOrValue::Fixed(3.0));
        assert_eq!(
            RangeOrValue::parse(" -0.25 ").unwrap(),
            RangeOrValue::Fixed(-0.25)
        );
    }

    #[test]
    fn parse_range() {
        assert_eq!(
            RangeOrValue::parse("3..5").unwrap(),
            RangeOrValue::Range(3.0, 5.0)
        );
        assert_eq!(
            RangeOrValue::parse("-5 .. -2").unwrap(),
            RangeOrValue::Range(-5.0, -2.0)
        );
        assert_eq!(
            RangeOrValue::parse("0.5..1.5").unwrap(),
            RangeOrValue::Range(0.5, 1.5)
        );
    }

    #[test]
    fn reversed_range_is_normalised() {
        assert_eq!(
            RangeOrValue::parse("5..3").unwrap(),
            RangeOrValue::Range(3.0, 5.0)
        );
    }

    #[test]
    fn blank_is_unset() {
        assert_eq!(RangeOrValue::parse("").unwrap(), RangeOrValue::Unset);
        assert_eq!(RangeOrValue::parse("   ").unwrap(), RangeOrValue::Unset);
    }

    #[test]
    fn malformed_is_error() {
        assert!(RangeOrValue::parse("loud").is_err());
        assert!(RangeOrValue::parse("1..").is_err());
        assert!(RangeOrValue::parse("..2").is_err());
        assert!(RangeOrValue::parse("1..x").is_err());
        assert!(RangeOrValue::parse("inf").is_err());
    }

    #[test]
    fn range_wider_than_f64_is_error() {
        let err = RangeOrValue::parse("-1e308..1e308").unwrap_err();
        assert_eq!(err.to_string(), "range '-1e308..1e308' is too wide");
        assert!(RangeOrValue::parse("-1e307..1e307").is_ok());
    }

    #[test]
    fn overflowing_range_samples_lower_bound() {
        let mut rng = rng();
        let wide = RangeOrValue::Range(-1e308, 1e308);
        assert_eq!(wide.sample(&mut rng), -1e308);
        let scaled = RangeOrValue::Range(1e300, 2e300).scaled_by(1e10);
        assert_eq!(scaled.sample(&mut rng), f64::INFINITY);
    }

    #[test]
    fn fixed_always_samples_itself() {
        let mut rng = rng();
        for v in [0.0, 1.0, -3.5, 1234.5678] {
            let value = RangeOrValue::Fixed(v);
            for _ in 0..100 {
                assert_eq!(value.sample(&mut rng), v);
            }
        }
    }

    #[test]
    fn unset_samples_zero() {
        let mut rng = rng();
        assert_eq!(RangeOrValue::Unset.sample(&mut rng), 0.0);
        assert_eq!(RangeOrValue::Unset.sample_or(&mut rng, 1.0), 1.0);
    }

    #[test]
    fn range_samples_stay_in_bounds_and_average_to_midpoint() {
        let mut rng = rng();
        let value = RangeOrValue::Range(2.0, 6.0);
        let n = 10_000;
        let mut sum = 0.0;
        for _ in 0..n {
            let s = value.sample(&mut rng);
            assert!((2.0..=6.0).contains(&s), "sample {s} out of range");
            sum += s;
        }
        assert_approx_eq!(sum / n as f64, 4.0, 0.05);
    }

    #[test]
    fn samples_are_drawn_fresh() {
        let mut rng = rng();
        let value = RangeOrValue::Range(0.0, 1.0);
        let a = value.sample(&mut rng);
        let b = value.sample(&mut rng);
        assert_ne!(a, b);
    }

    #[test]
    fn or_prefers_a_set_value() {
        let fallback = RangeOrValue::Range(1.0, 2.0);
        assert_eq!(RangeOrValue::Fixed(3.0).or(fallback), RangeOrValue::Fixed(3.0));
        assert_eq!(RangeOrValue::Unset.or(fallback), fallback);
        assert_eq!(RangeOrValue::Unset.or(RangeOrValue::Unset), RangeOrValue::Unset);
    }

    #[test]
    fn scaled_by_scales_bounds() {
        assert_eq!(
            RangeOrValue::Range(1.0, 3.0).scaled_by(0.5),
            RangeOrValue::Range(0.5, 1.5)
        );
        assert_eq!(
            RangeOrValue::Fixed(0.4).scaled_by(0.5),
            RangeOrValue::Fixed(0.2)
        );
        assert_eq!(RangeOrValue::Unset.scaled_by(2.0), RangeOrValue::Unset);
        // Negative factors keep min <= max.
        assert_eq!(
            RangeOrValue::Range(1.0, 3.0).scaled_by(-1.0),
            RangeOrValue::Range(-3.0, -1.0)
        );
    }

    #[test]
    fn scaled_distribution_matches_scaled_samples() {
        let mut rng = rng();
        let base = RangeOrValue::Range(1.0, 2.0);
        let scaled = base.scaled_by(3.0);
        let n = 10_000;
        let mean_scaled: f64 = (0..n).map(|_| scaled.sample(&mut rng)).sum::<f64>() / n as f64;
        let mean_base: f64 = (0..n).map(|_| 3.0 * base.sample(&mut rng)).sum::<f64>() / n as f64;
        assert_approx_eq!(mean_scaled, mean_base, 0.05);
        for _ in 0..1000 {
            let s = scaled.sample(&mut rng);
            assert!((3.0..=6.0).contains(&s));
        }
    }

    #[test]
    fn display_round_trips() {
        for text in ["3", "0.5..1.5", "-2..4"] {
            let value: RangeOrValue = text.parse().unwrap();
            assert_eq!(value.to_string(), text);
        }
    }
}
