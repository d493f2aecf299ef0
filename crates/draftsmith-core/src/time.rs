//! Time representation for draft documents.
//!
//! All times are integer microseconds, the unit the external project format
//! stores. Parsing human strings uses integer arithmetic only, so `"1.5s"`
//! is exactly 1_500_000 and never drifts through a float.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Sub};
use std::str::FromStr;

use crate::error::{DraftError, Result};

/// A time value or duration in microseconds.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Micros(pub i64);

const MINUTE: i64 = 60 * Micros::SEC.0;
const HOUR: i64 = 60 * MINUTE;

impl Micros {
    pub const ZERO: Self = Self(0);
    pub const MS: Self = Self(1_000);
    pub const SEC: Self = Self(1_000_000);

    /// Whole seconds.
    #[inline]
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs * Self::SEC.0)
    }

    /// Whole milliseconds.
    #[inline]
    pub const fn from_millis(ms: i64) -> Self {
        Self(ms * Self::MS.0)
    }

    /// A raw count of microseconds. Negative counts are rejected.
    pub fn from_count(count: i64) -> Result<Self> {
        if count < 0 {
            return Err(DraftError::invalid_time(
                count.to_string(),
                "negative durations are not allowed",
            ));
        }
        Ok(Self(count))
    }

    /// Time of the first microsecond of `frames` at `rate` (floored,
    /// saturating at the ends of the range).
    pub fn from_frames(frames: i64, rate: FrameRate) -> Self {
        let us = frames as i128 * Self::SEC.0 as i128 * rate.denominator() as i128
            / rate.numerator() as i128;
        Self(us.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }

    /// Frame index containing this time at `rate` (floored).
    pub fn to_frames(self, rate: FrameRate) -> i64 {
        let frames = self.0 as i128 * rate.numerator() as i128
            / (Self::SEC.0 as i128 * rate.denominator() as i128);
        frames as i64
    }

    /// Seconds as f64, for display only.
    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / Self::SEC.0 as f64
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Parse a raw integer count (`"5000000"`) or a compound human string
    /// (`"1m30s"`, `"1.5s"`, `"250ms"`, `"1h 2m 3.5s"`).
    ///
    /// Units: `h`, `m`, `s`, `ms`, `us`. Each unit may appear once.
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim();
        if s.is_empty() {
            return Err(DraftError::invalid_time(input, "empty input"));
        }
        if s.starts_with('-') {
            return Err(DraftError::invalid_time(
                input,
                "negative durations are not allowed",
            ));
        }
        if s.bytes().all(|b| b.is_ascii_digit()) {
            return s
                .parse::<i64>()
                .map(Self)
                .map_err(|_| DraftError::invalid_time(input, "integer out of range"));
        }

        let mut total: i64 = 0;
        let mut seen = [false; 5];
        let mut rest = s;
        while !rest.is_empty() {
            let num_len = rest
                .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                .unwrap_or(rest.len());
            if num_len == 0 {
                return Err(DraftError::invalid_time(input, "expected a number"));
            }
            let (number, tail) = rest.split_at(num_len);
            let unit_len = tail
                .find(|c: char| !c.is_ascii_alphabetic())
                .unwrap_or(tail.len());
            if unit_len == 0 {
                return Err(DraftError::invalid_time(
                    input,
                    format!("missing unit after '{number}'"),
                ));
            }
            let (unit, tail) = tail.split_at(unit_len);
            let (slot, scale) = match unit.to_ascii_lowercase().as_str() {
                "h" => (0, HOUR),
                "m" => (1, MINUTE),
                "s" => (2, Self::SEC.0),
                "ms" => (3, Self::MS.0),
                "us" => (4, 1),
                other => {
                    return Err(DraftError::invalid_time(
                        input,
                        format!("unknown unit '{other}'"),
                    ))
                }
            };
            if std::mem::replace(&mut seen[slot], true) {
                return Err(DraftError::invalid_time(
                    input,
                    format!("unit '{unit}' given twice"),
                ));
            }
            let part = decimal_to_micros(input, number, scale)?;
            total = total
                .checked_add(part)
                .ok_or_else(|| DraftError::invalid_time(input, "value out of range"))?;
            rest = tail.trim_start();
        }
        Ok(Self(total))
    }

    /// Canonical human form, e.g. `"1m30s"`, `"1.5s"`, `"0s"`.
    pub fn format(self) -> String {
        if self.0 == 0 {
            return "0s".to_string();
        }
        let mut out = String::new();
        if self.0 < 0 {
            out.push('-');
        }
        let mut rest = self.0.unsigned_abs();
        let hours = rest / HOUR as u64;
        rest %= HOUR as u64;
        let minutes = rest / MINUTE as u64;
        rest %= MINUTE as u64;
        let secs = rest / Self::SEC.0 as u64;
        let frac = rest % Self::SEC.0 as u64;

        if hours > 0 {
            out.push_str(&format!("{hours}h"));
        }
        if minutes > 0 {
            out.push_str(&format!("{minutes}m"));
        }
        if secs > 0 || frac > 0 {
            if frac == 0 {
                out.push_str(&format!("{secs}s"));
            } else {
                let digits = format!("{frac:06}");
                out.push_str(&format!("{secs}.{}s", digits.trim_end_matches('0')));
            }
        }
        out
    }
}

/// Convert `"12"` or `"1.25"` times `scale` microseconds, exactly.
fn decimal_to_micros(input: &str, number: &str, scale: i64) -> Result<i64> {
    let (whole, frac) = match number.split_once('.') {
        Some((w, f)) => (w, f),
        None => (number, ""),
    };
    if whole.is_empty() || (number.contains('.') && frac.is_empty()) || frac.contains('.') {
        return Err(DraftError::invalid_time(
            input,
            format!("malformed number '{number}'"),
        ));
    }
    if frac.len() > 18 {
        return Err(DraftError::invalid_time(input, "too many decimal places"));
    }
    let out_of_range = || DraftError::invalid_time(input, "value out of range");
    let whole: i128 = whole.parse().map_err(|_| out_of_range())?;
    let mut value = whole.checked_mul(scale as i128).ok_or_else(out_of_range)?;
    if !frac.is_empty() {
        let digits: i128 = frac
            .parse()
            .map_err(|_| DraftError::invalid_time(input, "malformed fraction"))?;
        let denom = 10i128.pow(frac.len() as u32);
        let scaled = digits.checked_mul(scale as i128).ok_or_else(out_of_range)?;
        if scaled % denom != 0 {
            return Err(DraftError::invalid_time(
                input,
                "precision finer than one microsecond",
            ));
        }
        value = value.checked_add(scaled / denom).ok_or_else(out_of_range)?;
    }
    i64::try_from(value).map_err(|_| out_of_range())
}

impl FromStr for Micros {
    type Err = DraftError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Micros {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

impl Add for Micros {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Micros {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Micros {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul<i64> for Micros {
    type Output = Self;
    fn mul(self, rhs: i64) -> Self {
        Self(self.0 * rhs)
    }
}

impl Div<i64> for Micros {
    type Output = Self;
    fn div(self, rhs: i64) -> Self {
        Self(self.0 / rhs)
    }
}

/// Frame rate as a rational number (e.g., 30000/1001 for 29.97 fps).
/// Both parts are always non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawFrameRate")]
pub struct FrameRate {
    numerator: u32,
    denominator: u32,
}

#[derive(Deserialize)]
struct RawFrameRate {
    numerator: u32,
    denominator: u32,
}

impl TryFrom<RawFrameRate> for FrameRate {
    type Error = DraftError;

    fn try_from(raw: RawFrameRate) -> Result<Self> {
        Self::new(raw.numerator, raw.denominator)
    }
}

impl FrameRate {
    /// Rate of `numerator / denominator` frames per second. Zero in either
    /// part is rejected.
    pub fn new(numerator: u32, denominator: u32) -> Result<Self> {
        if numerator == 0 || denominator == 0 {
            return Err(DraftError::InvalidTimeRange(format!(
                "frame rate {numerator}/{denominator} must have non-zero parts"
            )));
        }
        Ok(Self::from_parts(numerator, denominator))
    }

    const fn from_parts(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    #[inline]
    pub fn numerator(self) -> u32 {
        self.numerator
    }

    #[inline]
    pub fn denominator(self) -> u32 {
        self.denominator
    }

    /// Frames per second as f64.
    #[inline]
    pub fn to_fps_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Recover a rational rate from the float the project file stores.
    /// NTSC rates (23.976, 29.97, 59.94) map back to their x/1001 form.
    pub fn from_fps_f64(fps: f64) -> Self {
        if fps <= 0.0 || !fps.is_finite() {
            return Self::default();
        }
        if (fps - fps.round()).abs() < 1e-6 {
            return Self::from_parts(fps.round() as u32, 1);
        }
        let ntsc = fps * 1001.0 / 1000.0;
        if (ntsc - ntsc.round()).abs() < 1e-3 && ntsc >= 1.0 {
            return Self::from_parts(ntsc.round() as u32 * 1000, 1001);
        }
        let millis = (fps * 1000.0).round() as u32;
        if millis == 0 {
            return Self::default();
        }
        Self::from_parts(millis, 1000)
    }

    /// Duration of a single frame (floored to whole microseconds).
    #[inline]
    pub fn frame_duration(self) -> Micros {
        Micros::from_frames(1, self)
    }

    pub const FPS_23_976: Self = Self::from_parts(24000, 1001);
    pub const FPS_24: Self = Self::from_parts(24, 1);
    pub const FPS_25: Self = Self::from_parts(25, 1);
    pub const FPS_29_97: Self = Self::from_parts(30000, 1001);
    pub const FPS_30: Self = Self::from_parts(30, 1);
    pub const FPS_50: Self = Self::from_parts(50, 1);
    pub const FPS_59_94: Self = Self::from_parts(60000, 1001);
    pub const FPS_60: Self = Self::from_parts(60, 1);
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::FPS_30
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fps = self.to_fps_f64();
        if (fps - fps.round()).abs() < 0.001 {
            write!(f, "{} fps", fps.round() as u32)
        } else {
            write!(f, "{:.3} fps", fps)
        }
    }
}

/// A time range with inclusive start and exclusive end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Micros,
    pub duration: Micros,
}

impl TimeRange {
    /// Create a range without validation. Use [`TimeRange::try_new`] for
    /// caller-supplied values.
    #[inline]
    pub const fn new(start: Micros, duration: Micros) -> Self {
        Self { start, duration }
    }

    /// Create a range, rejecting a negative start or duration.
    pub fn try_new(start: Micros, duration: Micros) -> Result<Self> {
        if start.is_negative() || duration.is_negative() {
            return Err(DraftError::InvalidTimeRange(format!(
                "start {} and duration {} must be non-negative",
                start.0, duration.0
            )));
        }
        Ok(Self { start, duration })
    }

    #[inline]
    pub fn from_start_end(start: Micros, end: Micros) -> Self {
        Self {
            start,
            duration: end - start,
        }
    }

    /// End time (exclusive).
    #[inline]
    pub fn end(self) -> Micros {
        self.start + self.duration
    }

    #[inline]
    pub fn contains(self, time: Micros) -> bool {
        time >= self.start && time < self.end()
    }

    pub fn overlaps(self, other: Self) -> bool {
        self.start < other.end() && other.start < self.end()
    }

    pub fn intersection(self, other: Self) -> Option<Self> {
        if !self.overlaps(other) {
            return None;
        }
        let start = self.start.max(other.start);
        let end = self.end().min(other.end());
        Some(Self::from_start_end(start, end))
    }

    /// The same range moved by `offset`.
    #[inline]
    pub fn shifted(self, offset: Micros) -> Self {
        Self::new(self.start + offset, self.duration)
    }

    pub fn is_valid(self) -> bool {
        !self.start.is_negative() && !self.duration.is_negative()
    }
}

/// Build a validated range from two human time strings: `trange("0s", "5s")`.
pub fn trange(start: &str, duration: &str) -> Result<TimeRange> {
    TimeRange::try_new(Micros::parse(start)?, Micros::parse(duration)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_raw_count() {
        assert_eq!(Micros::parse("5000000").unwrap(), Micros(5_000_000));
        assert_eq!(Micros::parse(" 0 ").unwrap(), Micros::ZERO);
    }

    #[test]
    fn test_parse_compound() {
        assert_eq!(Micros::parse("1m30s").unwrap(), Micros::from_secs(90));
        assert_eq!(Micros::parse("1.5s").unwrap(), Micros(1_500_000));
        assert_eq!(Micros::parse("250ms").unwrap(), Micros(250_000));
        assert_eq!(
            Micros::parse("1h 2m 3.5s").unwrap(),
            Micros(3_723_500_000)
        );
        assert_eq!(Micros::parse("12us").unwrap(), Micros(12));
        assert_eq!(Micros::parse("0.000001s").unwrap(), Micros(1));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        for bad in ["", "-1s", "-5", "abc", "1.5", "5x", "1s1s", "1..5s", "0.0000001s", ".5s"] {
            let err = Micros::parse(bad).unwrap_err();
            assert!(
                matches!(err, DraftError::InvalidTimeFormat { .. }),
                "{bad:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_from_count_rejects_negative() {
        assert!(Micros::from_count(-1).is_err());
        assert_eq!(Micros::from_count(7).unwrap(), Micros(7));
    }

    #[test]
    fn test_format() {
        assert_eq!(Micros::ZERO.format(), "0s");
        assert_eq!(Micros::from_secs(90).format(), "1m30s");
        assert_eq!(Micros(1_500_000).format(), "1.5s");
        assert_eq!(Micros(250_000).format(), "0.25s");
        assert_eq!(Micros::from_secs(3600).format(), "1h");
        assert_eq!(Micros(3_600_000_001).format(), "1h0.000001s");
    }

    #[test]
    fn test_frames() {
        let rate = FrameRate::FPS_30;
        assert_eq!(Micros::from_frames(30, rate), Micros::SEC);
        assert_eq!(Micros::from_secs(2).to_frames(rate), 60);
        assert_eq!(Micros::from_frames(1, FrameRate::FPS_29_97), Micros(33_366));
    }

    #[test]
    fn test_parse_overflow_is_an_error() {
        for huge in [
            "99999999999999999999999999999999999h",
            "9999999999999999999999999999999999.5m",
            "9223372036854775807s",
            "99999999999999999999999",
        ] {
            assert!(
                matches!(Micros::parse(huge), Err(DraftError::InvalidTimeFormat { .. })),
                "{huge:?}"
            );
        }
    }

    #[test]
    fn test_frame_rate_rejects_zero_parts() {
        assert!(matches!(
            FrameRate::new(0, 1),
            Err(DraftError::InvalidTimeRange(_))
        ));
        assert!(FrameRate::new(30, 0).is_err());
        let rate = FrameRate::new(30000, 1001).unwrap();
        assert_eq!(rate, FrameRate::FPS_29_97);
        assert_eq!(rate.numerator(), 30000);

        let zero: std::result::Result<FrameRate, _> =
            serde_json::from_str(r#"{"numerator":0,"denominator":1}"#);
        assert!(zero.is_err());
        assert_eq!(FrameRate::from_fps_f64(0.0001), FrameRate::default());
    }

    #[test]
    fn test_frame_rate_from_float() {
        assert_eq!(FrameRate::from_fps_f64(30.0), FrameRate::FPS_30);
        assert_eq!(FrameRate::from_fps_f64(29.97), FrameRate::FPS_29_97);
        assert_eq!(FrameRate::from_fps_f64(23.976), FrameRate::FPS_23_976);
    }

    #[test]
    fn test_time_range_overlap() {
        let a = TimeRange::new(Micros::ZERO, Micros::from_secs(10));
        let b = TimeRange::new(Micros::from_secs(5), Micros::from_secs(10));
        assert!(a.overlaps(b));

        let intersection = a.intersection(b).unwrap();
        assert_eq!(intersection.start, Micros::from_secs(5));
        assert_eq!(intersection.duration, Micros::from_secs(5));

        let c = TimeRange::new(Micros::from_secs(10), Micros::from_secs(1));
        assert!(!a.overlaps(c));
    }

    #[test]
    fn test_trange() {
        let range = trange("1s", "2.5s").unwrap();
        assert_eq!(range.end(), Micros(3_500_000));
        assert!(TimeRange::try_new(Micros(-1), Micros::SEC).is_err());
    }

    proptest! {
        #[test]
        fn format_then_parse_is_identity(us in 0i64..=10_000_000_000_000) {
            let t = Micros(us);
            prop_assert_eq!(Micros::parse(&t.format()).unwrap(), t);
        }
    }
}
