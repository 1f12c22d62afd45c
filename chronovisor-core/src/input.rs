//! Editable coordinate/time state.
//!
//! Coordinates are edited as a non-negative magnitude plus a hemisphere per
//! axis, so a zero magnitude keeps its South/West tag. The signed
//! [`Coordinates`] value is derived on output.

use crate::model::{Axis, Coordinates, Hemisphere, TimeField, TimeParams};

/// Lower bound of the manual year entry (100 million BC).
pub const MIN_YEAR: i64 = -100_000_000;
/// Upper bound of the manual year entry.
pub const MAX_YEAR: i64 = 3000;

pub const SLIDER_MIN_YEAR: i64 = -10_000;
pub const SLIDER_MAX_YEAR: i64 = 3000;
pub const SLIDER_STEP: i64 = 10;

/// One axis of a coordinate: `magnitude >= 0` and a hemisphere that belongs to the axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisValue {
    axis: Axis,
    magnitude: f64,
    hemisphere: Hemisphere,
}

impl AxisValue {
    /// Parse a free-text magnitude. Non-numeric input becomes 0, the absolute
    /// value is taken and clamped to the axis maximum. A hemisphere from the
    /// other axis falls back to this axis' positive direction.
    pub fn parse(axis: Axis, magnitude: &str, hemisphere: Hemisphere) -> Self {
        let parsed = parse_float(magnitude).unwrap_or(0.0);
        Self::new(axis, parsed, hemisphere)
    }

    pub fn new(axis: Axis, magnitude: f64, hemisphere: Hemisphere) -> Self {
        let magnitude = if magnitude.is_finite() {
            magnitude.abs().min(axis.max_magnitude())
        } else if magnitude.is_infinite() {
            axis.max_magnitude()
        } else {
            0.0
        };
        let hemisphere = if hemisphere.axis() == axis { hemisphere } else { axis.positive() };
        Self { axis, magnitude, hemisphere }
    }

    /// Split a signed value into magnitude and hemisphere. `-0.0` maps to South/West.
    pub fn from_signed(axis: Axis, value: f64) -> Self {
        Self::new(axis, value, Hemisphere::of_signed(axis, value))
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn hemisphere(&self) -> Hemisphere {
        self.hemisphere
    }

    pub fn signed(&self) -> f64 {
        self.magnitude * self.hemisphere.sign()
    }
}

/// The selected target: latitude and longitude as tagged magnitudes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetVector {
    pub latitude: AxisValue,
    pub longitude: AxisValue,
}

impl Default for TargetVector {
    fn default() -> Self {
        Self::from(Coordinates { latitude: 0.0, longitude: 0.0 })
    }
}

impl From<Coordinates> for TargetVector {
    fn from(c: Coordinates) -> Self {
        Self {
            latitude: AxisValue::from_signed(Axis::Latitude, c.latitude),
            longitude: AxisValue::from_signed(Axis::Longitude, c.longitude),
        }
    }
}

impl TargetVector {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates { latitude: self.latitude.signed(), longitude: self.longitude.signed() }
    }

    pub fn axis(&self, axis: Axis) -> &AxisValue {
        match axis {
            Axis::Latitude => &self.latitude,
            Axis::Longitude => &self.longitude,
        }
    }

    /// Replace one axis from free text; the other axis is passed through unchanged.
    pub fn set_coordinate_magnitude(
        &mut self,
        axis: Axis,
        magnitude: &str,
        hemisphere: Hemisphere,
    ) -> Coordinates {
        let value = AxisValue::parse(axis, magnitude, hemisphere);
        match axis {
            Axis::Latitude => self.latitude = value,
            Axis::Longitude => self.longitude = value,
        }
        self.coordinates()
    }
}

/// Set one time field from free text, clamping it into its range.
///
/// Year passes through unclamped; see [`set_year_manual`] and [`set_year_slider`].
pub fn set_time_field(time: TimeParams, field: TimeField, value: &str) -> TimeParams {
    let raw = parse_int(value).unwrap_or_else(|| field.fallback());
    with_field(time, field, raw)
}

/// Manual entry path: year bounded by [`MIN_YEAR`]..=[`MAX_YEAR`].
pub fn set_year_manual(time: TimeParams, value: &str) -> TimeParams {
    let year = parse_int(value).unwrap_or(0).clamp(MIN_YEAR, MAX_YEAR);
    TimeParams { year, ..time }
}

/// Coarse slider: bounded by the slider range and snapped to its step.
pub fn set_year_slider(time: TimeParams, year: i64) -> TimeParams {
    let clamped = year.clamp(SLIDER_MIN_YEAR, SLIDER_MAX_YEAR);
    let snapped = SLIDER_MIN_YEAR
        + ((clamped - SLIDER_MIN_YEAR + SLIDER_STEP / 2) / SLIDER_STEP) * SLIDER_STEP;
    TimeParams { year: snapped.min(SLIDER_MAX_YEAR), ..time }
}

/// Clamp every field of a time value into range. Used for values coming back from models.
pub fn normalize_time(time: TimeParams) -> TimeParams {
    [TimeField::Month, TimeField::Day, TimeField::Hour, TimeField::Minute, TimeField::Second]
        .into_iter()
        .fold(time, |t, field| {
            let current = match field {
                TimeField::Month => t.month,
                TimeField::Day => t.day,
                TimeField::Hour => t.hour,
                TimeField::Minute => t.minute,
                _ => t.second,
            };
            with_field(t, field, i64::from(current))
        })
}

pub(crate) fn with_field(time: TimeParams, field: TimeField, raw: i64) -> TimeParams {
    let (lo, hi) = field.bounds();
    let v = raw.clamp(lo, hi);
    // Non-year bounds fit in u8.
    let small = u8::try_from(v).unwrap_or(0);
    match field {
        TimeField::Year => TimeParams { year: v, ..time },
        TimeField::Month => TimeParams { month: small, ..time },
        TimeField::Day => TimeParams { day: small, ..time },
        TimeField::Hour => TimeParams { hour: small, ..time },
        TimeField::Minute => TimeParams { minute: small, ..time },
        TimeField::Second => TimeParams { second: small, ..time },
    }
}

/// Leading-numeric float parse: `"12.5abc"` reads as 12.5, `"1e2x"` as 100,
/// `"-Infinity"` as negative infinity, `"abc"` as `None`.
fn parse_float(s: &str) -> Option<f64> {
    let s = s.trim();
    let unsigned = s.trim_start_matches(['-', '+']);
    if s.len() - unsigned.len() <= 1 && unsigned.starts_with("Infinity") {
        return Some(if s.starts_with('-') { f64::NEG_INFINITY } else { f64::INFINITY });
    }
    let mut end = numeric_prefix_len(s, true);
    if s[..end].bytes().any(|b| b.is_ascii_digit()) {
        end += exponent_len(&s[end..]);
    }
    s[..end].parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Length of a complete `[eE][+-]?digits` suffix at the start of `s`, else 0.
fn exponent_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    if !matches!(bytes.first(), Some(b'e' | b'E')) {
        return 0;
    }
    let mut i = 1;
    if matches!(bytes.get(i), Some(b'-' | b'+')) {
        i += 1;
    }
    let digits = bytes[i..].iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 { 0 } else { i + digits }
}

/// Leading-integer parse: `"42px"` reads as 42, `"7.9"` as 7.
fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim();
    let end = numeric_prefix_len(s, false);
    let digits = &s[..end];
    match digits.parse::<i64>() {
        Ok(v) => Some(v),
        // Overflowing digit runs saturate.
        Err(_) if digits.trim_start_matches(['-', '+']).chars().any(|c| c.is_ascii_digit()) => {
            Some(if digits.starts_with('-') { i64::MIN } else { i64::MAX })
        }
        Err(_) => None,
    }
}

fn numeric_prefix_len(s: &str, allow_fraction: bool) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'-' | b'+')) {
        i += 1;
    }
    let mut seen_dot = false;
    while i < bytes.len() {
        match bytes[i] {
            b'0'..=b'9' => {}
            b'.' if allow_fraction && !seen_dot => seen_dot = true,
            _ => break,
        }
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn base_time() -> TimeParams {
        TimeParams::new(1989, 11, 9, 19, 0, 0)
    }

    #[test]
    fn magnitude_is_clamped_and_signed() {
        let mut target = TargetVector::default();

        let c = target.set_coordinate_magnitude(Axis::Latitude, "95", Hemisphere::South);
        assert_eq!(c.latitude, -90.0);

        let c = target.set_coordinate_magnitude(Axis::Longitude, "-200.5", Hemisphere::East);
        assert_eq!(c.longitude, 180.0);
        assert_eq!(c.latitude, -90.0, "other axis passes through");
    }

    #[test]
    fn non_numeric_magnitude_is_zero() {
        let mut target = TargetVector::default();
        let c = target.set_coordinate_magnitude(Axis::Latitude, "north-ish", Hemisphere::North);
        assert_eq!(c.latitude, 0.0);
    }

    #[test]
    fn zero_magnitude_keeps_southern_hemisphere() {
        let mut target = TargetVector::default();
        target.set_coordinate_magnitude(Axis::Latitude, "0", Hemisphere::South);
        assert_eq!(target.latitude.hemisphere(), Hemisphere::South);

        // Editing longitude must not lose the latitude tag.
        target.set_coordinate_magnitude(Axis::Longitude, "12", Hemisphere::West);
        assert_eq!(target.latitude.hemisphere(), Hemisphere::South);
        assert!(target.coordinates().latitude.is_sign_negative());

        // Magnitude edit afterwards keeps the sign.
        let c = target.set_coordinate_magnitude(
            Axis::Latitude,
            "33.5",
            target.latitude.hemisphere(),
        );
        assert_eq!(c.latitude, -33.5);
    }

    #[test]
    fn hemisphere_from_wrong_axis_defaults_positive() {
        let v = AxisValue::parse(Axis::Latitude, "10", Hemisphere::West);
        assert_eq!(v.hemisphere(), Hemisphere::North);
        assert_eq!(v.signed(), 10.0);
    }

    #[test]
    fn time_fields_clamp_independently() {
        let t = set_time_field(base_time(), TimeField::Month, "13");
        assert_eq!(t.month, 12);
        let t = set_time_field(t, TimeField::Day, "0");
        assert_eq!(t.day, 1);
        let t = set_time_field(t, TimeField::Hour, "99");
        assert_eq!(t.hour, 23);
        let t = set_time_field(t, TimeField::Second, "-4");
        assert_eq!(t.second, 0);
        assert_eq!(t.year, 1989);
    }

    #[test]
    fn february_thirtieth_is_accepted() {
        let t = set_time_field(base_time(), TimeField::Month, "2");
        let t = set_time_field(t, TimeField::Day, "30");
        assert_eq!((t.month, t.day), (2, 30));
    }

    #[test]
    fn non_numeric_time_defaults_to_field_minimum() {
        assert_eq!(set_time_field(base_time(), TimeField::Month, "").month, 1);
        assert_eq!(set_time_field(base_time(), TimeField::Day, "x").day, 1);
        assert_eq!(set_time_field(base_time(), TimeField::Hour, "x").hour, 0);
        assert_eq!(set_time_field(base_time(), TimeField::Minute, "x").minute, 0);
        assert_eq!(set_time_field(base_time(), TimeField::Year, "x").year, 0);
    }

    #[test]
    fn year_field_is_unclamped_but_manual_entry_is_bounded() {
        let t = set_time_field(base_time(), TimeField::Year, "-500000000");
        assert_eq!(t.year, -500_000_000);

        let t = set_year_manual(base_time(), "-500000000");
        assert_eq!(t.year, MIN_YEAR);
        let t = set_year_manual(base_time(), "5000");
        assert_eq!(t.year, MAX_YEAR);
    }

    #[test]
    fn slider_snaps_to_step_within_range() {
        assert_eq!(set_year_slider(base_time(), 1987).year, 1990);
        assert_eq!(set_year_slider(base_time(), -66_000_000).year, SLIDER_MIN_YEAR);
        assert_eq!(set_year_slider(base_time(), 9999).year, SLIDER_MAX_YEAR);
    }

    #[test]
    fn leading_numeric_parse() {
        assert_eq!(parse_int("42px"), Some(42));
        assert_eq!(parse_int("7.9"), Some(7));
        assert_eq!(parse_int("-"), None);
        assert_eq!(parse_float("12.5abc"), Some(12.5));
        assert_eq!(parse_float("abc"), None);
    }

    #[test]
    fn float_parse_reads_exponents_and_infinity() {
        let cases: &[(&str, Option<f64>)] = &[
            ("5e-1", Some(0.5)),
            ("1e2", Some(100.0)),
            ("2.5E+1deg", Some(25.0)),
            ("3e", Some(3.0)),
            ("3e-x", Some(3.0)),
            ("e5", None),
            (".5e1", Some(5.0)),
            ("Infinity", Some(f64::INFINITY)),
            ("+Infinity", Some(f64::INFINITY)),
            ("-Infinityx", Some(f64::NEG_INFINITY)),
            ("--Infinity", None),
            ("infinity", None),
        ];
        for (input, expected) in cases {
            assert_eq!(parse_float(input), *expected, "input {input:?}");
        }
    }

    #[test]
    fn exponent_and_infinity_magnitudes_clamp() {
        let mut target = TargetVector::default();
        let cases = [("1e2", 90.0), ("Infinity", 90.0), ("5e-1", 0.5), ("-1e1", 10.0)];
        for (input, expected) in cases {
            let coords =
                target.set_coordinate_magnitude(Axis::Latitude, input, Hemisphere::North);
            assert_eq!(coords.latitude, expected, "input {input:?}");
        }
        let coords = target.set_coordinate_magnitude(Axis::Longitude, "1e9", Hemisphere::West);
        assert_eq!(coords.longitude, -180.0);
    }

    #[test]
    fn normalize_clamps_model_values() {
        let t = normalize_time(TimeParams::new(1, 0, 40, 24, 60, 61));
        assert_eq!(t, TimeParams::new(1, 1, 31, 23, 59, 59));
    }

    fn hemisphere_strategy() -> impl Strategy<Value = Hemisphere> {
        prop_oneof![
            Just(Hemisphere::North),
            Just(Hemisphere::South),
            Just(Hemisphere::East),
            Just(Hemisphere::West),
        ]
    }

    fn field_strategy() -> impl Strategy<Value = TimeField> {
        prop_oneof![
            Just(TimeField::Month),
            Just(TimeField::Day),
            Just(TimeField::Hour),
            Just(TimeField::Minute),
            Just(TimeField::Second),
        ]
    }

    proptest! {
        #[test]
        fn coordinates_always_in_range(
            lat in ".*",
            lng in prop::num::f64::ANY.prop_map(|v| v.to_string()),
            lat_h in hemisphere_strategy(),
            lng_h in hemisphere_strategy(),
        ) {
            let mut target = TargetVector::default();
            target.set_coordinate_magnitude(Axis::Latitude, &lat, lat_h);
            let c = target.set_coordinate_magnitude(Axis::Longitude, &lng, lng_h);
            prop_assert!((-90.0..=90.0).contains(&c.latitude));
            prop_assert!((-180.0..=180.0).contains(&c.longitude));
        }

        #[test]
        fn time_fields_always_in_range(
            edits in proptest::collection::vec((field_strategy(), ".*"), 1..20),
        ) {
            let mut t = base_time();
            for (field, value) in edits {
                t = set_time_field(t, field, &value);
            }
            prop_assert!((1..=12).contains(&t.month));
            prop_assert!((1..=31).contains(&t.day));
            prop_assert!(t.hour <= 23);
            prop_assert!(t.minute <= 59);
            prop_assert!(t.second <= 59);
        }
    }
}
