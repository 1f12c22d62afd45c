use chrono::{Datelike, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A signed geographic position. Latitude is in `[-90, 90]`, longitude in `[-180, 180]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Build coordinates, clamping both axes into range. NaN collapses to 0.
    pub fn clamped(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: clamp_axis(latitude, Axis::Latitude.max_magnitude()),
            longitude: clamp_axis(longitude, Axis::Longitude.max_magnitude()),
        }
    }
}

fn clamp_axis(value: f64, max: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(-max, max) }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lat = Hemisphere::of_signed(Axis::Latitude, self.latitude);
        let lng = Hemisphere::of_signed(Axis::Longitude, self.longitude);
        write!(
            f,
            "{:.4}°{}, {:.4}°{}",
            self.latitude.abs(),
            lat.symbol(),
            self.longitude.abs(),
            lng.symbol()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    pub fn max_magnitude(self) -> f64 {
        match self {
            Axis::Latitude => 90.0,
            Axis::Longitude => 180.0,
        }
    }

    /// The hemisphere a value falls in when nothing else is known.
    pub fn positive(self) -> Hemisphere {
        match self {
            Axis::Latitude => Hemisphere::North,
            Axis::Longitude => Hemisphere::East,
        }
    }

    pub fn negative(self) -> Hemisphere {
        match self {
            Axis::Latitude => Hemisphere::South,
            Axis::Longitude => Hemisphere::West,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hemisphere {
    North,
    South,
    East,
    West,
}

impl Hemisphere {
    pub fn symbol(self) -> char {
        match self {
            Hemisphere::North => 'N',
            Hemisphere::South => 'S',
            Hemisphere::East => 'E',
            Hemisphere::West => 'W',
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            Hemisphere::North | Hemisphere::South => Axis::Latitude,
            Hemisphere::East | Hemisphere::West => Axis::Longitude,
        }
    }

    pub fn sign(self) -> f64 {
        match self {
            Hemisphere::South | Hemisphere::West => -1.0,
            Hemisphere::North | Hemisphere::East => 1.0,
        }
    }

    /// Hemisphere of a signed value. Negative zero counts as South/West.
    pub fn of_signed(axis: Axis, value: f64) -> Self {
        if value.is_sign_negative() { axis.negative() } else { axis.positive() }
    }
}

impl fmt::Display for Hemisphere {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl TryFrom<&str> for Hemisphere {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_uppercase().as_str() {
            "N" | "NORTH" => Ok(Hemisphere::North),
            "S" | "SOUTH" => Ok(Hemisphere::South),
            "E" | "EAST" => Ok(Hemisphere::East),
            "W" | "WEST" => Ok(Hemisphere::West),
            _ => Err(anyhow::anyhow!(
                "Unknown hemisphere '{value}'. Expected one of N, S, E, W."
            )),
        }
    }
}

/// Calendar position with a signed year. Years `<= 0` are BCE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeParams {
    pub year: i64,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl TimeParams {
    pub const fn new(year: i64, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self { year, month, day, hour, minute, second }
    }

    /// Calendar fields of any chrono date-time, e.g. `Local::now()`.
    pub fn from_datetime<T: Datelike + Timelike>(dt: &T) -> Self {
        Self::new(
            i64::from(dt.year()),
            dt.month() as u8,
            dt.day() as u8,
            dt.hour() as u8,
            dt.minute() as u8,
            dt.second() as u8,
        )
    }

    /// "2560 BC" or "AD 117".
    pub fn year_label(&self) -> String {
        if self.year <= 0 { format!("{} BC", self.year.unsigned_abs()) } else { format!("AD {}", self.year) }
    }

    /// Viewer format: `AD 1989 • 11/09 • 19:00:00`.
    pub fn format_long(&self) -> String {
        format!(
            "{} • {:02}/{:02} • {:02}:{:02}:{:02}",
            self.year_label(),
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second
        )
    }

    /// Souvenir format: `AD 1989 - 11/09 - 19:00`.
    pub fn format_short(&self) -> String {
        format!(
            "{} - {:02}/{:02} - {:02}:{:02}",
            self.year_label(),
            self.month,
            self.day,
            self.hour,
            self.minute
        )
    }
}

impl fmt::Display for TimeParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_long())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeField {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl TimeField {
    /// Inclusive range of the field. Year is unbounded here.
    pub fn bounds(self) -> (i64, i64) {
        match self {
            TimeField::Year => (i64::MIN, i64::MAX),
            TimeField::Month => (1, 12),
            TimeField::Day => (1, 31),
            TimeField::Hour => (0, 23),
            TimeField::Minute | TimeField::Second => (0, 59),
        }
    }

    /// Value used when the input is not a number.
    pub fn fallback(self) -> i64 {
        match self {
            TimeField::Month | TimeField::Day => 1,
            TimeField::Year | TimeField::Hour | TimeField::Minute | TimeField::Second => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Era {
    AncientHistory,
    ClassicalAntiquity,
    MiddleAges,
    EarlyModern,
    ModernEra,
    TheFuture,
}

impl Era {
    pub fn of(year: i64) -> Self {
        match year {
            y if y < -3000 => Era::AncientHistory,
            y if y < 500 => Era::ClassicalAntiquity,
            y if y < 1500 => Era::MiddleAges,
            y if y < 1900 => Era::EarlyModern,
            y if y < 2025 => Era::ModernEra,
            _ => Era::TheFuture,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Era::AncientHistory => "ANCIENT HISTORY",
            Era::ClassicalAntiquity => "CLASSICAL ANTIQUITY",
            Era::MiddleAges => "MIDDLE AGES",
            Era::EarlyModern => "EARLY MODERN",
            Era::ModernEra => "MODERN ERA",
            Era::TheFuture => "THE FUTURE",
        }
    }
}

impl fmt::Display for Era {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Seed entry for the "randomize" action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoricalEvent {
    pub id: &'static str,
    pub title: &'static str,
    pub coordinates: Coordinates,
    pub time: TimeParams,
    pub description: &'static str,
}

/// A free-text query resolved to a place and a moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMatch {
    pub title: String,
    pub coordinates: Coordinates,
    pub time: TimeParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelResult {
    pub location_name: String,
    pub description: String,
    /// `None` is a valid text-only result.
    pub image_url: Option<String>,
    pub time: TimeParams,
}
