//! Cell values.
//!
//! `RowValue` is the scalar a row exposes for one column. Filters compare
//! `RowValue`s, and the keyed [`Record`](super::Record) type stores them.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Formats accepted when a string has to be read as a date or date-time.
const DATE_TIME_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A scalar cell value.
///
/// Serialized untagged, so JSON `null`, `true`, `3`, `2.5`, `"2024-01-31"`
/// and `"text"` map to `Null`, `Bool`, `Int`, `Float`, `Date` and `String`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowValue {
    /// No value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value. `NaN` counts as blank.
    Float(f64),
    /// Date and time without a timezone.
    DateTime(NaiveDateTime),
    /// Calendar date.
    Date(NaiveDate),
    /// Text value.
    String(String),
}

impl RowValue {
    /// Returns `true` for `Null`, `NaN`, and the empty string.
    pub fn is_blank(&self) -> bool {
        match self {
            RowValue::Null => true,
            RowValue::Float(f) => f.is_nan(),
            RowValue::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Returns `true` if this is `RowValue::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, RowValue::Null)
    }

    /// Numeric view of the value. Integers widen to `f64`; other variants
    /// (including numeric-looking strings) are not numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RowValue::Int(n) => Some(*n as f64),
            RowValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the string slice if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RowValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RowValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Date-time view of the value.
    ///
    /// Dates become midnight; strings are parsed as ISO-8601 dates or
    /// date-times. Anything else, or an unparseable string, yields `None`.
    pub fn as_date_time(&self) -> Option<NaiveDateTime> {
        match self {
            RowValue::DateTime(dt) => Some(*dt),
            RowValue::Date(d) => Some(d.and_time(NaiveTime::MIN)),
            RowValue::String(s) => parse_date_time(s),
            _ => None,
        }
    }

    /// Date view of the value, dropping any time component.
    pub fn as_date(&self) -> Option<NaiveDate> {
        self.as_date_time().map(|dt| dt.date())
    }

    /// Textual key used when a value serves as a row id or parent id.
    ///
    /// Blank values have no key.
    pub fn as_key(&self) -> Option<String> {
        if self.is_blank() {
            return None;
        }
        match self {
            RowValue::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

fn parse_date_time(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN));
    }
    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

impl fmt::Display for RowValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowValue::Null => Ok(()),
            RowValue::Bool(b) => write!(f, "{b}"),
            RowValue::Int(n) => write!(f, "{n}"),
            RowValue::Float(n) => write!(f, "{n}"),
            RowValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            RowValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            RowValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for RowValue {
    fn from(s: &str) -> Self {
        RowValue::String(s.to_string())
    }
}

impl From<String> for RowValue {
    fn from(s: String) -> Self {
        RowValue::String(s)
    }
}

impl From<&String> for RowValue {
    fn from(s: &String) -> Self {
        RowValue::String(s.clone())
    }
}

impl From<i64> for RowValue {
    fn from(n: i64) -> Self {
        RowValue::Int(n)
    }
}

impl From<i32> for RowValue {
    fn from(n: i32) -> Self {
        RowValue::Int(n as i64)
    }
}

impl From<u32> for RowValue {
    fn from(n: u32) -> Self {
        RowValue::Int(n as i64)
    }
}

impl From<f64> for RowValue {
    fn from(n: f64) -> Self {
        RowValue::Float(n)
    }
}

impl From<f32> for RowValue {
    fn from(n: f32) -> Self {
        RowValue::Float(n as f64)
    }
}

impl From<bool> for RowValue {
    fn from(b: bool) -> Self {
        RowValue::Bool(b)
    }
}

impl From<NaiveDate> for RowValue {
    fn from(d: NaiveDate) -> Self {
        RowValue::Date(d)
    }
}

impl From<NaiveDateTime> for RowValue {
    fn from(dt: NaiveDateTime) -> Self {
        RowValue::DateTime(dt)
    }
}

impl<T: Into<RowValue>> From<Option<T>> for RowValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValue::Null, Into::into)
    }
}
