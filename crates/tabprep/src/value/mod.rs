//! Cell model and value coercion.
//!
//! Every raw value entering the library goes through this module. Coercion
//! never fails: anything that is not missing, boolean, numeric or temporal is
//! kept as text.
//!
//! ```rust
//! use tabprep::value::{Cell, CoercionOptions};
//!
//! let options = CoercionOptions::default();
//! assert_eq!(Cell::parse_text("NaN", &options), Cell::Missing);
//! assert_eq!(Cell::parse_text("1.234,5", &options), Cell::Number(1234.5));
//! assert!(matches!(Cell::parse_text("2024-01-15", &options), Cell::Timestamp(_)));
//! ```

pub mod temporal;

pub use temporal::DateFormat;

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

static NUMBER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?$").expect("Invalid regex: number")
});

/// Decimal separator used when parsing numeric text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecimalSeparator {
    #[serde(rename = ".")]
    Dot,
    #[serde(rename = ",")]
    Comma,
}

impl DecimalSeparator {
    fn as_char(self) -> char {
        match self {
            Self::Dot => '.',
            Self::Comma => ',',
        }
    }
}

/// Options controlling how raw text becomes a [`Cell`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoercionOptions {
    /// Fixed decimal separator; `None` detects it per value.
    pub decimal_separator: Option<DecimalSeparator>,
    pub date_format: DateFormat,
    pub trim_whitespace: bool,
}

impl Default for CoercionOptions {
    fn default() -> Self {
        Self {
            decimal_separator: None,
            date_format: DateFormat::Auto,
            trim_whitespace: true,
        }
    }
}

/// A single tagged scalar.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Missing,
    /// Always finite; use [`Cell::number`] to construct from arbitrary floats.
    Number(f64),
    Boolean(bool),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl Cell {
    /// Number cell, or `Missing` when the value is not finite.
    pub fn number(value: f64) -> Self {
        if value.is_finite() {
            Cell::Number(value)
        } else {
            Cell::Missing
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// Classify a piece of text.
    pub fn parse_text(raw: &str, options: &CoercionOptions) -> Self {
        let s = if options.trim_whitespace { raw.trim() } else { raw };
        if is_missing_token(s) {
            return Cell::Missing;
        }
        if s.eq_ignore_ascii_case("true") {
            return Cell::Boolean(true);
        }
        if s.eq_ignore_ascii_case("false") {
            return Cell::Boolean(false);
        }
        if let Some(number) = parse_number(s, options.decimal_separator) {
            return Cell::Number(number);
        }
        if let Some(ts) = options.date_format.parse(s) {
            return Cell::Timestamp(ts);
        }
        Cell::Text(s.to_string())
    }

    /// Numeric reading of the cell. Booleans read as 0/1.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            Cell::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Cell::Text(s) => parse_number(s, None),
            Cell::Missing | Cell::Timestamp(_) => None,
        }
    }

    /// Numeric value used by statistics and numeric stages.
    ///
    /// Unlike [`Cell::to_number`], booleans are not numbers here.
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            Cell::Text(s) => parse_number(s, None),
            _ => None,
        }
    }

    /// Instant reading of the cell with the given pattern.
    pub fn to_timestamp(&self, format: DateFormat) -> Option<DateTime<Utc>> {
        match self {
            Cell::Timestamp(ts) => Some(*ts),
            Cell::Text(s) => format.parse(s),
            _ => None,
        }
    }

    /// Equality key. Numbers compare by value, timestamps by instant and
    /// text optionally after trimming.
    pub fn key(&self, trim_text: bool) -> CellKey {
        match self {
            Cell::Missing => CellKey::Missing,
            Cell::Number(v) => {
                let normalized = if *v == 0.0 { 0.0 } else { *v };
                CellKey::Number(normalized.to_bits())
            }
            Cell::Boolean(b) => CellKey::Boolean(*b),
            Cell::Text(s) if trim_text => CellKey::Text(s.trim().to_string()),
            Cell::Text(s) => CellKey::Text(s.clone()),
            Cell::Timestamp(ts) => CellKey::Timestamp(ts.timestamp(), ts.timestamp_subsec_nanos()),
        }
    }

    /// JSON representation; `Missing` is `null`.
    pub fn to_json(&self) -> Value {
        match self {
            Cell::Missing => Value::Null,
            Cell::Number(v) => serde_json::Number::from_f64(*v).map_or(Value::Null, Value::Number),
            Cell::Boolean(b) => Value::Bool(*b),
            Cell::Text(s) => Value::String(s.clone()),
            Cell::Timestamp(ts) => Value::String(format_timestamp(ts)),
        }
    }

    /// Plain text form used for CSV output; `None` for missing.
    pub fn to_plain_string(&self) -> Option<String> {
        match self {
            Cell::Missing => None,
            other => Some(other.to_string()),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Cell::Missing => "missing",
            Cell::Number(_) => "number",
            Cell::Boolean(_) => "boolean",
            Cell::Text(_) => "text",
            Cell::Timestamp(_) => "timestamp",
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Missing => Ok(()),
            Cell::Number(v) => write!(f, "{}", v),
            Cell::Boolean(b) => write!(f, "{}", b),
            Cell::Text(s) => f.write_str(s),
            Cell::Timestamp(ts) => f.write_str(&format_timestamp(ts)),
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::number(value)
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Cell::Missing, Cell::number)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Boolean(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::parse_text(value, &CoercionOptions::default())
    }
}

impl From<DateTime<Utc>> for Cell {
    fn from(value: DateTime<Utc>) -> Self {
        Cell::Timestamp(value)
    }
}

impl Serialize for Cell {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Cell::Missing => serializer.serialize_none(),
            Cell::Number(v) => serializer.serialize_f64(*v),
            Cell::Boolean(b) => serializer.serialize_bool(*b),
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Timestamp(ts) => serializer.serialize_str(&format_timestamp(ts)),
        }
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Ok(classify(&raw))
    }
}

/// Hashable equality key for a [`Cell`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellKey {
    Missing,
    Number(u64),
    Boolean(bool),
    Text(String),
    Timestamp(i64, u32),
}

/// Classify a raw JSON scalar with default coercion options.
pub fn classify(raw: &Value) -> Cell {
    classify_with(raw, &CoercionOptions::default())
}

/// Classify a raw JSON scalar.
///
/// Arrays and objects are not scalars; they are kept as their JSON text.
pub fn classify_with(raw: &Value, options: &CoercionOptions) -> Cell {
    match raw {
        Value::Null => Cell::Missing,
        Value::Bool(b) => Cell::Boolean(*b),
        Value::Number(n) => n.as_f64().map_or(Cell::Missing, Cell::number),
        Value::String(s) => Cell::parse_text(s, options),
        other => Cell::Text(other.to_string()),
    }
}

/// Numeric reading of a cell; `None` stands for Missing.
pub fn to_number(cell: &Cell) -> Option<f64> {
    cell.to_number()
}

/// Instant reading of a cell with the given pattern.
pub fn to_timestamp(cell: &Cell, format: DateFormat) -> Option<DateTime<Utc>> {
    cell.to_timestamp(format)
}

/// `""`, whitespace-only text and case-insensitive `nan`.
pub fn is_missing_token(s: &str) -> bool {
    let trimmed = s.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan")
}

/// Parse numeric text.
///
/// With no fixed separator, a lone `.` or `,` is the decimal separator. When
/// both appear the rightmost is the decimal separator and the other groups
/// digits. A separator appearing more than once only groups digits.
pub fn parse_number(raw: &str, separator: Option<DecimalSeparator>) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let normalized = normalize_separators(s, separator)?;
    if !NUMBER_PATTERN.is_match(&normalized) {
        return None;
    }
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn normalize_separators(s: &str, separator: Option<DecimalSeparator>) -> Option<String> {
    let dots = s.matches('.').count();
    let commas = s.matches(',').count();
    if dots == 0 && commas == 0 {
        return Some(s.to_string());
    }

    let decimal = match separator {
        Some(fixed) => Some(fixed.as_char()),
        None => match (dots, commas) {
            (1, 0) => Some('.'),
            (0, 1) => Some(','),
            (_, 0) | (0, _) => None,
            _ => {
                let last_dot = s.rfind('.');
                let last_comma = s.rfind(',');
                if last_dot > last_comma { Some('.') } else { Some(',') }
            }
        },
    };

    let grouping = match decimal {
        Some('.') => ',',
        Some(_) => '.',
        None if dots > 0 => '.',
        None => ',',
    };

    if let Some(decimal) = decimal {
        if s.matches(decimal).count() > 1 {
            return None;
        }
    }

    let (integer, fraction) = match decimal.and_then(|d| s.split_once(d)) {
        Some((integer, fraction)) => (integer, fraction),
        None => (s, ""),
    };
    if fraction.contains(grouping) || (integer.contains(grouping) && !is_digit_grouping(integer, grouping)) {
        return None;
    }

    let normalized: String = s
        .chars()
        .filter(|c| *c != grouping)
        .map(|c| if Some(c) == decimal { '.' } else { c })
        .collect();
    Some(normalized)
}

/// Groups of thousands: one to three leading digits, then groups of exactly
/// three. `25.12.2024` is not grouped.
fn is_digit_grouping(integer: &str, grouping: char) -> bool {
    let digits = integer.trim_start_matches(['+', '-']);
    let mut groups = digits.split(grouping);
    groups.next().is_some_and(|first| (1..=3).contains(&first.len())) && groups.all(|group| group.len() == 3)
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
