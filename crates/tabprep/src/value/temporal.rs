//! Timestamp parsing for the recognized date patterns.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Date pattern regexes - compiled once at startup
static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").expect("Invalid regex: YYYY-MM-DD"));

static ISO_DATETIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\d{4})-(\d{2})-(\d{2})[T ](\d{2}):(\d{2})(?::(\d{2})(?:\.(\d{1,9}))?)?(Z|z|[+-]\d{2}:?\d{2})?$",
    )
    .expect("Invalid regex: ISO datetime")
});

static SLASH_DAY_FIRST_OR_MONTH_FIRST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("Invalid regex: NN/NN/YYYY"));

static SLASH_YEAR_FIRST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})/(\d{1,2})/(\d{1,2})$").expect("Invalid regex: YYYY/MM/DD"));

static DASH_DAY_FIRST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})-(\d{1,2})-(\d{4})$").expect("Invalid regex: DD-MM-YYYY"));

static DOT_DAY_FIRST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})\.(\d{1,2})\.(\d{4})$").expect("Invalid regex: DD.MM.YYYY"));

/// A recognized date pattern, or `auto` to try every pattern in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DateFormat {
    #[default]
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "YYYY-MM-DD")]
    IsoDate,
    #[serde(rename = "YYYY-MM-DDThh:mm:ss")]
    IsoDateTime,
    #[serde(rename = "DD/MM/YYYY")]
    DayMonthYearSlash,
    #[serde(rename = "MM/DD/YYYY")]
    MonthDayYearSlash,
    #[serde(rename = "YYYY/MM/DD")]
    YearMonthDaySlash,
    #[serde(rename = "DD-MM-YYYY")]
    DayMonthYearDash,
    #[serde(rename = "DD.MM.YYYY")]
    DayMonthYearDot,
}

impl DateFormat {
    /// Concrete patterns in the order `auto` tries them.
    pub const PATTERNS: [DateFormat; 7] = [
        DateFormat::IsoDate,
        DateFormat::IsoDateTime,
        DateFormat::DayMonthYearSlash,
        DateFormat::MonthDayYearSlash,
        DateFormat::YearMonthDaySlash,
        DateFormat::DayMonthYearDash,
        DateFormat::DayMonthYearDot,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::IsoDate => "YYYY-MM-DD",
            Self::IsoDateTime => "YYYY-MM-DDThh:mm:ss",
            Self::DayMonthYearSlash => "DD/MM/YYYY",
            Self::MonthDayYearSlash => "MM/DD/YYYY",
            Self::YearMonthDaySlash => "YYYY/MM/DD",
            Self::DayMonthYearDash => "DD-MM-YYYY",
            Self::DayMonthYearDot => "DD.MM.YYYY",
        }
    }

    fn is_slash_ambiguous(&self) -> bool {
        matches!(self, Self::DayMonthYearSlash | Self::MonthDayYearSlash)
    }

    /// Parse a string with this pattern. `Auto` returns the first success
    /// in declared order.
    pub fn parse(&self, raw: &str) -> Option<DateTime<Utc>> {
        let s = raw.trim();
        match self {
            Self::Auto => Self::PATTERNS.iter().find_map(|format| format.parse(s)),
            Self::IsoDate => ISO_DATE
                .captures(s)
                .and_then(|caps| date_from(&caps, 1, 2, 3)),
            Self::IsoDateTime => ISO_DATETIME.captures(s).and_then(|caps| datetime_from(&caps)),
            Self::DayMonthYearSlash => SLASH_DAY_FIRST_OR_MONTH_FIRST
                .captures(s)
                .and_then(|caps| date_from(&caps, 3, 2, 1)),
            Self::MonthDayYearSlash => SLASH_DAY_FIRST_OR_MONTH_FIRST
                .captures(s)
                .and_then(|caps| date_from(&caps, 3, 1, 2)),
            Self::YearMonthDaySlash => SLASH_YEAR_FIRST
                .captures(s)
                .and_then(|caps| date_from(&caps, 1, 2, 3)),
            Self::DayMonthYearDash => DASH_DAY_FIRST
                .captures(s)
                .and_then(|caps| date_from(&caps, 3, 2, 1)),
            Self::DayMonthYearDot => DOT_DAY_FIRST
                .captures(s)
                .and_then(|caps| date_from(&caps, 3, 2, 1)),
        }
    }

}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        Self::PATTERNS
            .iter()
            .copied()
            .find(|format| format.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unrecognized date format '{}'", s))
    }
}

fn capture_u32(caps: &Captures<'_>, index: usize) -> Option<u32> {
    caps.get(index)?.as_str().parse().ok()
}

fn date_from(caps: &Captures<'_>, year: usize, month: usize, day: usize) -> Option<DateTime<Utc>> {
    let year: i32 = caps.get(year)?.as_str().parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, capture_u32(caps, month)?, capture_u32(caps, day)?)?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight))
}

fn datetime_from(caps: &Captures<'_>) -> Option<DateTime<Utc>> {
    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, capture_u32(caps, 2)?, capture_u32(caps, 3)?)?;

    let seconds = caps.get(6).map_or(Some(0), |m| m.as_str().parse().ok())?;
    let nanos = match caps.get(7) {
        Some(fraction) => {
            let digits = fraction.as_str();
            let padded = format!("{:0<9}", digits);
            padded.parse().ok()?
        }
        None => 0,
    };
    let time = NaiveTime::from_hms_nano_opt(capture_u32(caps, 4)?, capture_u32(caps, 5)?, seconds, nanos)?;
    let local = NaiveDateTime::new(date, time);

    let offset_seconds = match caps.get(8).map(|m| m.as_str()) {
        None | Some("Z") | Some("z") => 0,
        Some(offset) => parse_offset_seconds(offset)?,
    };
    let utc = local.checked_sub_signed(Duration::seconds(offset_seconds))?;
    Some(Utc.from_utc_datetime(&utc))
}

fn parse_offset_seconds(offset: &str) -> Option<i64> {
    let sign = if offset.starts_with('-') { -1 } else { 1 };
    let digits: String = offset[1..].chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 4 {
        return None;
    }
    let hours: i64 = digits[..2].parse().ok()?;
    let minutes: i64 = digits[2..].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(sign * (hours * 3600 + minutes * 60))
}

/// Decide between `DD/MM/YYYY` and `MM/DD/YYYY` from samples.
///
/// Day-first when at least half of the slash-shaped samples have a first
/// component greater than 12 (an exact tie resolves to day-first), otherwise
/// month-first.
pub fn resolve_slash_order<'a>(samples: impl IntoIterator<Item = &'a str>) -> DateFormat {
    let mut slash_samples = 0usize;
    let mut first_above_twelve = 0usize;

    for sample in samples {
        if let Some(caps) = SLASH_DAY_FIRST_OR_MONTH_FIRST.captures(sample.trim()) {
            slash_samples += 1;
            if capture_u32(&caps, 1).is_some_and(|first| first > 12) {
                first_above_twelve += 1;
            }
        }
    }

    if 2 * first_above_twelve >= slash_samples {
        DateFormat::DayMonthYearSlash
    } else {
        DateFormat::MonthDayYearSlash
    }
}

/// Pick the pattern with the highest success rate over the samples.
///
/// The two slash patterns are disambiguated first, so only one of them
/// competes. Ties resolve to the earlier pattern in declared order. Returns
/// the pattern and its success rate, or `None` if nothing parses.
pub fn infer_date_format(samples: &[&str]) -> Option<(DateFormat, f64)> {
    if samples.is_empty() {
        return None;
    }

    let slash_order = resolve_slash_order(samples.iter().copied());
    let mut best: Option<(DateFormat, usize)> = None;

    for format in DateFormat::PATTERNS {
        if format.is_slash_ambiguous() && format != slash_order {
            continue;
        }
        let successes = samples.iter().filter(|s| format.parse(s).is_some()).count();
        if successes > 0 && best.is_none_or(|(_, count)| successes > count) {
            best = Some((format, successes));
        }
    }

    best.map(|(format, count)| (format, count as f64 / samples.len() as f64))
}

/// ISO text of an instant: a plain date at midnight UTC, a date-time
/// otherwise.
pub fn iso_text(ts: &DateTime<Utc>) -> String {
    if ts.time() == NaiveTime::MIN {
        ts.format("%Y-%m-%d").to_string()
    } else {
        ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

/// Seconds since the Unix epoch, with sub-second precision.
pub fn to_epoch_seconds(ts: &DateTime<Utc>) -> f64 {
    ts.timestamp() as f64 + f64::from(ts.timestamp_subsec_nanos()) / 1e9
}

/// Instant for epoch seconds, rounded to the millisecond.
pub fn from_epoch_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let millis = (seconds * 1000.0).round();
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn ymd(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_iso_date() {
        assert_eq!(DateFormat::IsoDate.parse("2024-01-15"), Some(ymd(2024, 1, 15)));
        assert_eq!(DateFormat::IsoDate.parse("2024-02-30"), None);
        assert_eq!(DateFormat::IsoDate.parse("24-01-15"), None);
    }

    #[test]
    fn test_iso_datetime_with_offsets() {
        let utc = DateFormat::IsoDateTime.parse("2024-01-15T10:30:00Z").unwrap();
        assert_eq!(utc, Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap());

        let shifted = DateFormat::IsoDateTime.parse("2024-01-15T12:30:00+02:00").unwrap();
        assert_eq!(shifted, utc);

        let negative = DateFormat::IsoDateTime.parse("2024-01-15T05:30:00-05:00").unwrap();
        assert_eq!(negative, utc);

        let naive = DateFormat::IsoDateTime.parse("2024-01-15T10:30:00").unwrap();
        assert_eq!(naive, utc);
    }

    #[test]
    fn test_iso_datetime_fraction() {
        let ts = DateFormat::IsoDateTime.parse("2024-01-15T10:30:00.250Z").unwrap();
        assert_eq!(ts.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_day_and_month_first() {
        assert_eq!(DateFormat::DayMonthYearSlash.parse("03/04/2024"), Some(ymd(2024, 4, 3)));
        assert_eq!(DateFormat::MonthDayYearSlash.parse("03/04/2024"), Some(ymd(2024, 3, 4)));
        assert_eq!(DateFormat::MonthDayYearSlash.parse("25/12/2024"), None);
    }

    #[test]
    fn test_other_patterns() {
        assert_eq!(DateFormat::YearMonthDaySlash.parse("2024/12/25"), Some(ymd(2024, 12, 25)));
        assert_eq!(DateFormat::DayMonthYearDash.parse("25-12-2024"), Some(ymd(2024, 12, 25)));
        assert_eq!(DateFormat::DayMonthYearDot.parse("25.12.2024"), Some(ymd(2024, 12, 25)));
    }

    #[test]
    fn test_auto_uses_declared_order() {
        // Ambiguous slash dates resolve day-first under auto
        let ts = DateFormat::Auto.parse("03/04/2024").unwrap();
        assert_eq!(ts.month(), 4);
        // Month-first still parses when day-first is impossible
        let ts = DateFormat::Auto.parse("12/25/2024").unwrap();
        assert_eq!(ts.month(), 12);
        assert!(DateFormat::Auto.parse("not a date").is_none());
        assert!(DateFormat::Auto.parse("42").is_none());
    }

    #[test]
    fn test_resolve_slash_order() {
        assert_eq!(
            resolve_slash_order(["25/01/2024", "13/02/2024", "01/03/2024"]),
            DateFormat::DayMonthYearSlash
        );
        assert_eq!(
            resolve_slash_order(["01/25/2024", "02/13/2024", "03/01/2024"]),
            DateFormat::MonthDayYearSlash
        );
        // Exact tie resolves to day-first
        assert_eq!(
            resolve_slash_order(["25/01/2024", "01/02/2024"]),
            DateFormat::DayMonthYearSlash
        );
    }

    #[test]
    fn test_infer_date_format() {
        let samples = ["2024-01-01", "2024-01-02", "garbage"];
        let (format, rate) = infer_date_format(&samples).unwrap();
        assert_eq!(format, DateFormat::IsoDate);
        assert!((rate - 2.0 / 3.0).abs() < 1e-12);

        let samples = ["01/25/2024", "02/13/2024"];
        assert_eq!(infer_date_format(&samples).unwrap().0, DateFormat::MonthDayYearSlash);

        assert!(infer_date_format(&["x", "y"]).is_none());
    }

    #[test]
    fn test_iso_text() {
        assert_eq!(iso_text(&ymd(2024, 3, 9)), "2024-03-09");
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        assert_eq!(iso_text(&ts), "2024-03-09T14:05:00Z");
        assert_eq!(DateFormat::IsoDateTime.parse(&iso_text(&ts)), Some(ts));
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("auto".parse::<DateFormat>().unwrap(), DateFormat::Auto);
        assert_eq!("DD.MM.YYYY".parse::<DateFormat>().unwrap(), DateFormat::DayMonthYearDot);
        assert!("YYYYMMDD".parse::<DateFormat>().is_err());
    }

    #[test]
    fn test_epoch_roundtrip_millis() {
        let ts = DateFormat::IsoDateTime.parse("2024-01-15T10:30:00.250Z").unwrap();
        let seconds = to_epoch_seconds(&ts);
        assert_eq!(from_epoch_seconds(seconds), Some(ts));
        assert!(from_epoch_seconds(f64::NAN).is_none());
    }
}
