use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;

use crate::domain::RawCell;
use crate::pipeline::silver::placeholders::PlaceholderSet;

/// Far-future end date standing in for "no end date" on open-ended validity
/// columns. Downstream range scans and SCD2 joins compare against a real,
/// sortable date instead of a null.
pub static SENTINEL_END_DATE: Lazy<NaiveDate> =
    Lazy::new(|| NaiveDate::from_ymd_opt(2222, 12, 31).unwrap());

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%m-%d-%Y"];

// One datetime family per entry in DATE_FORMATS, with and without seconds.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m-%d-%Y %H:%M:%S",
    "%m-%d-%Y %H:%M",
];

/// Tolerant calendar-date parser. Accepts plain dates in the common extract
/// formats as well as any parseable datetime, which is truncated to its
/// date part. Unparseable text is absent, never an error.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }
    parse_datetime_exact(text).map(|dt| dt.date())
}

/// Tolerant timestamp parser for punch columns. A date-only value resolves
/// to midnight.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    parse_datetime_exact(text).or_else(|| {
        DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
            .map(|date| date.and_time(NaiveTime::MIN))
    })
}

fn parse_datetime_exact(text: &str) -> Option<NaiveDateTime> {
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.naive_utc())
}

/// Cleans a string column: placeholders become absent, then absent cells
/// take the caller's default (or stay absent when none is given).
pub fn clean_string_column(
    column: &[RawCell],
    placeholders: &PlaceholderSet,
    default: Option<&str>,
) -> Vec<Option<String>> {
    column
        .iter()
        .map(|cell| {
            placeholders
                .normalize(cell.as_deref())
                .or_else(|| default.map(str::to_string))
        })
        .collect()
}

/// [`clean_string_column`] with a mandatory default, for columns whose
/// cleaned shape is non-null.
pub fn clean_string_column_filled(
    column: &[RawCell],
    placeholders: &PlaceholderSet,
    default: &str,
) -> Vec<String> {
    column
        .iter()
        .map(|cell| {
            placeholders
                .normalize(cell.as_deref())
                .unwrap_or_else(|| default.to_string())
        })
        .collect()
}

/// Cleans a numeric column: placeholders and parse failures both collapse
/// to absent and are filled with the default; malformed cells never fail
/// the column. The float grammar accepts NaN spellings the placeholder
/// list does not carry, so a parsed NaN is rejected like an absent value.
/// A cleaned column never contains NaN.
pub fn clean_numeric_column(column: &[RawCell], placeholders: &PlaceholderSet, default: f64) -> Vec<f64> {
    column
        .iter()
        .map(|cell| {
            placeholders
                .normalize(cell.as_deref())
                .and_then(|text| text.parse::<f64>().ok())
                .filter(|value| !value.is_nan())
                .unwrap_or(default)
        })
        .collect()
}

/// Cleans a date column; absent and unparseable cells stay absent.
pub fn clean_date_column(column: &[RawCell], placeholders: &PlaceholderSet) -> Vec<Option<NaiveDate>> {
    column
        .iter()
        .map(|cell| {
            placeholders
                .normalize(cell.as_deref())
                .and_then(|text| parse_date(&text))
        })
        .collect()
}

/// Cleans a timestamp column; absent and unparseable cells stay absent.
pub fn clean_datetime_column(
    column: &[RawCell],
    placeholders: &PlaceholderSet,
) -> Vec<Option<NaiveDateTime>> {
    column
        .iter()
        .map(|cell| {
            placeholders
                .normalize(cell.as_deref())
                .and_then(|text| parse_datetime(&text))
        })
        .collect()
}

/// Like [`clean_date_column`], but absent results are filled with
/// [`SENTINEL_END_DATE`]. Use for termination/end-of-validity columns only.
pub fn clean_date_column_with_sentinel(
    column: &[RawCell],
    placeholders: &PlaceholderSet,
) -> Vec<NaiveDate> {
    clean_date_column(column, placeholders)
        .into_iter()
        .map(|date| date.unwrap_or(*SENTINEL_END_DATE))
        .collect()
}
