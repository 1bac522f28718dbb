//! Date Column Normalization
//! Default format inference plus the explicit pattern ladder.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rayon::prelude::*;
use std::fmt;

/// Formats tried by default parsing, in order. The first one that accepts the
/// first non-blank value of the column is applied to the whole column.
/// Slash dates are month-first unless only a day-first reading is valid.
const DEFAULT_FORMATS: [&str; 8] = [
    "%Y-%m-%d",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y",
    "%d/%m/%Y %H:%M:%S",
];

/// Which rule produced the date column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateStrategy {
    /// Format inferred by default parsing.
    Inferred(String),
    /// Explicit pattern from the fallback ladder.
    Pattern(String),
}

impl fmt::Display for DateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateStrategy::Inferred(format) => write!(f, "inferred {}", format),
            DateStrategy::Pattern(pattern) => write!(f, "pattern {}", pattern),
        }
    }
}

/// Parsed date column, aligned with the raw input.
#[derive(Debug, Clone)]
pub struct ParsedDates {
    pub values: Vec<Option<NaiveDate>>,
    pub strategy: DateStrategy,
}

impl ParsedDates {
    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

/// Parse one value with one chrono format. Formats carrying a time component
/// keep only the date.
///
/// chrono's `%Y` also accepts one- or two-digit years, so `15/03/23` would
/// read as year 15 under `%Y/%m/%d`. A `%Y` match is only accepted with a
/// four-digit year.
pub fn parse_with_format(value: &str, format: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let date = if format.contains("%H") {
        NaiveDateTime::parse_from_str(value, format)
            .ok()
            .map(|dt| dt.date())
    } else {
        NaiveDate::parse_from_str(value, format).ok()
    }?;

    if format.contains("%Y") && !(1000..=9999).contains(&date.year()) {
        return None;
    }
    Some(date)
}

/// Format default parsing would pick for a single value.
pub fn infer_format(value: &str) -> Option<&'static str> {
    DEFAULT_FORMATS
        .iter()
        .copied()
        .find(|format| parse_with_format(value, format).is_some())
}

/// Parse a lone value the way default parsing would.
pub fn parse_default(value: &str) -> Option<NaiveDate> {
    infer_format(value).and_then(|format| parse_with_format(value, format))
}

/// Apply one format across the column; mismatches become `None`.
pub fn parse_column(raw: &[String], format: &str) -> Vec<Option<NaiveDate>> {
    raw.par_iter()
        .map(|value| parse_with_format(value, format))
        .collect()
}

/// Default parsing: infer the format from the first non-blank value.
/// Returns an all-`None` column when nothing can be inferred.
pub fn parse_default_column(raw: &[String]) -> (Option<&'static str>, Vec<Option<NaiveDate>>) {
    let format = raw
        .iter()
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .and_then(infer_format);

    match format {
        Some(format) => (Some(format), parse_column(raw, format)),
        None => (None, vec![None; raw.len()]),
    }
}

/// Full date normalization: default parsing, then the explicit ladder.
/// `None` means no strategy produced a single valid date.
pub fn normalize_dates(raw: &[String], patterns: &[String]) -> Option<ParsedDates> {
    let (format, values) = parse_default_column(raw);
    if let Some(format) = format {
        if values.iter().any(Option::is_some) {
            tracing::debug!(format, "default date parsing succeeded");
            return Some(ParsedDates {
                values,
                strategy: DateStrategy::Inferred(format.to_string()),
            });
        }
    }

    parse_with_ladder(raw, patterns)
}

/// Try each explicit pattern in order; the first with any valid value wins.
pub fn parse_with_ladder(raw: &[String], patterns: &[String]) -> Option<ParsedDates> {
    for pattern in patterns {
        let values = parse_column(raw, pattern);
        if values.iter().any(Option::is_some) {
            tracing::debug!(pattern = %pattern, "date pattern matched");
            return Some(ParsedDates {
                values,
                strategy: DateStrategy::Pattern(pattern.clone()),
            });
        }
        tracing::debug!(pattern = %pattern, "date pattern matched nothing");
    }
    None
}

/// Formats accepted for dates typed by the user (filters, CLI flags).
const USER_DATE_FORMATS: [&str; 2] = ["%d/%m/%Y", "%Y-%m-%d"];

/// Parse a date typed by the user: `DD/MM/YYYY` or `YYYY-MM-DD`.
pub fn parse_user_date(value: &str) -> Option<NaiveDate> {
    USER_DATE_FORMATS
        .iter()
        .find_map(|format| parse_with_format(value, format))
}

/// True when any strategy can read the value as a date. Used for header sniffing.
pub fn looks_like_date(value: &str, patterns: &[String]) -> bool {
    parse_default(value).is_some()
        || patterns
            .iter()
            .any(|pattern| parse_with_format(value, pattern).is_some())
}
