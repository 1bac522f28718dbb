//! Amount column coercion.

use once_cell::sync::Lazy;
use regex::Regex;

/// Brazilian notation: `.` thousands groups of three, `,` decimals.
/// `1.234,56`, `1234,5` and `12.345` match; `1,234.56` and `1.2.3` do not.
static BRAZILIAN_AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?(?:\d{1,3}(?:\.\d{3})+|\d+)(?:,\d+)?$").expect("amount pattern is valid")
});

/// Coerce a raw cell to a finite number. Non-numeric cells become `None`.
///
/// Plain decimals are tried first (`100`, `-3.5`, `1e3`); Brazilian grouping
/// (`1.234,56`, `123,45`, optionally prefixed with `R$`) is the fallback.
/// Anything else, including US grouping like `1,234.56`, is not a number.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(v) = s.parse::<f64>() {
        return v.is_finite().then_some(v);
    }

    parse_brazilian(s)
}

fn parse_brazilian(s: &str) -> Option<f64> {
    let s = s.strip_prefix("R$").unwrap_or(s).trim();
    if !BRAZILIAN_AMOUNT.is_match(s) {
        return None;
    }
    let normalized = s.replace('.', "").replace(',', ".");
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}
