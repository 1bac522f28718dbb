//! Brazilian Real formatting.
//!
//! Values are formatted with `,` thousands and `.` decimals and the two
//! separators are then swapped by string substitution. Host locale settings
//! are never consulted.

/// `1234567.891` -> `"1.234.567,89"`
pub fn format_brl_plain(value: f64) -> String {
    let rounded = format!("{:.2}", value.abs());
    let (int_part, frac_part) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let us_style = format!("{}.{}", grouped, frac_part);

    let swapped = us_style
        .replace(',', "\u{0}")
        .replace('.', ",")
        .replace('\u{0}', ".");

    if is_negative(value) {
        format!("-{}", swapped)
    } else {
        swapped
    }
}

/// `1234567.891` -> `"R$ 1.234.567,89"`, `-10.0` -> `"-R$ 10,00"`
pub fn format_brl(value: f64) -> String {
    let plain = format_brl_plain(value.abs());
    if is_negative(value) {
        format!("-R$ {}", plain)
    } else {
        format!("R$ {}", plain)
    }
}

/// Negative after rounding to cents, so `-0.001` prints without a sign.
fn is_negative(value: f64) -> bool {
    value < 0.0 && (value * 100.0).round() != 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouping() {
        assert_eq!(format_brl(1234567.891), "R$ 1.234.567,89");
        assert_eq!(format_brl(100.0), "R$ 100,00");
        assert_eq!(format_brl(1000.5), "R$ 1.000,50");
        assert_eq!(format_brl(0.0), "R$ 0,00");
    }

    #[test]
    fn test_negative() {
        assert_eq!(format_brl(-10.0), "-R$ 10,00");
        assert_eq!(format_brl_plain(-1234.5), "-1.234,50");
        assert_eq!(format_brl(-0.001), "R$ 0,00");
    }

    #[test]
    fn test_rounding_carries() {
        assert_eq!(format_brl_plain(999.999), "1.000,00");
    }
}
