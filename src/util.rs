// Utility helpers for parsing and date arithmetic.
//
// This module centralizes all the "dirty" CSV/number/date handling so the
// rest of the code can assume clean, typed values.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in CSV exports (commas, spaces, text).
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(",", "");
    s.parse::<f64>().ok()
}

/// Parse an expiration date. The upstream export writes `DD/MM/YYYY`;
/// ISO `YYYY-MM-DD` is accepted as well for fixtures and re-exports.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .ok()
}

/// Whole-day difference `end - start`.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// Sorted unique values of one categorical column, for selection controls.
pub fn sorted_unique<'a, I>(values: I) -> Vec<String>
where
    I: Iterator<Item = &'a str>,
{
    let mut out: Vec<String> = values.map(|v| v.to_string()).collect();
    out.sort();
    out.dedup();
    out
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for integer-like values. This is used
    // for counts in console messages (e.g., `9,855 rows loaded`).
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_f64_rejects_text_and_strips_commas() {
        assert_eq!(parse_f64_safe(Some("1,234.5")), Some(1234.5));
        assert_eq!(parse_f64_safe(Some("  7.4 ")), Some(7.4));
        assert_eq!(parse_f64_safe(Some("n/a")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn parse_date_accepts_both_formats() {
        let d = NaiveDate::from_ymd_opt(2027, 3, 14).unwrap();
        assert_eq!(parse_date("2027-03-14"), Some(d));
        assert_eq!(parse_date("14/03/2027"), Some(d));
        assert_eq!(parse_date("14-03-2027"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn days_between_is_signed() {
        let a = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2026, 8, 11).unwrap();
        assert_eq!(days_between(a, b), 10);
        assert_eq!(days_between(b, a), -10);
    }

    #[test]
    fn sorted_unique_sorts_and_dedups() {
        let vals = ["Madrid", "Albacete", "Madrid", "Cuenca"];
        assert_eq!(
            sorted_unique(vals.iter().copied()),
            vec!["Albacete", "Cuenca", "Madrid"]
        );
    }
}
