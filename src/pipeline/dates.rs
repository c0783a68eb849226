//! Lenient date parsing.
//!
//! Sources spell dates every way imaginable; we try a fixed format list and
//! accept the first hit, but only when the resulting year lands in the
//! plausible window - anything else is treated as absent, not as an error.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::config::{DATE_YEAR_MAX, DATE_YEAR_MIN};

/// Formats tried in order. Day-first variants precede month-first ones:
/// the corpus is predominantly European.
const FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%d %B %Y",
    "%B %d, %Y",
];

/// Parse a date string leniently. Returns `None` when nothing parses or
/// the year is outside [DATE_YEAR_MIN, DATE_YEAR_MAX].
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .or_else(|| parse_year_month(trimmed));

    parsed.filter(|d| {
        use chrono::Datelike;
        (DATE_YEAR_MIN..=DATE_YEAR_MAX).contains(&d.year())
    })
}

/// "2025-03" / "03/2025" → first of month.
fn parse_year_month(s: &str) -> Option<NaiveDate> {
    static YEAR_FIRST: OnceLock<Regex> = OnceLock::new();
    static MONTH_FIRST: OnceLock<Regex> = OnceLock::new();
    let year_first =
        YEAR_FIRST.get_or_init(|| Regex::new(r"^(\d{4})[-/](\d{1,2})$").unwrap());
    let month_first =
        MONTH_FIRST.get_or_init(|| Regex::new(r"^(\d{1,2})/(\d{4})$").unwrap());

    if let Some(caps) = year_first.captures(s) {
        let y = caps[1].parse::<i32>().ok()?;
        let m = caps[2].parse::<u32>().ok()?;
        return NaiveDate::from_ymd_opt(y, m, 1);
    }
    if let Some(caps) = month_first.captures(s) {
        let m = caps[1].parse::<u32>().ok()?;
        let y = caps[2].parse::<i32>().ok()?;
        return NaiveDate::from_ymd_opt(y, m, 1);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_date_parses() {
        assert_eq!(
            parse_date("2025-01-01"),
            NaiveDate::from_ymd_opt(2025, 1, 1)
        );
    }

    #[test]
    fn european_day_first_wins() {
        // 04/03/2025 reads as 4 March, not 3 April.
        assert_eq!(
            parse_date("04/03/2025"),
            NaiveDate::from_ymd_opt(2025, 3, 4)
        );
    }

    #[test]
    fn dotted_format_parses() {
        assert_eq!(
            parse_date("15.06.2024"),
            NaiveDate::from_ymd_opt(2024, 6, 15)
        );
    }

    #[test]
    fn year_month_parses_to_first() {
        assert_eq!(parse_date("2025-03"), NaiveDate::from_ymd_opt(2025, 3, 1));
    }

    #[test]
    fn implausible_year_rejected() {
        assert_eq!(parse_date("1889-01-01"), None);
        assert_eq!(parse_date("2099-01-01"), None);
    }

    #[test]
    fn garbage_rejected() {
        assert_eq!(parse_date("soon"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("Q3 2025"), None);
    }
}
