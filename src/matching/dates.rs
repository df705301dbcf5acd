//! Date parsing for air-date titles
//!
//! Catalog titles state dates in a handful of German and ISO notations.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

/// Alternation of German month names, including common spelling variants.
pub(crate) const GERMAN_MONTHS: &str =
    "Januar|Jänner|Jaenner|Februar|März|Maerz|April|Mai|Juni|Juli|August|September|Oktober|November|Dezember";

static GERMAN_LONG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(?:^|\D)(\d{{1,2}})\.\s*({GERMAN_MONTHS})\s+(\d{{4}})(?:\D|$)"
    ))
    .expect("valid German date regex")
});
static DOTTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\D)(\d{1,2})\.(\d{1,2})\.(\d{4})(?:\D|$)").expect("valid dotted date regex")
});
static ISO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\D)(\d{4})-(\d{2})-(\d{2})(?:\D|$)").expect("valid ISO date regex")
});
static COMPACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\D)(\d{4})(\d{2})(\d{2})(?:\D|$)").expect("valid compact date regex")
});

/// Month number for a German month name
fn german_month(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().as_str() {
        "januar" | "jänner" | "jaenner" => 1,
        "februar" => 2,
        "märz" | "maerz" => 3,
        "april" => 4,
        "mai" => 5,
        "juni" => 6,
        "juli" => 7,
        "august" => 8,
        "september" => 9,
        "oktober" => 10,
        "november" => 11,
        "dezember" => 12,
        _ => return None,
    };
    Some(month)
}

fn ymd(year: &str, month: u32, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, day.parse().ok()?)
}

/// Parses the first date found in `text`.
///
/// Formats are tried in order: "D. Month YYYY" (German month names),
/// "DD.MM.YYYY", "YYYY-MM-DD", "YYYYMMDD". The first format that yields a
/// valid calendar date wins.
pub fn parse_title_date(text: &str) -> Option<NaiveDate> {
    let german = || {
        let caps = GERMAN_LONG.captures(text)?;
        ymd(&caps[3], german_month(&caps[2])?, &caps[1])
    };
    let dotted = || {
        let caps = DOTTED.captures(text)?;
        ymd(&caps[3], caps[2].parse().ok()?, &caps[1])
    };
    let iso = || {
        let caps = ISO.captures(text)?;
        ymd(&caps[1], caps[2].parse().ok()?, &caps[3])
    };
    let compact = || {
        let caps = COMPACT.captures(text)?;
        ymd(&caps[1], caps[2].parse().ok()?, &caps[3])
    };

    german()
        .or_else(dotted)
        .or_else(iso)
        .or_else(compact)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_supported_formats() {
        assert_eq!(parse_title_date("7. Juni 2024"), date(2024, 6, 7));
        assert_eq!(parse_title_date("31.12.2017"), date(2017, 12, 31));
        assert_eq!(parse_title_date("2017-12-01"), date(2017, 12, 1));
        assert_eq!(parse_title_date("20171201"), date(2017, 12, 1));
    }

    #[test]
    fn test_dates_inside_titles() {
        assert_eq!(
            parse_title_date("Sendung vom 3. März 2023"),
            date(2023, 3, 3)
        );
        assert_eq!(parse_title_date("heute journal vom 01.02.2024"), date(2024, 2, 1));
        assert_eq!(parse_title_date("Ausgabe 20240105 (HD)"), date(2024, 1, 5));
    }

    #[test]
    fn test_invalid_dates() {
        assert_eq!(parse_title_date("31. Februar 2024"), None);
        assert_eq!(parse_title_date("32.01.2024"), None);
        assert_eq!(parse_title_date("Folge 123456789"), None);
        assert_eq!(parse_title_date("131.12.20171"), None);
        assert_eq!(parse_title_date("12017-12-011"), None);
        assert_eq!(parse_title_date("17. Juni 20245"), None);
        assert_eq!(parse_title_date("kein Datum"), None);
        assert_eq!(parse_title_date(""), None);
    }
}
