use chrono::{NaiveDate, NaiveDateTime};

const MONTHS: [(&str, u32); 15] = [
    ("janvier", 1),
    ("février", 2),
    ("fevrier", 2),
    ("mars", 3),
    ("avril", 4),
    ("mai", 5),
    ("juin", 6),
    ("juillet", 7),
    ("août", 8),
    ("aout", 8),
    ("septembre", 9),
    ("octobre", 10),
    ("novembre", 11),
    ("décembre", 12),
    ("decembre", 12),
];

/// Parses a French deadline such as `18 Janvier 2026 - 16h` into a calendar date.
///
/// Only the text before the first dash is read. Returns `None` for anything
/// that is not `<day> <month name> <year>`.
pub fn parse_french_date(text: &str) -> Option<NaiveDate> {
    let date_part = text.split(['-', '–']).next().unwrap_or_default();
    let mut tokens = date_part.split_whitespace();

    let day = strip_ordinal(tokens.next()?).parse::<u32>().ok()?;
    let month = month_number(tokens.next()?)?;
    let year = tokens.next()?.parse::<i32>().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Same as [`parse_french_date`], at local midnight.
pub fn parse_cutoff(text: &str) -> Option<NaiveDateTime> {
    parse_french_date(text).and_then(|date| date.and_hms_opt(0, 0, 0))
}

fn month_number(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    MONTHS
        .iter()
        .find(|(month, _)| *month == name)
        .map(|(_, number)| *number)
}

// "1er" is the only French ordinal used for days of the month.
fn strip_ordinal(token: &str) -> &str {
    for suffix in ["er", "ER", "Er", "ᵉʳ"] {
        if let Some(day) = token.strip_suffix(suffix) {
            if day == "1" {
                return day;
            }
        }
    }
    token
}
