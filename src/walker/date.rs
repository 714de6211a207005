//! Best-effort date parsing of directory names
//!
//! Data directories are commonly named after the time they were started,
//! e.g. `2024-03-01`, `20240301`, `2024.03.01` or `2024-03-01T12-30-00`.
//! Month-name dates such as `Jun 19 2019` or `19 June 2019` are accepted
//! too. Parsing is deliberately narrower than a fuzzy date parser: partial
//! values (`1`, `2019`, `June`) and day-first numeric forms are not dates.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::sync::LazyLock;

/// Date, optionally followed by a time of day
static DIR_DATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(\d{4})[-.]?(\d{2})[-.]?(\d{2})",
        r"(?:[T _-](\d{2})[:-]?(\d{2})(?:[:-]?(\d{2})(?:\.\d+)?)?)?$",
    ))
    .expect("Invalid directory date regex")
});

/// Month-name date layouts, tried after the numeric form
const MONTH_NAME_FORMATS: &[&str] = &["%b %d %Y", "%d %b %Y", "%B %d %Y", "%d %B %Y"];

/// Parse a directory base name as a local timestamp
pub fn parse_dir_date(name: &str) -> Option<NaiveDateTime> {
    let name = name.trim();
    let Some(caps) = DIR_DATE_REGEX.captures(name) else {
        return MONTH_NAME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(name, fmt).ok())
            .and_then(|date| date.and_hms_opt(0, 0, 0));
    };

    let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

    let year = caps.get(1)?.as_str().parse::<i32>().ok()?;
    let date = NaiveDate::from_ymd_opt(year, num(2)?, num(3)?)?;

    let time = match num(4) {
        Some(hour) => NaiveTime::from_hms_opt(hour, num(5)?, num(6).unwrap_or(0))?,
        None => NaiveTime::from_hms_opt(0, 0, 0)?,
    };

    Some(date.and_time(time))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_plain_dates() {
        assert_eq!(parse_dir_date("2024-03-01"), Some(dt(2024, 3, 1, 0, 0, 0)));
        assert_eq!(parse_dir_date("20240301"), Some(dt(2024, 3, 1, 0, 0, 0)));
        assert_eq!(parse_dir_date("2019.06.19"), Some(dt(2019, 6, 19, 0, 0, 0)));
    }

    #[test]
    fn test_month_names() {
        assert_eq!(parse_dir_date("Jun 19 2019"), Some(dt(2019, 6, 19, 0, 0, 0)));
        assert_eq!(parse_dir_date("19 June 2019"), Some(dt(2019, 6, 19, 0, 0, 0)));
        assert_eq!(parse_dir_date("Jun 31 2019"), None);
        assert_eq!(parse_dir_date("June"), None);
    }

    #[test]
    fn test_timestamps() {
        assert_eq!(
            parse_dir_date("2019-06-19T02-29-51"),
            Some(dt(2019, 6, 19, 2, 29, 51))
        );
        assert_eq!(
            parse_dir_date("2019-06-19 02:29:51.123"),
            Some(dt(2019, 6, 19, 2, 29, 51))
        );
        assert_eq!(
            parse_dir_date("20190619-0229"),
            Some(dt(2019, 6, 19, 2, 29, 0))
        );
    }

    #[test]
    fn test_not_dates() {
        assert_eq!(parse_dir_date("tdata"), None);
        assert_eq!(parse_dir_date("selfplay"), None);
        assert_eq!(parse_dir_date("b18c384nbt-s1234-d5678"), None);
        assert_eq!(parse_dir_date("12345678"), None);
        assert_eq!(parse_dir_date("2024-13-01"), None);
        assert_eq!(parse_dir_date("2024-02-30"), None);
        assert_eq!(parse_dir_date("2024-03-01T25-00-00"), None);
        assert_eq!(parse_dir_date(""), None);
        assert_eq!(parse_dir_date("1"), None);
        assert_eq!(parse_dir_date("2019"), None);
    }
}
