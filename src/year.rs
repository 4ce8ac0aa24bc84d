// Year parsing for free-text "year built" labels, and the time slider range.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Era phrases and their representative years. Specific phrases come before
/// the generic "Nth century" forms so "late 19th century" resolves to 1890.
const ERA_YEARS: &[(&str, i32)] = &[
    ("late 19th", 1890),
    ("mid 19th", 1850),
    ("early 19th", 1810),
    ("19th century", 1850),
    ("early 20th", 1910),
    ("mid 20th", 1950),
    ("late 20th", 1990),
    ("20th century", 1950),
];

fn four_digit_year() -> &'static Regex {
    static YEAR_RE: OnceLock<Regex> = OnceLock::new();
    YEAR_RE.get_or_init(|| Regex::new(r"[0-9]{4}").expect("year pattern is valid"))
}

/// Resolve a year label to a representative year.
///
/// A literal four-digit run wins; otherwise a known era phrase; otherwise
/// `unknown_year`, which callers set to the slider maximum so undated sites
/// stay visible at the full time range.
pub fn parse_year(label: Option<&str>, unknown_year: i32) -> i32 {
    let Some(label) = label else {
        return unknown_year;
    };
    let lower = label.to_lowercase();

    if let Some(m) = four_digit_year().find(&lower) {
        if let Ok(year) = m.as_str().parse::<i32>() {
            return year;
        }
    }

    ERA_YEARS
        .iter()
        .find(|(phrase, _)| lower.contains(phrase))
        .map(|(_, year)| *year)
        .unwrap_or(unknown_year)
}

/// Bounds of the time-travel slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

impl YearRange {
    /// The minimum is the earliest dated record; undated records (which
    /// resolve to `max`) do not pull it up. Falls back to `fallback_min`.
    pub fn from_years(years: impl IntoIterator<Item = i32>, fallback_min: i32, max: i32) -> Self {
        let min = years
            .into_iter()
            .filter(|&y| y != max)
            .min()
            .unwrap_or(fallback_min)
            .min(max);
        YearRange { min, max }
    }

    pub fn clamp(&self, year: i32) -> i32 {
        year.clamp(self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MAX: i32 = 2025;

    #[test]
    fn literal_year_wins() {
        assert_eq!(parse_year(Some("1865"), MAX), 1865);
        assert_eq!(parse_year(Some("c. 1923-1931"), MAX), 1923);
        assert_eq!(parse_year(Some("Late 19th century (1890s)"), MAX), 1890);
    }

    #[test]
    fn era_phrases_are_case_insensitive() {
        assert_eq!(parse_year(Some("Late 19th Century"), MAX), 1890);
        assert_eq!(parse_year(Some("MID 19TH"), MAX), 1850);
        assert_eq!(parse_year(Some("early 19th century"), MAX), 1810);
        assert_eq!(parse_year(Some("19th Century"), MAX), 1850);
        assert_eq!(parse_year(Some("Early 20th"), MAX), 1910);
        assert_eq!(parse_year(Some("mid 20th century"), MAX), 1950);
        assert_eq!(parse_year(Some("late 20th century"), MAX), 1990);
        assert_eq!(parse_year(Some("20th Century"), MAX), 1950);
    }

    #[test]
    fn unknown_labels_use_fallback() {
        assert_eq!(parse_year(None, MAX), MAX);
        assert_eq!(parse_year(Some(""), MAX), MAX);
        assert_eq!(parse_year(Some("Unknown"), MAX), MAX);
        assert_eq!(parse_year(Some("Ongoing"), 2030), 2030);
    }

    #[test]
    fn year_range_ignores_undated() {
        let range = YearRange::from_years([1865, MAX, 1810, 1932], 1850, MAX);
        assert_eq!(range, YearRange { min: 1810, max: MAX });

        let range = YearRange::from_years([MAX, MAX], 1850, MAX);
        assert_eq!(range.min, 1850);
        assert_eq!(range.clamp(1700), 1850);
        assert_eq!(range.clamp(3000), MAX);
    }

    proptest! {
        #[test]
        fn embedded_year_is_extracted(
            year in 1000i32..=9999,
            prefix in "[a-zA-Z .,]{0,12}",
            suffix in "[a-zA-Z .,]{0,12}",
        ) {
            let label = format!("{prefix}{year}{suffix}");
            prop_assert_eq!(parse_year(Some(&label), MAX), year);
        }

        #[test]
        fn digitless_text_never_panics(label in "[a-zA-Z ]{0,40}") {
            let year = parse_year(Some(&label), MAX);
            prop_assert!(year == MAX || ERA_YEARS.iter().any(|(_, y)| *y == year));
        }
    }
}
