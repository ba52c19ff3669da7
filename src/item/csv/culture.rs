use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Exact base-10 number returned by decimal reads.
pub use rust_decimal::Decimal;

/// Numeric and date conventions used when reading typed fields.
///
/// Values are normalised to the invariant representation before they are
/// handed to the standard parsers: group separators are dropped and the
/// decimal separator is replaced by `.`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Culture {
    /// Character separating the integral part from the fractional part.
    pub decimal_separator: char,
    /// Optional thousands separator, ignored while parsing.
    #[serde(default)]
    pub group_separator: Option<char>,
    /// Accepted date-time patterns, tried in order (chrono `strftime` syntax).
    /// Patterns without a time component yield midnight.
    pub date_formats: Vec<String>,
}

impl Default for Culture {
    fn default() -> Self {
        Self::invariant()
    }
}

impl Culture {
    /// Culture-independent conventions: `.` decimals, no grouping, ISO dates.
    pub fn invariant() -> Self {
        Self {
            decimal_separator: '.',
            group_separator: None,
            date_formats: [
                "%Y-%m-%d %H:%M:%S%.f",
                "%Y-%m-%d %H:%M",
                "%Y-%m-%dT%H:%M:%S%.f",
                "%Y-%m-%d",
                "%m/%d/%Y %H:%M:%S",
                "%m/%d/%Y",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }

    /// Returns `value` rewritten in the invariant numeric notation.
    fn normalize_number(&self, value: &str) -> String {
        value
            .trim()
            .chars()
            .filter(|c| Some(*c) != self.group_separator)
            .map(|c| if c == self.decimal_separator { '.' } else { c })
            .collect()
    }

    pub fn parse_boolean(&self, value: &str) -> Option<bool> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("true") {
            Some(true)
        } else if value.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }

    pub fn parse_int32(&self, value: &str) -> Option<i32> {
        self.normalize_number(value).parse().ok()
    }

    pub fn parse_double(&self, value: &str) -> Option<f64> {
        let normalized = self.normalize_number(value);
        // `f64::from_str` accepts "inf" and "NaN", which are not numbers in a document
        if normalized.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
            return None;
        }
        normalized.parse().ok()
    }

    pub fn parse_decimal(&self, value: &str) -> Option<Decimal> {
        self.normalize_number(value).parse().ok()
    }

    pub fn parse_datetime(&self, value: &str) -> Option<NaiveDateTime> {
        let value = value.trim();
        self.date_formats.iter().find_map(|format| {
            NaiveDateTime::parse_from_str(value, format)
                .ok()
                .or_else(|| {
                    NaiveDate::parse_from_str(value, format)
                        .ok()
                        .and_then(|date| date.and_hms_opt(0, 0, 0))
                })
        })
    }
}
