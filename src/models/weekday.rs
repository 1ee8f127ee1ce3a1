use std::fmt;

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A day of the planning week. Weeks start on Monday.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

/// Returned when a string does not name a weekday.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown weekday '{0}'")]
pub struct ParseWeekdayError(pub String);

impl Weekday {
    /// All days in canonical order.
    pub const ALL: [Weekday; 7] = [
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
        Self::Saturday,
        Self::Sunday,
    ];

    /// Zero-based position in the week (Monday = 0).
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
            Self::Saturday => "Saturday",
            Self::Sunday => "Sunday",
        }
    }

    /// Parses a day name, ignoring ASCII case.
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|day| day.as_str().eq_ignore_ascii_case(s.trim()))
    }

    pub fn parse(s: &str) -> Result<Self, ParseWeekdayError> {
        Self::from_str(s).ok_or_else(|| ParseWeekdayError(s.to_string()))
    }

    /// The current day according to the local clock.
    pub fn today() -> Self {
        Self::from(chrono::Local::now().weekday())
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        Self::ALL[day.num_days_from_monday() as usize]
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_in_canonical_order() {
        for (i, day) in Weekday::ALL.iter().enumerate() {
            assert_eq!(day.index(), i);
        }
        assert_eq!(Weekday::ALL[0], Weekday::Monday);
        assert_eq!(Weekday::ALL[6], Weekday::Sunday);
    }

    #[test]
    fn test_from_str_ignores_case() {
        assert_eq!(Weekday::from_str("wednesday"), Some(Weekday::Wednesday));
        assert_eq!(Weekday::from_str(" SUNDAY "), Some(Weekday::Sunday));
        assert_eq!(Weekday::from_str("Someday"), None);
        assert!(Weekday::parse("Funday").is_err());
    }

    #[test]
    fn test_from_chrono_weekday() {
        assert_eq!(Weekday::from(chrono::Weekday::Mon), Weekday::Monday);
        assert_eq!(Weekday::from(chrono::Weekday::Sun), Weekday::Sunday);
    }

    #[test]
    fn test_serializes_by_name() {
        let json = serde_json::to_string(&Weekday::Friday).unwrap();
        assert_eq!(json, "\"Friday\"");
        let day: Weekday = serde_json::from_str("\"Saturday\"").unwrap();
        assert_eq!(day, Weekday::Saturday);
    }
}
