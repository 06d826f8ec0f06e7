use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const FORMAT: &str = "%Y-%m-%d";

/// A year-month-day value with no time of day and no timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDate(NaiveDate);

/// Returned when a string is not a `YYYY-MM-DD` calendar date.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a calendar date in YYYY-MM-DD form")]
pub struct ParseCalendarDateError(String);

impl CalendarDate {
    /// Returns `None` for out-of-range dates such as February 30th.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }
}

impl FromStr for CalendarDate {
    type Err = ParseCalendarDateError;

    /// Accepts only the canonical form: zero-padded month and day, no sign, no padding.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let date = NaiveDate::parse_from_str(s, FORMAT)
            .map(Self)
            .map_err(|_| ParseCalendarDateError(s.to_string()))?;
        // chrono accepts unpadded fields and a leading sign for %Y.
        if date.to_string() != s {
            return Err(ParseCalendarDateError(s.to_string()));
        }
        Ok(date)
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(FORMAT))
    }
}

impl From<NaiveDate> for CalendarDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl From<CalendarDate> for NaiveDate {
    fn from(date: CalendarDate) -> Self {
        date.0
    }
}

impl Serialize for CalendarDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CalendarDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_parse_and_display_iso_dates() {
        let date: CalendarDate = "2024-03-15".parse().unwrap();
        assert_eq!(date, CalendarDate::from_ymd(2024, 3, 15).unwrap());
        assert_eq!(date.to_string(), "2024-03-15");
    }

    #[test]
    fn can_reject_timestamps_and_garbage() {
        assert!("2024-03-15T10:00:00Z".parse::<CalendarDate>().is_err());
        assert!("not-a-date".parse::<CalendarDate>().is_err());
        assert!("".parse::<CalendarDate>().is_err());
        assert!("2024-02-30".parse::<CalendarDate>().is_err());
    }

    #[test]
    fn can_reject_non_canonical_forms() {
        for input in [
            "2024-3-5",
            "2024-03-5",
            "+2024-03-15",
            " 2024-03-15",
            "2024-03-15\n",
        ] {
            assert!(
                input.parse::<CalendarDate>().is_err(),
                "{:?} should not parse",
                input
            );
        }
    }

    #[test]
    fn can_order_dates_chronologically() {
        let earlier: CalendarDate = "2023-12-31".parse().unwrap();
        let later: CalendarDate = "2024-01-01".parse().unwrap();
        assert!(earlier < later);
    }

    #[test]
    fn can_serialize_as_plain_date_string() {
        let date = CalendarDate::from_ymd(2024, 1, 5).unwrap();
        assert_eq!(serde_json::to_string(&date).unwrap(), "\"2024-01-05\"");

        let parsed: CalendarDate = serde_json::from_str("\"2024-01-05\"").unwrap();
        assert_eq!(parsed, date);
        assert!(serde_json::from_str::<CalendarDate>("\"05/01/2024\"").is_err());
    }
}
