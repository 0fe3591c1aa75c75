//! Requested-date validation against the portal's calendar.

use chrono::{FixedOffset, NaiveDate, Offset, Utc};

use crate::config::CalendarConfig;
use crate::error::DateError;

/// Format accepted from callers.
pub const INPUT_FORMAT: &str = "%Y-%m-%d";
/// Format the portal's date inputs expect; also the cache key.
pub const DISPLAY_FORMAT: &str = "%d/%m/%Y";
const READABLE_FORMAT: &str = "%B %d, %Y";

/// A date that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDate {
    pub date: NaiveDate,
    /// `dd/mm/yyyy`
    pub display: String,
    /// e.g. "March 15, 2024"
    pub readable: String,
}

impl ValidatedDate {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            display: date.format(DISPLAY_FORMAT).to_string(),
            readable: date.format(READABLE_FORMAT).to_string(),
        }
    }
}

/// Timezone-aware notion of "today" plus the earliest allowed date.
#[derive(Debug, Clone)]
pub struct Calendar {
    offset: FixedOffset,
    min_date: NaiveDate,
    pinned_today: Option<NaiveDate>,
}

impl Calendar {
    pub fn new(config: &CalendarConfig) -> Self {
        let offset = FixedOffset::east_opt(config.utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix());
        Self {
            offset,
            min_date: config.min_date,
            pinned_today: None,
        }
    }

    /// Pin "today" to a fixed date instead of the wall clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.pinned_today = Some(today);
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.pinned_today
            .unwrap_or_else(|| Utc::now().with_timezone(&self.offset).date_naive())
    }

    /// Display form of today, for comparison against cache keys.
    pub fn today_display(&self) -> String {
        self.today().format(DISPLAY_FORMAT).to_string()
    }

    pub fn is_today(&self, display_date: &str) -> bool {
        self.today_display() == display_date
    }

    /// Parse `YYYY-MM-DD` and bounds-check it.
    pub fn validate(&self, input: &str) -> Result<ValidatedDate, DateError> {
        let date = NaiveDate::parse_from_str(input.trim(), INPUT_FORMAT)
            .map_err(|_| DateError::InvalidFormat(input.to_string()))?;

        if date > self.today() {
            return Err(DateError::FutureDate(date));
        }
        if date < self.min_date {
            return Err(DateError::TooOld {
                date,
                floor: self.min_date,
            });
        }

        Ok(ValidatedDate::new(date))
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self::new(&CalendarConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calendar() -> Calendar {
        Calendar::default().with_today(NaiveDate::from_ymd_opt(2024, 3, 20).unwrap())
    }

    #[test]
    fn test_valid_date() {
        let d = calendar().validate("2024-03-15").unwrap();
        assert_eq!(d.display, "15/03/2024");
        assert_eq!(d.readable, "March 15, 2024");
    }

    #[test]
    fn test_today_is_allowed() {
        assert!(calendar().validate("2024-03-20").is_ok());
        assert!(calendar().is_today("20/03/2024"));
        assert!(!calendar().is_today("19/03/2024"));
    }

    #[test]
    fn test_invalid_format() {
        for input in ["15/03/2024", "2024-13-01", "", "yesterday"] {
            assert!(matches!(
                calendar().validate(input),
                Err(DateError::InvalidFormat(_))
            ));
        }
    }

    #[test]
    fn test_future_date() {
        assert!(matches!(
            calendar().validate("2024-03-21"),
            Err(DateError::FutureDate(_))
        ));
    }

    #[test]
    fn test_too_old() {
        assert!(matches!(
            calendar().validate("2009-12-31"),
            Err(DateError::TooOld { .. })
        ));
        assert!(calendar().validate("2010-01-01").is_ok());
    }

    #[test]
    fn test_offset_shifts_today() {
        let config = CalendarConfig {
            utc_offset_minutes: 14 * 60,
            ..Default::default()
        };
        let ahead = Calendar::new(&config).today();
        let utc = Utc::now().date_naive();
        assert!(ahead >= utc);
    }
}
