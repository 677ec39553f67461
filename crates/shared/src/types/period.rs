//! Fiscal month (`YYYY-MM`), the unit of competence and month-end closing.

use chrono::{Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error parsing a fiscal month.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid fiscal month {0:?}, expected YYYY-MM")]
pub struct FiscalMonthParseError(pub String);

/// Today's date in `America/Sao_Paulo`.
#[must_use]
pub fn today_brazil() -> NaiveDate {
    Utc::now()
        .with_timezone(&chrono_tz::America::Sao_Paulo)
        .date_naive()
}

/// A calendar month used as accounting competence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FiscalMonth {
    year: i32,
    month: u32,
}

impl FiscalMonth {
    /// Creates a fiscal month, returning `None` when `month` is outside `1..=12`.
    #[must_use]
    pub fn new(year: i32, month: u32) -> Option<Self> {
        ((1..=12).contains(&month) && (1..=9999).contains(&year)).then_some(Self { year, month })
    }

    /// The month containing `date`.
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The current month in the given time zone.
    #[must_use]
    pub fn current_in(tz: Tz) -> Self {
        Self::of(Utc::now().with_timezone(&tz).date_naive())
    }

    /// The current month in `America/Sao_Paulo`.
    #[must_use]
    pub fn current_brazil() -> Self {
        Self::of(today_brazil())
    }

    /// Calendar year.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Calendar month (1-12).
    #[must_use]
    pub const fn month(&self) -> u32 {
        self.month
    }

    /// First day of the month.
    #[must_use]
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Last day of the month.
    #[must_use]
    pub fn last_day(&self) -> NaiveDate {
        self.next()
            .first_day()
            .pred_opt()
            .unwrap_or_else(|| self.first_day())
    }

    /// The following month.
    #[must_use]
    pub const fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Returns true if `date` falls inside this month.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// The given day of this month, clamped to the last day.
    #[must_use]
    pub fn day_clamped(&self, day: u32) -> NaiveDate {
        let last = self.last_day();
        if day >= last.day() {
            last
        } else {
            NaiveDate::from_ymd_opt(self.year, self.month, day.max(1)).unwrap_or(last)
        }
    }
}

impl std::fmt::Display for FiscalMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl std::str::FromStr for FiscalMonth {
    type Err = FiscalMonthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || FiscalMonthParseError(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(err)?;
        if year.len() != 4
            || month.len() != 2
            || !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit())
        {
            return Err(err());
        }
        let year: i32 = year.parse().map_err(|_| err())?;
        let month: u32 = month.parse().map_err(|_| err())?;
        Self::new(year, month).ok_or_else(err)
    }
}

impl TryFrom<String> for FiscalMonth {
    type Error = FiscalMonthParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FiscalMonth> for String {
    fn from(value: FiscalMonth) -> Self {
        value.to_string()
    }
}
