use chrono::{Datelike, Days, Local, NaiveDate};
use std::cmp::Ordering;

/// Position of a week relative to the week containing "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekClass {
    Past,
    Current,
    Future,
}

pub trait NaiveDateExt {
    /// Monday of the week containing this date.
    fn week_start(&self) -> NaiveDate;

    /// Local `YYYY-MM-DD` key of this date.
    fn date_key(&self) -> String;

    fn with_days_offset(self, offset: i64) -> Option<Self>
    where
        Self: Sized;

    /// Classify the week containing this date against the week containing `today`.
    fn week_class(&self, today: NaiveDate) -> WeekClass;
}

impl NaiveDateExt for NaiveDate {
    fn week_start(&self) -> NaiveDate {
        let shift = self.weekday().num_days_from_monday() as u64;
        // only fails at NaiveDate::MIN
        self.checked_sub_days(Days::new(shift)).unwrap_or(*self)
    }

    fn date_key(&self) -> String {
        format!("{:04}-{:02}-{:02}", self.year(), self.month(), self.day())
    }

    fn with_days_offset(self, offset: i64) -> Option<Self> {
        match offset.cmp(&0) {
            Ordering::Equal => Some(self),
            Ordering::Greater => self.checked_add_days(Days::new(offset.unsigned_abs())),
            Ordering::Less => self.checked_sub_days(Days::new(offset.unsigned_abs())),
        }
    }

    fn week_class(&self, today: NaiveDate) -> WeekClass {
        match self.week_start().cmp(&today.week_start()) {
            Ordering::Less => WeekClass::Past,
            Ordering::Equal => WeekClass::Current,
            Ordering::Greater => WeekClass::Future,
        }
    }
}

/// Today's date according to the local calendar.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Classify the week against the current moment. Never cache the result, "now" moves.
pub fn classify_week(date: NaiveDate) -> WeekClass {
    date.week_class(today())
}

/// Parse a lesson date coming from the upstream.
///
/// Accepts `YYYY.MM.DD`, `DD.MM.YYYY` and ISO `YYYY-MM-DD` (optionally followed by a time).
pub fn parse_upstream_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let parts = value.split('.').collect::<Vec<_>>();
    if parts.len() == 3 {
        let numbers = parts
            .iter()
            .map(|it| it.trim().parse::<u32>().ok())
            .collect::<Option<Vec<_>>>()?;
        return if parts[0].trim().len() == 4 {
            NaiveDate::from_ymd_opt(numbers[0] as i32, numbers[1], numbers[2])
        } else {
            NaiveDate::from_ymd_opt(numbers[2] as i32, numbers[1], numbers[0])
        };
    }
    value
        .get(..10)
        .and_then(|it| NaiveDate::parse_from_str(it, "%Y-%m-%d").ok())
}
